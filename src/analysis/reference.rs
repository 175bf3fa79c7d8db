// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Calculation of the average structure of an aligned trajectory.

use nalgebra::Vector3;

use crate::errors::AlignmentError;

use super::frame::{AlignedTrajectory, Frame, Selection};
use super::superposition::Reference;

/// Calculate the mean position of every atom of `selection` over all frames of the trajectory.
/// The returned frame contains one position per selected atom, in the order of the selection.
pub fn mean_frame(
    trajectory: &AlignedTrajectory,
    selection: &Selection,
) -> Result<Frame, AlignmentError> {
    if trajectory.is_empty() {
        return Err(AlignmentError::EmptyTrajectory);
    }

    if let Some(&last) = selection.indices().last() {
        if last >= trajectory.n_atoms() {
            return Err(AlignmentError::InvalidIndex(
                selection.name().to_owned(),
                last,
                trajectory.n_atoms(),
            ));
        }
    }

    let mut sums = vec![Vector3::<f64>::zeros(); selection.len()];
    for frame in trajectory.frames() {
        let positions = frame.positions();
        for (sum, &index) in sums.iter_mut().zip(selection.iter()) {
            *sum += positions[index];
        }
    }

    let n_frames = trajectory.n_frames() as f64;
    Ok(Frame::new(sums.into_iter().map(|s| s / n_frames).collect()))
}

/// Construct a reference from the average structure of the selected atoms.
pub fn mean_reference(
    trajectory: &AlignedTrajectory,
    selection: &Selection,
) -> Result<Reference, AlignmentError> {
    let mean = mean_frame(trajectory, selection)?;
    Reference::new(mean.positions().to_vec(), selection.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frame::Trajectory;
    use approx::assert_relative_eq;

    fn trajectory() -> AlignedTrajectory {
        let frames = vec![
            Frame::from(vec![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [5.0, 5.0, 5.0]]),
            Frame::from(vec![[2.0, 0.0, 0.0], [1.0, 4.0, 3.0], [5.0, 5.0, 5.0]]),
            Frame::from(vec![[4.0, 0.0, 3.0], [1.0, 0.0, 0.0], [5.0, 5.0, 5.0]]),
        ];

        AlignedTrajectory::assume_aligned(Trajectory::new(frames).unwrap())
    }

    #[test]
    fn mean_frame_all_atoms() {
        let traj = trajectory();
        let selection = Selection::all("All", 3).unwrap();
        let mean = mean_frame(&traj, &selection).unwrap();

        assert_eq!(mean.n_atoms(), 3);
        assert_relative_eq!(mean.positions()[0], Vector3::new(2.0, 0.0, 1.0));
        assert_relative_eq!(mean.positions()[1], Vector3::new(1.0, 2.0, 2.0));
        assert_relative_eq!(mean.positions()[2], Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn mean_frame_subset() {
        let traj = trajectory();
        let selection = Selection::new("Subset", vec![2, 0], 3).unwrap();
        let mean = mean_frame(&traj, &selection).unwrap();

        assert_eq!(mean.n_atoms(), 2);
        assert_relative_eq!(mean.positions()[0], Vector3::new(2.0, 0.0, 1.0));
        assert_relative_eq!(mean.positions()[1], Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn mean_frame_does_not_modify_trajectory() {
        let traj = trajectory();
        let copy = traj.clone();
        let selection = Selection::all("All", 3).unwrap();
        let _ = mean_frame(&traj, &selection).unwrap();
        assert_eq!(traj, copy);
    }

    #[test]
    fn mean_frame_fail_empty() {
        let traj = AlignedTrajectory::assume_aligned(Trajectory::new(vec![]).unwrap());
        let selection = Selection::all("All", 3).unwrap();
        assert_eq!(
            mean_frame(&traj, &selection),
            Err(AlignmentError::EmptyTrajectory)
        );
    }

    #[test]
    fn mean_reference_atoms() {
        let traj = trajectory();
        let selection = Selection::new("Subset", vec![1, 2], 3).unwrap();
        let reference = mean_reference(&traj, &selection).unwrap();

        assert_eq!(reference.atoms(), &selection);
        assert_relative_eq!(reference.positions()[0], Vector3::new(1.0, 2.0, 2.0));
    }
}
