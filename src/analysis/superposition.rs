// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Least-squares rigid-body superposition of trajectory frames onto a reference structure.

use getset::{CopyGetters, Getters};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::errors::AlignmentError;

use super::frame::{AlignedTrajectory, Frame, Selection, Trajectory};

/// Ratio between the second largest and the largest principal moment
/// of a point cloud below which the points are considered collinear.
const COLLINEARITY_TOLERANCE: f64 = 1e-10;

/// Positions of a set of atoms onto which the frames of a trajectory are superposed.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Reference {
    /// Positions of the reference atoms, in the order of `atoms`.
    #[getset(get = "pub")]
    positions: Vec<Vector3<f64>>,
    /// Indices of the reference atoms in the system.
    #[getset(get = "pub")]
    atoms: Selection,
}

impl Reference {
    /// Construct a reference from positions of the atoms of `atoms`.
    pub fn new(positions: Vec<Vector3<f64>>, atoms: Selection) -> Result<Self, AlignmentError> {
        if positions.len() != atoms.len() {
            return Err(AlignmentError::ShapeMismatch {
                frame: 0,
                expected: atoms.len(),
                found: positions.len(),
            });
        }

        Ok(Self { positions, atoms })
    }

    /// Construct a reference from the positions of the selected atoms in a frame.
    pub fn from_frame(frame: &Frame, atoms: &Selection) -> Result<Self, AlignmentError> {
        check_indices(atoms, frame.n_atoms())?;
        Ok(Self {
            positions: frame.select(atoms),
            atoms: atoms.clone(),
        })
    }

    /// Get the reference positions of the atoms of `selection`.
    fn targets(&self, selection: &Selection) -> Result<Vec<Vector3<f64>>, AlignmentError> {
        selection
            .iter()
            .map(|&index| {
                self.atoms
                    .position_of(index)
                    .map(|i| self.positions[i])
                    .ok_or(AlignmentError::MissingReferenceAtom(index))
            })
            .collect()
    }
}

/// Rigid-body transformation superposing a mobile set of points onto a target set.
///
/// A point `x` is transformed as `R (x - c_mobile) + c_target`.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters)]
pub struct Superposition {
    #[getset(get_copy = "pub")]
    rotation: Matrix3<f64>,
    #[getset(get_copy = "pub")]
    mobile_centroid: Vector3<f64>,
    #[getset(get_copy = "pub")]
    target_centroid: Vector3<f64>,
    /// Root mean square deviation between the fitted points and the target points.
    #[getset(get_copy = "pub")]
    rmsd: f64,
}

impl Superposition {
    /// Find the rotation and translation minimizing the sum of squared distances
    /// between `mobile` and `target` (Kabsch algorithm).
    ///
    /// Both point sets must have the same, nonzero length.
    pub fn fit(mobile: &[Vector3<f64>], target: &[Vector3<f64>]) -> Result<Self, AlignmentError> {
        if mobile.len() != target.len() {
            return Err(AlignmentError::ShapeMismatch {
                frame: 0,
                expected: target.len(),
                found: mobile.len(),
            });
        }

        if mobile.is_empty() {
            return Err(AlignmentError::EmptySelection("fit".to_owned()));
        }

        let mobile_centroid = centroid(mobile);
        let target_centroid = centroid(target);

        // cross-covariance matrix of the centered point sets
        let covariance = mobile
            .iter()
            .zip(target.iter())
            .fold(Matrix3::zeros(), |acc, (p, q)| {
                acc + (p - mobile_centroid) * (q - target_centroid).transpose()
            });

        let svd = covariance.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => return Err(AlignmentError::SvdFailed),
        };
        let v = v_t.transpose();

        // correct for reflection
        let mut correction = Matrix3::identity();
        if (v * u.transpose()).determinant() < 0.0 {
            correction[(2, 2)] = -1.0;
        }

        let rotation = v * correction * u.transpose();

        let mut superposition = Superposition {
            rotation,
            mobile_centroid,
            target_centroid,
            rmsd: 0.0,
        };

        let sum_sq = mobile
            .iter()
            .zip(target.iter())
            .map(|(p, q)| (superposition.transform(p) - q).norm_squared())
            .sum::<f64>();
        superposition.rmsd = (sum_sq / mobile.len() as f64).sqrt();

        Ok(superposition)
    }

    /// Transform a single point.
    #[inline(always)]
    pub fn transform(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (point - self.mobile_centroid) + self.target_centroid
    }

    /// Transform all the provided points in place.
    #[inline]
    pub fn apply(&self, points: &mut [Vector3<f64>]) {
        points.iter_mut().for_each(|p| *p = self.transform(p));
    }
}

/// Superpose every frame of the trajectory onto the reference.
///
/// The transformation is fitted using the atoms of `selection` and applied to all atoms of the frame.
/// Every atom of `selection` must be part of the reference.
pub fn align(
    trajectory: Trajectory,
    reference: &Reference,
    selection: &Selection,
) -> Result<AlignedTrajectory, AlignmentError> {
    align_parallel(trajectory, reference, selection, 1)
}

/// Same as [`align`] but superposes the frames in a thread pool of `n_threads` threads.
/// The result does not depend on the number of threads.
pub fn align_parallel(
    mut trajectory: Trajectory,
    reference: &Reference,
    selection: &Selection,
    n_threads: usize,
) -> Result<AlignedTrajectory, AlignmentError> {
    if trajectory.is_empty() {
        return Err(AlignmentError::EmptyTrajectory);
    }

    if selection.is_empty() {
        return Err(AlignmentError::EmptySelection(selection.name().to_owned()));
    }

    check_indices(selection, trajectory.n_atoms())?;

    let targets = reference.targets(selection)?;
    if is_degenerate(&targets) {
        return Err(AlignmentError::DegenerateSelection(
            selection.name().to_owned(),
        ));
    }

    let n_frames = trajectory.n_frames();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads.clamp(1, n_frames))
        .build()
        .map_err(|e| AlignmentError::ThreadPool(e.to_string()))?;

    let rmsds = pool.install(|| {
        trajectory
            .frames_mut()
            .par_iter_mut()
            .map(|frame| align_frame(frame, &targets, selection))
            .collect::<Result<Vec<f64>, AlignmentError>>()
    })?;
    let rmsd_sum = rmsds.iter().sum::<f64>();

    log::info!(
        "Superposed {} frames using {} atoms of '{}' (average RMSD after fitting: {:.4}).",
        n_frames,
        selection.len(),
        selection.name(),
        rmsd_sum / n_frames as f64,
    );

    Ok(AlignedTrajectory::from_superposed(trajectory))
}

/// Superpose a single frame onto the target positions. Returns the RMSD after fitting.
fn align_frame(
    frame: &mut Frame,
    targets: &[Vector3<f64>],
    selection: &Selection,
) -> Result<f64, AlignmentError> {
    let mobile = frame.select(selection);
    let superposition = Superposition::fit(&mobile, targets)?;
    superposition.apply(frame.positions_mut());
    Ok(superposition.rmsd())
}

/// Check that all indices of the selection are valid for a system with `n_atoms` atoms.
fn check_indices(selection: &Selection, n_atoms: usize) -> Result<(), AlignmentError> {
    match selection.indices().last() {
        Some(&last) if last >= n_atoms => Err(AlignmentError::InvalidIndex(
            selection.name().to_owned(),
            last,
            n_atoms,
        )),
        _ => Ok(()),
    }
}

#[inline]
fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

/// Rotation is underdetermined for fewer than three points or for collinear points.
fn is_degenerate(points: &[Vector3<f64>]) -> bool {
    if points.len() < 3 {
        return true;
    }

    let center = centroid(points);
    let scatter = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - center;
        acc + d * d.transpose()
    });

    let mut moments: Vec<f64> = scatter.symmetric_eigenvalues().iter().copied().collect();
    moments.sort_by(|a, b| b.total_cmp(a));

    moments[0] <= f64::EPSILON || moments[1] <= moments[0] * COLLINEARITY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn points() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.5, 0.0, 0.0),
            Vector3::new(1.5, 1.2, 0.0),
            Vector3::new(0.3, 1.1, 0.9),
            Vector3::new(-0.4, 0.7, -1.3),
        ]
    }

    fn rotate_and_shift(points: &[Vector3<f64>], angle: f64) -> Vec<Vector3<f64>> {
        let rotation = Rotation3::from_euler_angles(angle, -0.5 * angle, 0.3);
        let shift = Vector3::new(3.0, -2.0, 7.5);
        points.iter().map(|p| rotation * p + shift).collect()
    }

    #[test]
    fn fit_recovers_rigid_motion() {
        let target = points();
        let mobile = rotate_and_shift(&target, 1.1);

        let superposition = Superposition::fit(&mobile, &target).unwrap();
        assert_relative_eq!(superposition.rmsd(), 0.0, epsilon = 1e-10);

        for (m, t) in mobile.iter().zip(target.iter()) {
            let fitted = superposition.transform(m);
            assert_relative_eq!(fitted, *t, epsilon = 1e-10);
        }
    }

    #[test]
    fn fit_returns_proper_rotation() {
        let target = points();
        // mirror image of the target, the best proper rotation cannot reproduce it
        let mobile: Vec<Vector3<f64>> = target.iter().map(|p| Vector3::new(-p.x, p.y, p.z)).collect();

        let superposition = Superposition::fit(&mobile, &target).unwrap();
        assert_relative_eq!(superposition.rotation().determinant(), 1.0, epsilon = 1e-10);
        assert!(superposition.rmsd() > 0.1);
    }

    #[test]
    fn fit_fail_length_mismatch() {
        let target = points();
        match Superposition::fit(&target[..3], &target) {
            Err(AlignmentError::ShapeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 5);
                assert_eq!(found, 3);
            }
            _ => panic!("Fitting sets of different lengths should fail."),
        }
    }

    #[test]
    fn degenerate_points() {
        assert!(is_degenerate(&points()[..2]));
        assert!(!is_degenerate(&points()[..3]));

        let line: Vec<Vector3<f64>> = (0..6)
            .map(|i| Vector3::new(i as f64, 2.0 * i as f64, -(i as f64)))
            .collect();
        assert!(is_degenerate(&line));

        let same = vec![Vector3::new(1.0, 1.0, 1.0); 4];
        assert!(is_degenerate(&same));
    }

    #[test]
    fn align_all_atoms_follow_the_fit() {
        let reference_frame = Frame::new(points());
        let fit = Selection::new("Fit", vec![0, 1, 2, 3], 5).unwrap();
        let reference = Reference::from_frame(&reference_frame, &fit).unwrap();

        let moved = Frame::new(rotate_and_shift(reference_frame.positions(), -0.7));
        let trajectory = Trajectory::new(vec![moved]).unwrap();

        let aligned = align(trajectory, &reference, &fit).unwrap();

        // atom 4 is not part of the fitting selection but is superposed as well
        for (a, b) in aligned.frames()[0]
            .positions()
            .iter()
            .zip(reference_frame.positions().iter())
        {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn align_does_not_change_shape() {
        let reference_frame = Frame::new(points());
        let all = Selection::all("All", 5).unwrap();
        let reference = Reference::from_frame(&reference_frame, &all).unwrap();

        let frames = (0..7)
            .map(|i| Frame::new(rotate_and_shift(&points(), 0.2 * i as f64)))
            .collect();
        let trajectory = Trajectory::new(frames).unwrap();

        let aligned = align(trajectory, &reference, &all).unwrap();
        assert_eq!(aligned.n_frames(), 7);
        assert_eq!(aligned.n_atoms(), 5);
    }

    #[test]
    fn align_parallel_matches_serial() {
        let reference_frame = Frame::new(points());
        let all = Selection::all("All", 5).unwrap();
        let reference = Reference::from_frame(&reference_frame, &all).unwrap();

        let frames: Vec<Frame> = (0..11)
            .map(|i| {
                let mut positions = rotate_and_shift(&points(), 0.3 * i as f64);
                positions[i % 5].x += 0.05 * i as f64;
                Frame::new(positions)
            })
            .collect();
        let trajectory = Trajectory::new(frames).unwrap();

        let serial = align(trajectory.clone(), &reference, &all).unwrap();
        for n_threads in [2, 3, 4, 16] {
            let parallel = align_parallel(trajectory.clone(), &reference, &all, n_threads).unwrap();
            assert_eq!(serial, parallel);
        }
    }

    #[test]
    fn align_parallel_preserves_frame_order() {
        let reference_frame = Frame::new(points());
        let all = Selection::all("All", 5).unwrap();
        let reference = Reference::from_frame(&reference_frame, &all).unwrap();

        // every frame has a different internal deformation that survives the superposition
        let frames: Vec<Frame> = (0..3)
            .map(|i| {
                let mut positions = rotate_and_shift(&points(), 0.7 * i as f64);
                positions[i].x += 0.2;
                Frame::new(positions)
            })
            .collect();
        let trajectory = Trajectory::new(frames).unwrap();

        let serial = align(trajectory.clone(), &reference, &all).unwrap();
        // more threads than frames and zero threads are both accepted
        for n_threads in [0, 8] {
            let parallel = align_parallel(trajectory.clone(), &reference, &all, n_threads).unwrap();
            assert_eq!(parallel.n_frames(), 3);
            for (a, b) in serial.frames().iter().zip(parallel.frames().iter()) {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn align_fail_two_atoms() {
        let reference_frame = Frame::new(points());
        let fit = Selection::new("TwoAtoms", vec![0, 3], 5).unwrap();
        let reference = Reference::from_frame(&reference_frame, &fit).unwrap();
        let trajectory = Trajectory::new(vec![reference_frame.clone()]).unwrap();

        assert_eq!(
            align(trajectory, &reference, &fit),
            Err(AlignmentError::DegenerateSelection("TwoAtoms".to_owned()))
        );
    }

    #[test]
    fn align_fail_collinear() {
        let line: Vec<Vector3<f64>> = (0..5).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect();
        let frame = Frame::new(line);
        let all = Selection::all("Line", 5).unwrap();
        let reference = Reference::from_frame(&frame, &all).unwrap();
        let trajectory = Trajectory::new(vec![frame]).unwrap();

        assert_eq!(
            align(trajectory, &reference, &all),
            Err(AlignmentError::DegenerateSelection("Line".to_owned()))
        );
    }

    #[test]
    fn align_fail_empty_trajectory() {
        let all = Selection::all("All", 5).unwrap();
        let reference = Reference::from_frame(&Frame::new(points()), &all).unwrap();
        let trajectory = Trajectory::new(vec![]).unwrap();

        assert_eq!(
            align(trajectory, &reference, &all),
            Err(AlignmentError::EmptyTrajectory)
        );
    }

    #[test]
    fn align_fail_missing_reference_atom() {
        let frame = Frame::new(points());
        let reference_atoms = Selection::new("Reference", vec![0, 1, 2], 5).unwrap();
        let fit = Selection::new("Fit", vec![0, 1, 2, 4], 5).unwrap();
        let reference = Reference::from_frame(&frame, &reference_atoms).unwrap();
        let trajectory = Trajectory::new(vec![frame]).unwrap();

        assert_eq!(
            align(trajectory, &reference, &fit),
            Err(AlignmentError::MissingReferenceAtom(4))
        );
    }

    #[test]
    fn align_fail_selection_out_of_range() {
        let frame = Frame::new(points());
        let all = Selection::all("All", 5).unwrap();
        let large = Selection::new("Large", vec![0, 1, 2, 7], 10).unwrap();
        let reference = Reference::from_frame(&frame, &all).unwrap();
        let trajectory = Trajectory::new(vec![frame]).unwrap();

        assert_eq!(
            align(trajectory, &reference, &large),
            Err(AlignmentError::InvalidIndex("Large".to_owned(), 7, 5))
        );
    }

    #[test]
    fn reference_new_fail_size() {
        let atoms = Selection::new("Reference", vec![0, 1, 2], 5).unwrap();
        match Reference::new(points(), atoms) {
            Err(AlignmentError::ShapeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 5);
            }
            _ => panic!("Reference with a wrong number of positions should not be created."),
        }
    }
}
