// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Reading of the system and its trajectory into the structures used for the calculation.

use std::fmt::Display;

use groan_rs::errors::GroupError;
use groan_rs::prelude::*;
use nalgebra::Vector3;

use crate::{
    errors::{AlignmentError, ReadError, TopologyError},
    input::Analysis,
    PANIC_MESSAGE,
};

use super::frame::{AtomInfo, Frame, Selection, Topology, Trajectory};
use super::pipeline::Pipeline;

/// A prefix used as an identifier for grmsf groups.
const GRMSF_GROUP_PREFIX: &str = "xxxGrmsfReservedxxx-";

#[macro_use]
pub(crate) mod macros {
    macro_rules! group_name {
        ($group:expr) => {
            concat!("xxxGrmsfReservedxxx-", $group)
        };
    }

    pub(crate) use group_name;
}

/// Atoms of the system that are read from the trajectory, together with the selections
/// expressed as indices into this set of atoms.
#[derive(Debug, Clone)]
pub(super) struct TrackedAtoms {
    /// Indices of the tracked atoms in the system.
    indices: Vec<usize>,
    /// Labels of the tracked atoms.
    topology: Topology,
    /// Selections converted to indices into the tracked atoms.
    pipeline: Pipeline,
}

impl TrackedAtoms {
    #[inline(always)]
    pub(super) fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline(always)]
    pub(super) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Read the structure file and the (optional) index file.
pub(super) fn read_system(analysis: &Analysis) -> Result<System, ReadError> {
    let mut system = System::from_file(analysis.structure()).map_err(|e| {
        ReadError::CouldNotReadStructure(analysis.structure().to_owned(), e.to_string())
    })?;

    log::info!(
        "Read molecular system '{}' ({} atoms).",
        analysis.structure(),
        system.get_n_atoms()
    );

    if let Some(index) = analysis.index() {
        system
            .read_ndx(index)
            .map_err(|e| ReadError::CouldNotReadIndex(index.to_owned(), e.to_string()))?;
        log::info!("Read index file '{}'.", index);
    }

    Ok(system)
}

/// Create group handling all potential errors. Also check that the group is not empty.
pub(super) fn create_group(
    system: &mut System,
    group: &str,
    query: &str,
) -> Result<(), TopologyError> {
    let group_name = format!("{}{}", GRMSF_GROUP_PREFIX, group);

    match system.group_create(&group_name, query) {
        Ok(_) | Err(GroupError::AlreadyExistsWarning(_)) => (),
        Err(GroupError::InvalidQuery(_)) => {
            return Err(TopologyError::InvalidQuery(query.to_owned()))
        }
        Err(e) => panic!(
            "FATAL GRMSF ERROR | topology::create_group | Unexpected error `{}` returned when selecting '{}' using the query '{}'. {}",
            e, group, query, PANIC_MESSAGE
        ),
    }

    if system.group_isempty(&group_name).unwrap_or_else(|_| {
        panic!(
            "FATAL GRMSF ERROR | topology::create_group | Group '{}' should exist. {}",
            group, PANIC_MESSAGE,
        )
    }) {
        Err(TopologyError::EmptyGroup(group.to_owned()))
    } else {
        Ok(())
    }
}

/// Get sorted indices of atoms of a group.
fn group_indices(system: &System, group_name: &str) -> Vec<usize> {
    let mut indices: Vec<usize> = system
        .group_iter(group_name)
        .unwrap_or_else(|_| {
            panic!(
                "FATAL GRMSF ERROR | topology::group_indices | Group '{}' should exist. {}",
                group_name, PANIC_MESSAGE
            )
        })
        .map(|atom| atom.get_index())
        .collect();

    indices.sort_unstable();
    indices
}

/// Select the atoms for the analysis and determine which atoms must be read from the trajectory.
///
/// Only atoms of the reference selection and of the measured selection are tracked.
/// The fitting selection must be a subset of the reference selection.
pub(super) fn prepare_tracked_atoms(
    system: &mut System,
    analysis: &Analysis,
) -> Result<TrackedAtoms, Box<dyn std::error::Error + Send + Sync>> {
    create_group(system, "Fit", analysis.fit_selection())?;
    create_group(system, "Reference", analysis.reference_selection())?;
    create_group(system, "Measured", analysis.rmsf_selection())?;

    let fit = group_indices(system, group_name!("Fit"));
    let reference = group_indices(system, group_name!("Reference"));
    let measured = group_indices(system, group_name!("Measured"));

    if let Some(&outside) = fit.iter().find(|i| reference.binary_search(i).is_err()) {
        return Err(Box::from(TopologyError::FitOutsideReference {
            atom: outside + 1,
            fit: analysis.fit_selection().to_owned(),
            reference: analysis.reference_selection().to_owned(),
        }));
    }

    let mut indices = reference.clone();
    indices.extend(measured.iter());
    indices.sort_unstable();
    indices.dedup();

    log::info!(
        "Fitting atoms: {}. Reference atoms: {}. Measured atoms: {}.",
        fit.len(),
        reference.len(),
        measured.len()
    );

    let topology = Topology::new(
        indices
            .iter()
            .map(|&i| {
                let atom = system.get_atom(i).unwrap_or_else(|_| {
                    panic!(
                        "FATAL GRMSF ERROR | topology::prepare_tracked_atoms | Atom with index '{}' should exist. {}",
                        i, PANIC_MESSAGE
                    )
                });

                AtomInfo::new(
                    atom.get_atom_name(),
                    atom.get_residue_name(),
                    atom.get_residue_number(),
                )
            })
            .collect(),
    );

    let pipeline = Pipeline::new(
        to_tracked(&indices, &fit, "Fit")?,
        to_tracked(&indices, &reference, "Reference")?,
        to_tracked(&indices, &measured, "Measured")?,
    )
    .with_threads(analysis.n_threads());

    Ok(TrackedAtoms {
        indices,
        topology,
        pipeline,
    })
}

/// Convert indices of atoms in the system into a selection of tracked atoms.
fn to_tracked(tracked: &[usize], atoms: &[usize], name: &str) -> Result<Selection, AlignmentError> {
    let converted = atoms
        .iter()
        .map(|i| {
            tracked.binary_search(i).unwrap_or_else(|_| {
                panic!(
                    "FATAL GRMSF ERROR | topology::to_tracked | Atom with index '{}' is not tracked. {}",
                    i, PANIC_MESSAGE
                )
            })
        })
        .collect();

    Selection::new(name, converted, tracked.len())
}

/// Read positions of the tracked atoms from the trajectory.
pub(super) fn read_trajectory(
    system: &mut System,
    tracked: &TrackedAtoms,
    analysis: &Analysis,
) -> Result<Trajectory, Box<dyn std::error::Error + Send + Sync>> {
    let path = analysis.trajectory();

    let reader = system
        .xtc_iter(path)
        .map_err(|e| ReadError::CouldNotReadTrajectory(path.to_owned(), e.to_string()))?
        .with_range(analysis.begin(), analysis.end())
        .map_err(|e| ReadError::CouldNotReadTrajectory(path.to_owned(), e.to_string()))?
        .with_step(analysis.step())
        .map_err(|e| ReadError::CouldNotReadTrajectory(path.to_owned(), e.to_string()))?;

    let trajectory = if analysis.silent() {
        collect_frames(reader, tracked, path)?
    } else {
        collect_frames(reader.print_progress(ProgressPrinter::new()), tracked, path)?
    };

    log::info!(
        "Trajectory reading completed. Read {} trajectory frames.",
        trajectory.n_frames()
    );

    Ok(trajectory)
}

/// Copy the positions of the tracked atoms from each frame.
fn collect_frames<'a, E: Display>(
    reader: impl Iterator<Item = Result<&'a mut System, E>>,
    tracked: &TrackedAtoms,
    path: &str,
) -> Result<Trajectory, Box<dyn std::error::Error + Send + Sync>> {
    let mut trajectory = Trajectory::new(Vec::new())?;

    for frame in reader {
        let frame = frame
            .map_err(|e| ReadError::CouldNotReadTrajectory(path.to_owned(), e.to_string()))?;

        let positions = tracked
            .indices
            .iter()
            .map(|&i| {
                let atom = frame.get_atom(i).unwrap_or_else(|_| {
                    panic!(
                        "FATAL GRMSF ERROR | topology::collect_frames | Atom with index '{}' should exist. {}",
                        i, PANIC_MESSAGE
                    )
                });

                atom.get_position()
                    .map(|p| Vector3::new(p.x as f64, p.y as f64, p.z as f64))
                    .ok_or(TopologyError::UndefinedPosition(atom.get_atom_number()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        trajectory.push(Frame::new(positions))?;
    }

    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_tracked_pass() {
        let tracked = [2, 3, 5, 8, 13, 21];
        let selection = to_tracked(&tracked, &[3, 8, 21], "Test").unwrap();
        assert_eq!(selection.indices(), &[1, 3, 5]);
        assert_eq!(selection.name(), "Test");
    }

    #[test]
    fn to_tracked_all() {
        let tracked = [0, 1, 4, 6];
        let selection = to_tracked(&tracked, &tracked, "All").unwrap();
        assert_eq!(selection.indices(), &[0, 1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn to_tracked_panic_untracked() {
        let tracked = [2, 3, 5];
        let _ = to_tracked(&tracked, &[4], "Test");
    }

    #[test]
    fn group_name_prefix() {
        assert_eq!(
            group_name!("Fit"),
            format!("{}{}", GRMSF_GROUP_PREFIX, "Fit")
        );
    }
}
