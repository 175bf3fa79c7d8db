// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Calculation of root mean square fluctuations of atoms and residues.

use getset::{CopyGetters, Getters};
use nalgebra::Vector3;

use crate::errors::AlignmentError;

use super::frame::{AlignedTrajectory, Selection, Topology};

/// Running mean and sum of squared deviations of atom positions (Welford's algorithm).
#[derive(Debug, Clone)]
struct FluctuationAccumulator {
    mean: Vec<Vector3<f64>>,
    m2: Vec<f64>,
    samples: usize,
}

impl FluctuationAccumulator {
    fn new(n_atoms: usize) -> Self {
        Self {
            mean: vec![Vector3::zeros(); n_atoms],
            m2: vec![0.0; n_atoms],
            samples: 0,
        }
    }

    /// Add positions of all tracked atoms from a single frame.
    fn add<'a>(&mut self, positions: impl Iterator<Item = &'a Vector3<f64>>) {
        self.samples += 1;
        let n = self.samples as f64;

        for ((mean, m2), position) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(positions) {
            let delta = position - *mean;
            *mean += delta / n;
            *m2 += delta.dot(&(position - *mean));
        }
    }

    /// Root mean square fluctuation of each tracked atom.
    fn rmsf(&self) -> Vec<f64> {
        let n = self.samples as f64;
        self.m2.iter().map(|&m2| (m2 / n).max(0.0).sqrt()).collect()
    }
}

/// Calculate root mean square fluctuation of each atom of `selection`.
///
/// No superposition is performed; the fluctuations are measured around the mean position
/// of each atom in the provided trajectory. Values are returned in the order of the selection
/// and in the length units of the trajectory.
pub fn rmsf(
    trajectory: &AlignedTrajectory,
    selection: &Selection,
) -> Result<Vec<f64>, AlignmentError> {
    if trajectory.is_empty() {
        return Err(AlignmentError::EmptyTrajectory);
    }

    if selection.is_empty() {
        return Err(AlignmentError::EmptySelection(selection.name().to_owned()));
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

    let mut accumulator = FluctuationAccumulator::new(selection.len());
    for frame in trajectory.frames() {
        let positions = frame.positions();
        accumulator.add(selection.iter().map(|&i| &positions[i]));
    }

    Ok(accumulator.rmsf())
}

/// Fluctuation of a single atom.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct AtomFluctuation {
    /// Index of the atom in the system.
    #[getset(get_copy = "pub")]
    index: usize,
    #[getset(get = "pub")]
    atom_name: String,
    #[getset(get = "pub")]
    residue_name: String,
    #[getset(get_copy = "pub")]
    residue_number: usize,
    #[getset(get_copy = "pub")]
    rmsf: f64,
}

/// Fluctuation of a single residue.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct ResidueFluctuation {
    #[getset(get_copy = "pub")]
    residue_number: usize,
    #[getset(get = "pub")]
    residue_name: String,
    /// Number of atoms of the residue contributing to `rmsf`.
    #[getset(get_copy = "pub")]
    n_atoms: usize,
    /// Average fluctuation of the atoms of this residue.
    #[getset(get_copy = "pub")]
    rmsf: f64,
}

/// Fluctuations of the selected atoms labeled with their residues.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RmsfResult {
    atoms: Vec<AtomFluctuation>,
}

impl RmsfResult {
    /// Label per-atom fluctuations (as returned by [`rmsf`]) using the system topology.
    ///
    /// Fails if the number of values does not match the selection
    /// or if the selection refers to an atom missing from the topology.
    pub fn new(
        selection: &Selection,
        values: &[f64],
        topology: &Topology,
    ) -> Result<Self, AlignmentError> {
        if selection.len() != values.len() {
            return Err(AlignmentError::ValueCountMismatch {
                expected: selection.len(),
                found: values.len(),
            });
        }

        let atoms = selection
            .iter()
            .zip(values.iter())
            .map(|(&index, &rmsf)| {
                let info = topology
                    .get(index)
                    .ok_or(AlignmentError::MissingTopologyAtom(index))?;

                Ok(AtomFluctuation {
                    index,
                    atom_name: info.atom_name().clone(),
                    residue_name: info.residue_name().clone(),
                    residue_number: info.residue_number(),
                    rmsf,
                })
            })
            .collect::<Result<Vec<_>, AlignmentError>>()?;

        Ok(Self { atoms })
    }

    #[inline(always)]
    pub fn atoms(&self) -> &[AtomFluctuation] {
        &self.atoms
    }

    /// Split the atoms into residues.
    ///
    /// A new residue starts whenever the residue number or the residue name changes,
    /// or when the atom name already occurs in the current residue. Identically numbered
    /// residues of different chains therefore stay separate.
    pub(crate) fn residue_groups(&self) -> Vec<&[AtomFluctuation]> {
        let mut groups = Vec::new();
        let mut start = 0;

        for (i, atom) in self.atoms.iter().enumerate().skip(1) {
            let current = &self.atoms[start..i];
            let first = &current[0];

            if first.residue_number != atom.residue_number
                || first.residue_name != atom.residue_name
                || current.iter().any(|a| a.atom_name == atom.atom_name)
            {
                groups.push(current);
                start = i;
            }
        }

        if start < self.atoms.len() {
            groups.push(&self.atoms[start..]);
        }

        groups
    }

    /// Aggregate the atom fluctuations into residues.
    /// The fluctuation of a residue is the arithmetic mean of the fluctuations of its atoms.
    pub fn residues(&self) -> Vec<ResidueFluctuation> {
        self.residue_groups()
            .into_iter()
            .map(|atoms| ResidueFluctuation {
                residue_number: atoms[0].residue_number,
                residue_name: atoms[0].residue_name.clone(),
                n_atoms: atoms.len(),
                rmsf: atoms.iter().map(|a| a.rmsf).sum::<f64>() / atoms.len() as f64,
            })
            .collect()
    }
}
