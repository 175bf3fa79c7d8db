// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Storage of trajectory frames, atom selections and atom labels.

use std::ops::Deref;

use getset::{CopyGetters, Getters};
use nalgebra::Vector3;

use crate::errors::AlignmentError;

/// Coordinates of all atoms of the system in a single simulation frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    positions: Vec<Vector3<f64>>,
}

impl Frame {
    pub fn new(positions: Vec<Vector3<f64>>) -> Self {
        Self { positions }
    }

    #[inline(always)]
    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }

    #[inline(always)]
    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    #[inline(always)]
    pub(crate) fn positions_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.positions
    }

    /// Collect positions of the selected atoms.
    /// Indices of the selection must be valid for this frame.
    pub fn select(&self, selection: &Selection) -> Vec<Vector3<f64>> {
        selection.iter().map(|&i| self.positions[i]).collect()
    }
}

impl From<Vec<[f64; 3]>> for Frame {
    fn from(value: Vec<[f64; 3]>) -> Self {
        Frame::new(value.into_iter().map(Vector3::from).collect())
    }
}

/// Ordered sequence of frames sharing the same number and ordering of atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    frames: Vec<Frame>,
    n_atoms: usize,
}

impl Trajectory {
    /// Construct a trajectory, checking that all frames contain the same number of atoms.
    pub fn new(frames: Vec<Frame>) -> Result<Self, AlignmentError> {
        let n_atoms = frames.first().map(|f| f.n_atoms()).unwrap_or(0);

        if let Some((i, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.n_atoms() != n_atoms)
        {
            return Err(AlignmentError::ShapeMismatch {
                frame: i,
                expected: n_atoms,
                found: frame.n_atoms(),
            });
        }

        Ok(Self { frames, n_atoms })
    }

    /// Append a frame to the end of the trajectory.
    pub fn push(&mut self, frame: Frame) -> Result<(), AlignmentError> {
        if self.frames.is_empty() {
            self.n_atoms = frame.n_atoms();
        } else if frame.n_atoms() != self.n_atoms {
            return Err(AlignmentError::ShapeMismatch {
                frame: self.frames.len(),
                expected: self.n_atoms,
                found: frame.n_atoms(),
            });
        }

        self.frames.push(frame);
        Ok(())
    }

    #[inline(always)]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline(always)]
    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    #[inline(always)]
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline(always)]
    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Trajectory whose frames have been superposed onto a common reference.
///
/// Averaging coordinates or measuring fluctuations only makes sense for an aligned
/// trajectory, so both operations require this type instead of a raw [`Trajectory`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTrajectory(Trajectory);

impl AlignedTrajectory {
    #[inline(always)]
    pub(crate) fn from_superposed(trajectory: Trajectory) -> Self {
        Self(trajectory)
    }

    /// Treat a trajectory as already aligned, e.g. when it was fitted by an external tool.
    ///
    /// No check is performed. If the trajectory still contains global rotation or translation,
    /// the mean structure is blurred and the calculated fluctuations are overestimated.
    #[inline(always)]
    pub fn assume_aligned(trajectory: Trajectory) -> Self {
        Self(trajectory)
    }

    /// Release the underlying trajectory.
    #[inline(always)]
    pub fn into_inner(self) -> Trajectory {
        self.0
    }
}

impl Deref for AlignedTrajectory {
    type Target = Trajectory;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Named set of atom indices. Indices are sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Selection {
    #[getset(get = "pub")]
    name: String,
    indices: Vec<usize>,
}

impl Selection {
    /// Create a selection from atom indices, validating them against the number of atoms in the system.
    pub fn new(
        name: &str,
        mut indices: Vec<usize>,
        n_atoms: usize,
    ) -> Result<Self, AlignmentError> {
        if indices.is_empty() {
            return Err(AlignmentError::EmptySelection(name.to_owned()));
        }

        indices.sort_unstable();
        indices.dedup();

        if let Some(&last) = indices.last() {
            if last >= n_atoms {
                return Err(AlignmentError::InvalidIndex(name.to_owned(), last, n_atoms));
            }
        }

        Ok(Self {
            name: name.to_owned(),
            indices,
        })
    }

    /// Select all atoms of a system with `n_atoms` atoms.
    pub fn all(name: &str, n_atoms: usize) -> Result<Self, AlignmentError> {
        Self::new(name, (0..n_atoms).collect(), n_atoms)
    }

    #[inline(always)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.indices.iter()
    }

    /// Position of the atom with the given index inside this selection.
    #[inline]
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.indices.binary_search(&index).ok()
    }
}

/// Labels of a single atom.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct AtomInfo {
    #[getset(get = "pub")]
    atom_name: String,
    #[getset(get = "pub")]
    residue_name: String,
    #[getset(get_copy = "pub")]
    residue_number: usize,
}

impl AtomInfo {
    pub fn new(atom_name: &str, residue_name: &str, residue_number: usize) -> Self {
        Self {
            atom_name: atom_name.to_owned(),
            residue_name: residue_name.to_owned(),
            residue_number,
        }
    }
}

/// Labels of all atoms of the system, in the same order as the coordinates of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    atoms: Vec<AtomInfo>,
}

impl Topology {
    pub fn new(atoms: Vec<AtomInfo>) -> Self {
        Self { atoms }
    }

    #[inline(always)]
    pub fn atoms(&self) -> &[AtomInfo] {
        &self.atoms
    }

    #[inline(always)]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&AtomInfo> {
        self.atoms.get(index)
    }
}
