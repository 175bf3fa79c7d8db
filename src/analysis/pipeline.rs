// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Two-pass alignment of a trajectory followed by the calculation of fluctuations.
//!
//! Superposing all frames onto a single frame biases the result towards the conformation
//! of that frame. The trajectory is therefore first superposed onto its first frame,
//! the average structure is calculated from this prealigned trajectory, and the trajectory
//! is then superposed once more, now onto the average structure.

use getset::{CopyGetters, Getters};

use crate::errors::AlignmentError;

use super::fluctuation::{rmsf, RmsfResult};
use super::frame::{AlignedTrajectory, Selection, Topology, Trajectory};
use super::reference::mean_reference;
use super::superposition::{align_parallel, Reference};

/// Selections driving the individual steps of the calculation.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Pipeline {
    /// Atoms used to fit the frames onto the reference.
    #[getset(get = "pub")]
    fit: Selection,
    /// Atoms forming the reference structure. Must contain all atoms of `fit`.
    #[getset(get = "pub")]
    reference: Selection,
    /// Atoms for which the fluctuations are calculated.
    #[getset(get = "pub")]
    measured: Selection,
    /// Number of threads used for superposing the frames.
    #[getset(get_copy = "pub")]
    n_threads: usize,
}

impl Pipeline {
    pub fn new(fit: Selection, reference: Selection, measured: Selection) -> Self {
        Self {
            fit,
            reference,
            measured,
            n_threads: 1,
        }
    }

    /// Superpose the frames using `n_threads` threads.
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }

    /// Superpose the trajectory onto its first frame and then onto its average structure.
    pub fn align(&self, trajectory: Trajectory) -> Result<AlignedTrajectory, AlignmentError> {
        let first = trajectory
            .frames()
            .first()
            .ok_or(AlignmentError::EmptyTrajectory)?;

        log::info!("Superposing the trajectory onto its first frame...");
        let initial = Reference::from_frame(first, &self.reference)?;
        let prealigned = align_parallel(trajectory, &initial, &self.fit, self.n_threads)?;

        log::info!(
            "Calculating the average structure of '{}' ({} atoms)...",
            self.reference.name(),
            self.reference.len()
        );
        let average = mean_reference(&prealigned, &self.reference)?;

        log::info!("Superposing the trajectory onto the average structure...");
        align_parallel(prealigned.into_inner(), &average, &self.fit, self.n_threads)
    }

    /// Align the trajectory and calculate fluctuations of the measured atoms.
    pub fn run(
        &self,
        trajectory: Trajectory,
        topology: &Topology,
    ) -> Result<RmsfResult, AlignmentError> {
        if trajectory.is_empty() {
            return Err(AlignmentError::EmptyTrajectory);
        }

        if trajectory.n_frames() < 2 {
            log::warn!(
                "Trajectory contains {} frame(s). Fluctuations of all atoms will be zero.",
                trajectory.n_frames()
            );
        }

        let aligned = self.align(trajectory)?;

        log::info!(
            "Calculating fluctuations of '{}' ({} atoms)...",
            self.measured.name(),
            self.measured.len()
        );
        let values = rmsf(&aligned, &self.measured)?;

        RmsfResult::new(&self.measured, &values, topology)
    }
}
