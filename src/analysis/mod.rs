// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains the implementation of the analysis logic.

use crate::{input::Analysis, presentation::RmsfResults};

pub mod fluctuation;
pub mod frame;
pub mod pipeline;
pub mod reference;
pub mod superposition;
mod topology;

impl Analysis {
    /// Perform the analysis and write out the results.
    ///
    /// Only the atoms of the reference and measured selections are read from the trajectory.
    pub fn run(&self) -> Result<RmsfResults, Box<dyn std::error::Error + Send + Sync>> {
        self.info();

        let mut system = topology::read_system(self)?;
        let tracked = topology::prepare_tracked_atoms(&mut system, self)?;
        let trajectory = topology::read_trajectory(&mut system, &tracked, self)?;
        let n_frames = trajectory.n_frames();

        let result = tracked.pipeline().run(trajectory, tracked.topology())?;
        let results = RmsfResults::new(&result, n_frames, self.structure(), self.trajectory());

        results.write_all(self)?;

        Ok(results)
    }
}
