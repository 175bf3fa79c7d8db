// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! # grmsf: Root mean square fluctuations of Gromacs trajectories
//!
//! Crate for calculating root mean square fluctuations (RMSF) of atoms and residues
//! from Gromacs simulations.
//!
//! Superposing every frame onto a single frame of the trajectory biases the fluctuations
//! towards that frame. `grmsf` therefore superposes the trajectory in two passes: first onto
//! its first frame, then onto the average structure calculated from the prealigned trajectory.
//! Fluctuations are calculated from the second alignment.
//!
//! ## Usage
//!
//! Run:
//!
//! ```bash
//! $ cargo add grmsf
//! ```
//!
//! Import the crate in your Rust code:
//!
//! ```rust
//! use grmsf::prelude::*;
//! ```
//!
//! `grmsf` is also available as a command line tool. You can install it using:
//! ```bash
//! $ cargo install grmsf
//! ```
//!
//! ## Examples
//!
//! Basic analysis of C-alpha fluctuations of a protein.
//! ```no_run
//! use grmsf::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // construct the analysis
//!     let analysis = Analysis::new()
//!             .structure("system.tpr")                   // structure file
//!             .trajectory("md.xtc")                      // trajectory file to analyze
//!             .output("rmsf.yaml")                       // output yaml file
//!             .build()?;                                 // constructing the analysis
//!
//!     // activate colog if you want logging (requires the `colog` crate)
//!     colog::init();
//!
//!     // run the analysis and write the output
//!     analysis.run()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ***
//!
//! The `Analysis` structure has several other, optional fields.
//!
//! ```no_run
//! use grmsf::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let analysis = Analysis::new()
//!             .structure("system.tpr")                   // structure file
//!             .trajectory("md.xtc")                      // trajectory file to analyze
//!             .index("index.ndx")                        // input ndx file
//!             .output_yaml("rmsf.yaml")                  // output yaml file
//!             .output_tab("rmsf.tab")                    // output table file
//!             .output_xvg("rmsf.xvg")                    // output xvg file for plotting
//!             .output_csv("rmsf.csv")                    // output csv file
//!             .fit_selection("@protein and name N CA C") // atoms used for fitting
//!             .reference_selection("@protein")           // atoms of the average structure
//!             .rmsf_selection("@protein and name CA")    // atoms to calculate fluctuations for
//!             .begin(100_000.0)                          // starting time of analysis
//!             .end(200_000.0)                            // ending time of analysis
//!             .step(5)                                   // analyze every Nth frame of the trajectory
//!             .n_threads(4)                              // number of threads used for fitting
//!             .build()?;
//!
//!     let results = analysis.run()?;
//!     for residue in results.residues() {
//!         println!("{} {}", residue.residue_number(), residue.rmsf());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ***
//!
//! The individual steps of the calculation can also be used on trajectories
//! that are already loaded in memory.
//!
//! ```no_run
//! use grmsf::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let frames: Vec<Frame> = vec![/* ... */];
//!     let trajectory = Trajectory::new(frames)?;
//!     let all = Selection::all("All", trajectory.n_atoms())?;
//!
//!     let pipeline = Pipeline::new(all.clone(), all.clone(), all.clone());
//!     let aligned = pipeline.align(trajectory)?;
//!     let fluctuations = rmsf(&aligned, &all)?;
//!
//!     println!("{:?}", fluctuations);
//!     Ok(())
//! }
//! ```

/// Version of the `grmsf` crate.
pub const GRMSF_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Message that should be added to every panic.
pub(crate) const PANIC_MESSAGE: &str =
    "\n\n\n            >>> THIS SHOULD NOT HAVE HAPPENED! PLEASE REPORT THIS ERROR <<<
(open an issue at 'github.com/Ladme/grmsf/issues' or write an e-mail to 'ladmeb@gmail.com')\n\n";

pub mod analysis;
pub mod errors;
pub mod input;
pub mod presentation;

pub use input::{Analysis, AnalysisBuilder};

/// This module contains re-exported public structures of the `grmsf` crate.
pub mod prelude {
    pub use super::input::{analysis::AnalysisBuilder, Analysis};

    pub use super::analysis::{
        fluctuation::{rmsf, AtomFluctuation, ResidueFluctuation, RmsfResult},
        frame::{AlignedTrajectory, AtomInfo, Frame, Selection, Topology, Trajectory},
        pipeline::Pipeline,
        reference::{mean_frame, mean_reference},
        superposition::{align, align_parallel, Reference, Superposition},
    };

    pub use super::presentation::{ResidueResults, RmsfResults};
}
