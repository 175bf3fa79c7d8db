// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains structures and methods for specifying parameters of the analysis.

pub mod analysis;

pub use analysis::{Analysis, AnalysisBuilder};
