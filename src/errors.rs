// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains error types that can be returned by the `grmsf` crate.

use std::path::Path;

use colored::{ColoredString, Colorize};
use thiserror::Error;

fn path_to_yellow(path: &Path) -> ColoredString {
    path.to_string_lossy().yellow()
}

/// Errors that can occur inside the application itself.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{} could not read the configuration file '{}'", "error:".red().bold(), .0.yellow())]
    CouldNotReadConfig(String),
}

/// Errors that can occur when reading or validating the parameters of the analysis.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} could not open the configuration file '{}'", "error:".red().bold(), .0.yellow())]
    CouldNotOpenConfig(String),

    #[error("{} could not understand the contents of the configuration file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotParseConfig(String, serde_yaml::Error),

    #[error("{} every Nth frame to analyze must be at least 1 (got '{}')", "error:".red().bold(), "0".yellow())]
    InvalidStep,

    #[error("{} the number of threads must be at least 1 (got '{}')", "error:".red().bold(), "0".yellow())]
    InvalidNThreads,

    #[error("{} the starting time of the analysis is higher than the ending time", "error:".red().bold())]
    InvalidBeginEnd,

    #[error("{} selection query for '{}' is empty", "error:".red().bold(), .0.yellow())]
    EmptyQuery(String),
}

/// Errors that can occur when reading the input files.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("{} could not read structure file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotReadStructure(String, String),

    #[error("{} could not read index file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotReadIndex(String, String),

    #[error("{} could not read trajectory file '{}' ({})", "error:".red().bold(), .0.yellow(), .1)]
    CouldNotReadTrajectory(String, String),
}

/// Errors that can occur when selecting atoms from the system.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("{} could not parse the selection query '{}'", "error:".red().bold(), .0.yellow())]
    InvalidQuery(String),

    #[error("{} group '{}' is empty", "error:".red().bold(), .0.yellow())]
    EmptyGroup(String),

    #[error("{} atom with atom number '{}' is part of the fitting selection (query: '{}') but not of the reference selection (query: '{}')", "error:".red().bold(), .atom.to_string().yellow(), .fit.yellow(), .reference.yellow())]
    FitOutsideReference {
        atom: usize,
        fit: String,
        reference: String,
    },

    #[error("{} atom with atom number '{}' has an undefined position", "error:".red().bold(), .0.to_string().yellow())]
    UndefinedPosition(usize),
}

/// Errors that can occur while superposing the trajectory or calculating the fluctuations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("{} frame '{}' contains '{}' atoms but '{}' atoms were expected", "error:".red().bold(), .frame.to_string().yellow(), .found.to_string().yellow(), .expected.to_string().yellow())]
    ShapeMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("{} selection '{}' contains no atoms", "error:".red().bold(), .0.yellow())]
    EmptySelection(String),

    #[error("{} selection '{}' contains fewer than 3 non-collinear atoms and cannot be used for fitting", "error:".red().bold(), .0.yellow())]
    DegenerateSelection(String),

    #[error("{} selection '{}' refers to atom index '{}' but the system only contains '{}' atoms", "error:".red().bold(), .0.yellow(), .1.to_string().yellow(), .2.to_string().yellow())]
    InvalidIndex(String, usize, usize),

    #[error("{} atom with index '{}' of the fitting selection has no counterpart in the reference structure", "error:".red().bold(), .0.to_string().yellow())]
    MissingReferenceAtom(usize),

    #[error("{} trajectory contains no frames", "error:".red().bold())]
    EmptyTrajectory,

    #[error("{} selection contains '{}' atoms but '{}' fluctuations were provided", "error:".red().bold(), .expected.to_string().yellow(), .found.to_string().yellow())]
    ValueCountMismatch { expected: usize, found: usize },

    #[error("{} atom with index '{}' is not part of the topology", "error:".red().bold(), .0.to_string().yellow())]
    MissingTopologyAtom(usize),

    #[error("{} singular value decomposition of the covariance matrix failed", "error:".red().bold())]
    SvdFailed,

    #[error("{} could not create a pool of threads: {}", "error:".red().bold(), .0)]
    ThreadPool(String),
}

/// Errors that can occur while writing the results.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{} could not create file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotCreateFile(Box<Path>),

    #[error("{} could not create a backup for file '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotBackupFile(Box<Path>),

    #[error("{} could not write results in yaml format into '{}'", "error:".red().bold(), path_to_yellow(.0))]
    CouldNotWriteYaml(Box<Path>),

    #[error("{} could not write results ({})", "error:".red().bold(), .0)]
    CouldNotWriteResults(std::io::Error),
}
