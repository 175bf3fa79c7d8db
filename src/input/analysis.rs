// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the main `Analysis` structure and its methods.

use std::fs::read_to_string;
use std::path::Path;

use derive_builder::Builder;
use getset::{CopyGetters, Getters, Setters};
use serde::Deserialize;

use crate::errors::ConfigError;

/// Default selection of atoms used to fit the frames: C-alpha atoms of the protein.
pub const DEFAULT_FIT_SELECTION: &str = "@protein and name CA";
/// Default selection of atoms forming the average reference structure.
pub const DEFAULT_REFERENCE_SELECTION: &str = "@protein";
/// Default selection of atoms for which the fluctuations are calculated.
pub const DEFAULT_RMSF_SELECTION: &str = "@protein and name CA";

/// Structure holding all the information necessary to perform the analysis.
#[derive(Debug, Clone, Builder, Getters, CopyGetters, Setters, Deserialize)]
#[serde(deny_unknown_fields)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Analysis {
    /// Path to a file containing the structure of the system (tpr, gro, pdb, or pqr).
    #[builder(setter(into))]
    #[getset(get = "pub")]
    structure: String,
    /// Path to an XTC trajectory file containing the trajectory to be analyzed.
    #[builder(setter(into))]
    #[getset(get = "pub")]
    trajectory: String,
    /// Path to NDX file containing the groups associated with the system.
    /// Optional parameter.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    index: Option<String>,
    /// Path to an output YAML file where the results of the analysis will be written.
    #[builder(setter(into))]
    #[getset(get = "pub")]
    #[serde(alias = "output")]
    output_yaml: String,
    /// Path to an output TABLE file where the results of the analysis will be written in a human readable format.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    output_tab: Option<String>,
    /// Path to an output XVG file containing the fluctuations of the residues, ready for plotting.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    output_xvg: Option<String>,
    /// Path to an output CSV file where the results of the analysis will be written.
    #[builder(setter(into, strip_option), default)]
    #[getset(get = "pub")]
    output_csv: Option<String>,
    /// Selection of atoms used to superpose the trajectory frames.
    /// Must be a subset of `reference_selection`.
    /// If not provided, the default value is '@protein and name CA'.
    #[builder(setter(into), default = "DEFAULT_FIT_SELECTION.to_owned()")]
    #[serde(default = "default_fit_selection", alias = "fit")]
    #[getset(get = "pub")]
    fit_selection: String,
    /// Selection of atoms forming the average structure onto which the trajectory is superposed.
    /// If not provided, the default value is '@protein'.
    #[builder(setter(into), default = "DEFAULT_REFERENCE_SELECTION.to_owned()")]
    #[serde(default = "default_reference_selection", alias = "reference")]
    #[getset(get = "pub")]
    reference_selection: String,
    /// Selection of atoms for which the fluctuations are calculated.
    /// If not provided, the default value is '@protein and name CA'.
    #[builder(setter(into), default = "DEFAULT_RMSF_SELECTION.to_owned()")]
    #[serde(default = "default_rmsf_selection", alias = "atoms")]
    #[getset(get = "pub")]
    rmsf_selection: String,
    /// Starting time of the trajectory analysis (in ps).
    /// If not specified, the analysis starts at the beginning of the trajectory.
    #[builder(default = "0.0")]
    #[serde(default = "default_begin", alias = "start")]
    #[getset(get_copy = "pub")]
    begin: f32,
    /// Ending time of the trajectory analysis (in ps).
    /// If not specified, the analysis ends at the end of the trajectory.
    #[builder(default = "f32::INFINITY")]
    #[serde(default = "default_end")]
    #[getset(get_copy = "pub")]
    end: f32,
    /// Only every Nth frame of the simulation trajectory will be analyzed.
    /// If not specified, each frame of the trajectory will be analyzed.
    #[builder(default = "1")]
    #[serde(default = "default_one")]
    #[getset(get_copy = "pub")]
    step: usize,
    /// Number of threads to use for superposing the frames.
    /// If not specified, the default value is 1.
    #[builder(default = "1")]
    #[serde(default = "default_one")]
    #[getset(get_copy = "pub")]
    n_threads: usize,
    /// Be silent. Print nothing to the standard output during the analysis.
    #[builder(setter(custom), default = "false")]
    #[serde(default = "default_false")]
    #[getset(get_copy = "pub", set = "pub")]
    silent: bool,
    /// Do not make backups. Overwrite all output files.
    #[builder(setter(custom), default = "false")]
    #[serde(default = "default_false")]
    #[getset(get_copy = "pub", set = "pub")]
    overwrite: bool,
}

fn default_fit_selection() -> String {
    DEFAULT_FIT_SELECTION.to_owned()
}

fn default_reference_selection() -> String {
    DEFAULT_REFERENCE_SELECTION.to_owned()
}

fn default_rmsf_selection() -> String {
    DEFAULT_RMSF_SELECTION.to_owned()
}

fn default_begin() -> f32 {
    0.0
}

fn default_end() -> f32 {
    f32::INFINITY
}

fn default_one() -> usize {
    1
}

fn default_false() -> bool {
    false
}

fn validate_step(step: usize) -> Result<(), ConfigError> {
    if step == 0 {
        Err(ConfigError::InvalidStep)
    } else {
        Ok(())
    }
}

fn validate_n_threads(n_threads: usize) -> Result<(), ConfigError> {
    if n_threads == 0 {
        Err(ConfigError::InvalidNThreads)
    } else {
        Ok(())
    }
}

fn validate_begin_end(begin: f32, end: f32) -> Result<(), ConfigError> {
    if begin > end {
        Err(ConfigError::InvalidBeginEnd)
    } else {
        Ok(())
    }
}

fn validate_query(name: &str, query: &str) -> Result<(), ConfigError> {
    if query.trim().is_empty() {
        Err(ConfigError::EmptyQuery(name.to_owned()))
    } else {
        Ok(())
    }
}

impl Analysis {
    pub fn new() -> AnalysisBuilder {
        AnalysisBuilder::default()
    }

    /// Read the parameters of the analysis from a yaml file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Analysis, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().into_owned();

        let string =
            read_to_string(&path).map_err(|_| ConfigError::CouldNotOpenConfig(path_str.clone()))?;
        let analysis: Analysis = serde_yaml::from_str(&string)
            .map_err(|e| ConfigError::CouldNotParseConfig(path_str, e))?;

        analysis.validate()?;
        Ok(analysis)
    }

    /// Check that the Analysis structure is valid. Used after deserialization from config yaml file.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_step(self.step)?;
        validate_n_threads(self.n_threads)?;
        validate_begin_end(self.begin, self.end)?;
        validate_query("fit_selection", &self.fit_selection)?;
        validate_query("reference_selection", &self.reference_selection)?;
        validate_query("rmsf_selection", &self.rmsf_selection)?;

        Ok(())
    }

    /// Alias for `output_yaml`.
    #[inline(always)]
    pub fn output(&self) -> &String {
        &self.output_yaml
    }

    /// Print basic information about the analysis for the user.
    pub(crate) fn info(&self) {
        log::info!(
            "Will superpose frames using '{}' onto the average structure of '{}'.",
            self.fit_selection,
            self.reference_selection
        );
        log::info!(
            "Will calculate root mean square fluctuations of '{}'.",
            self.rmsf_selection
        );

        if self.begin != 0.0 || self.end.is_finite() {
            log::info!(
                "Will analyze trajectory from {} ps to {} ps.",
                self.begin,
                self.end
            );
        }

        if self.step != 1 {
            log::info!("Will analyze every {}. frame.", self.step);
        }
    }
}

impl AnalysisBuilder {
    /// Be silent. Print nothing to the standard output during the analysis.
    #[inline(always)]
    pub fn silent(&mut self) -> &mut Self {
        self.silent = Some(true);
        self
    }

    /// Do not make backups. Overwrite all output files.
    #[inline(always)]
    pub fn overwrite(&mut self) -> &mut Self {
        self.overwrite = Some(true);
        self
    }

    /// Alias for `output_yaml`.
    #[inline(always)]
    pub fn output(&mut self, value: &str) -> &mut Self {
        self.output_yaml(value)
    }

    /// Validate the process of analysis building.
    fn validate(&self) -> Result<(), String> {
        if let Some(step) = self.step {
            validate_step(step).map_err(|e| e.to_string())?;
        }

        if let Some(n_threads) = self.n_threads {
            validate_n_threads(n_threads).map_err(|e| e.to_string())?;
        }

        // check that start is not larger than end
        if let (Some(begin), Some(end)) = (self.begin, self.end) {
            validate_begin_end(begin, end).map_err(|e| e.to_string())?;
        }

        for (name, query) in [
            ("fit_selection", &self.fit_selection),
            ("reference_selection", &self.reference_selection),
            ("rmsf_selection", &self.rmsf_selection),
        ] {
            if let Some(query) = query {
                validate_query(name, query).map_err(|e| e.to_string())?;
            }
        }

        Ok(())
    }
}
