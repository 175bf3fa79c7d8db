// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains structures and methods for presenting the results of the analysis.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::{analysis::fluctuation::RmsfResult, errors::WriteError, input::Analysis};

macro_rules! write_result {
    ($dst:expr, $($arg:tt)*) => {
        write!($dst, $($arg)*).map_err(WriteError::CouldNotWriteResults)?
    };
}

/// Fluctuations calculated for a single residue.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct ResidueResults {
    /// Number of the residue.
    #[serde(rename = "residue")]
    #[getset(get_copy = "pub")]
    residue_number: usize,
    /// Name of the residue.
    #[serde(rename = "name")]
    #[getset(get = "pub")]
    residue_name: String,
    /// Fluctuation of the residue (average of its atoms).
    #[serde(serialize_with = "round_serialize_f64")]
    #[getset(get_copy = "pub")]
    rmsf: f64,
    /// Fluctuations of the individual atoms of the residue.
    #[serde(serialize_with = "round_serialize_map")]
    #[getset(get = "pub")]
    atoms: IndexMap<String, f64>,
}

/// Results of the fluctuation analysis for all measured residues.
#[derive(Debug, Clone, Serialize, Getters, CopyGetters)]
pub struct RmsfResults {
    #[getset(get = "pub")]
    residues: Vec<ResidueResults>,
    /// Input structure file. Written into headers of the output files.
    #[serde(skip)]
    structure: String,
    /// Input trajectory file. Written into headers of the output files.
    #[serde(skip)]
    trajectory: String,
    /// Number of analyzed trajectory frames.
    #[serde(skip)]
    #[getset(get_copy = "pub")]
    n_frames: usize,
}

impl RmsfResults {
    /// Collect the fluctuations of atoms into residue results.
    pub fn new(result: &RmsfResult, n_frames: usize, structure: &str, trajectory: &str) -> Self {
        let residues = result
            .residue_groups()
            .into_iter()
            .zip(result.residues())
            .map(|(atoms, residue)| ResidueResults {
                residue_number: residue.residue_number(),
                residue_name: residue.residue_name().to_owned(),
                rmsf: residue.rmsf(),
                atoms: atoms
                    .iter()
                    .map(|atom| (atom.atom_name().to_owned(), atom.rmsf()))
                    .collect(),
            })
            .collect();

        Self {
            residues,
            structure: structure.to_owned(),
            trajectory: trajectory.to_owned(),
            n_frames,
        }
    }

    /// Write the results into all output files requested by the analysis.
    pub(crate) fn write_all(&self, analysis: &Analysis) -> Result<(), WriteError> {
        log::info!("Writing the fluctuations into a yaml file '{}'...", analysis.output_yaml());
        self.write_yaml(analysis.output_yaml(), analysis.overwrite())?;

        if let Some(tab) = analysis.output_tab() {
            log::info!("Writing the fluctuations into a table '{}'...", tab);
            self.write_tab(tab, analysis.overwrite())?;
        }

        if let Some(xvg) = analysis.output_xvg() {
            log::info!("Writing the fluctuations into an xvg file '{}'...", xvg);
            self.write_xvg(xvg, analysis.overwrite())?;
        }

        if let Some(csv) = analysis.output_csv() {
            log::info!("Writing the fluctuations into a csv file '{}'...", csv);
            self.write_csv(csv, analysis.overwrite())?;
        }

        Ok(())
    }

    /// Write the results of the analysis into a yaml file.
    pub fn write_yaml(&self, filename: impl AsRef<Path>, overwrite: bool) -> Result<(), WriteError> {
        let writer = self.prepare_file(&filename, "yaml", overwrite, true)?;

        serde_yaml::to_writer(writer, self)
            .map_err(|_| WriteError::CouldNotWriteYaml(Box::from(filename.as_ref())))?;

        Ok(())
    }

    /// Write the results of the analysis into a human readable table.
    pub fn write_tab(&self, filename: impl AsRef<Path>, overwrite: bool) -> Result<(), WriteError> {
        let mut writer = self.prepare_file(&filename, "tab", overwrite, true)?;

        write_result!(writer, "\n RESIDUE          ATOMS     RMSF   |\n");
        for residue in self.residues.iter() {
            let name = format!("{} {}", residue.residue_name, residue.residue_number);
            write_result!(
                writer,
                " {:<16} {: ^6}  {: ^8.4} |\n",
                name,
                residue.atoms.len(),
                residue.rmsf
            );
        }

        Ok(())
    }

    /// Write the fluctuations of the residues into an xvg file that can be directly plotted.
    pub fn write_xvg(&self, filename: impl AsRef<Path>, overwrite: bool) -> Result<(), WriteError> {
        let mut writer = self.prepare_file(&filename, "xvg", overwrite, true)?;

        write_result!(writer, "@    title \"Root mean square fluctuation\"\n");
        write_result!(
            writer,
            "@    xaxis label \"residue number\"\n@    yaxis label \"RMSF (nm)\"\n"
        );
        write_result!(writer, "@TYPE xy\n");

        for residue in self.residues.iter() {
            write_result!(writer, "{:<6} {: >8.4}\n", residue.residue_number, residue.rmsf);
        }

        Ok(())
    }

    /// Write the results of the analysis into a csv file.
    pub fn write_csv(&self, filename: impl AsRef<Path>, overwrite: bool) -> Result<(), WriteError> {
        let mut writer = self.prepare_file(&filename, "csv", overwrite, false)?;

        write_result!(writer, "residue,name,atoms,rmsf\n");
        for residue in self.residues.iter() {
            write_result!(
                writer,
                "{},{},{},{:.4}\n",
                residue.residue_number,
                residue.residue_name,
                residue.atoms.len(),
                residue.rmsf
            );
        }

        Ok(())
    }

    /// Back up a file, create a new one and write a header into it.
    fn prepare_file(
        &self,
        filename: &impl AsRef<Path>,
        file_type: &str,
        overwrite: bool,
        write_header: bool,
    ) -> Result<BufWriter<File>, WriteError> {
        try_backup_file(filename, overwrite, file_type)?;
        let mut writer = create_and_open_file(filename)?;
        if write_header {
            writeln!(
                writer,
                "# Root mean square fluctuations calculated with 'grmsf v{}' using structure file '{}' and trajectory file '{}' ({} frames).",
                crate::GRMSF_VERSION, self.structure, self.trajectory, self.n_frames
            )
            .map_err(WriteError::CouldNotWriteResults)?;
        }

        Ok(writer)
    }
}

/// Create and open file for buffered writing.
#[inline(always)]
fn create_and_open_file(filename: &impl AsRef<Path>) -> Result<BufWriter<File>, WriteError> {
    let file = File::create(filename.as_ref())
        .map_err(|_| WriteError::CouldNotCreateFile(Box::from(filename.as_ref())))?;

    Ok(BufWriter::new(file))
}

/// Back up an output file, if it is necessary and if it is requested.
fn try_backup_file(
    filename: &impl AsRef<Path>,
    overwrite: bool,
    file_type: &str,
) -> Result<(), WriteError> {
    if filename.as_ref().exists() {
        if !overwrite {
            log::warn!(
                "Output {} file '{}' already exists. Backing it up.",
                file_type,
                filename.as_ref().to_string_lossy()
            );
            backitup::backup(filename.as_ref())
                .map_err(|_| WriteError::CouldNotBackupFile(Box::from(filename.as_ref())))?;
        } else {
            log::warn!(
                "Output {} file '{}' already exists. It will be overwritten as requested.",
                file_type,
                filename.as_ref().to_string_lossy()
            );
        }
    }

    Ok(())
}

#[inline(always)]
fn round4(x: f64) -> f64 {
    (x * 10000.0).round() / 10000.0
}

#[inline(always)]
fn round_serialize_f64<S>(x: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_f64(round4(*x))
}

fn round_serialize_map<S>(map: &IndexMap<String, f64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_map(map.iter().map(|(k, v)| (k, round4(*v))))
}
