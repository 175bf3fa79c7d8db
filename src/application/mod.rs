// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! This module contains the implementation of the `grmsf` binary.

use clap::Parser;
use colored::Colorize;
use grmsf::{errors::ApplicationError, Analysis, GRMSF_VERSION};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Calculate root mean square fluctuations of atoms and residues from a Gromacs trajectory."
)]
pub struct Args {
    #[arg(
        help = "Config yaml file",
        long_help = "Configuration yaml file specifying the analysis settings."
    )]
    pub config: String,

    #[arg(
        short = 's',
        long = "silent",
        help = "Print nothing to the standard output",
        default_value_t = false
    )]
    pub silent: bool,

    #[arg(
        long = "overwrite",
        help = "Overwrite output files without making backups",
        default_value_t = false
    )]
    pub overwrite: bool,
}

pub(crate) fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let mut analysis = match Analysis::from_file(&args.config) {
        Ok(x) => x,
        Err(e) => {
            colog::init();
            log::error!("{}", e);
            return Err(Box::from(ApplicationError::CouldNotReadConfig(
                args.config.clone(),
            )));
        }
    };

    if args.silent {
        analysis.set_silent(true);
    }

    if args.overwrite {
        analysis.set_overwrite(true);
    }

    if analysis.silent() {
        colog::basic_builder()
            .filter(None, log::LevelFilter::Error)
            .init();
    } else {
        colog::init();
        let header = format!(">>> GRMSF v{} <<<", GRMSF_VERSION).bold();
        println!("\n{}\n", header);
        log::info!("Read config file '{}'.", args.config);
    }

    let result = analysis.run();

    match &result {
        Ok(_) if !analysis.silent() => {
            let prefix = format!(
                "{}{}{}",
                "[".to_string().blue().bold(),
                "✔".to_string().bright_green().bold(),
                "]".to_string().blue().bold()
            );
            let message = "ANALYSIS COMPLETED".to_string().bright_green().bold();
            println!("{} {}", prefix, message);
        }
        Ok(_) => (),
        Err(e) => {
            log::error!("{}", e);

            if !analysis.silent() {
                let prefix = format!(
                    "{}{}{}",
                    "[".to_string().blue().bold(),
                    "✖".to_string().red().bold(),
                    "]".to_string().blue().bold()
                );
                let message = "ANALYSIS FAILED".to_string().red().bold();
                println!("{} {}", prefix, message);
            }
        }
    }

    result.map(|_| ())
}
