use std::path::PathBuf;

use anyhow::Context;
use bars::{
    batch::{collect_bars_files, extract_container},
    persist::PersistOptions,
};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

const SPLITTER: &str = "----------------------------------------";

#[derive(Parser)]
#[command(version)]
/// Extracts the BWAV files from BARS files
pub struct Args {
    /// A BARS file or a folder containing BARS files
    input: PathBuf,
    /// The BWAV output folder, default BWAV-Output
    output: Option<PathBuf>,
    #[arg(long)]
    /// Don't overwrite files with the same names, pick a free name instead
    no_overwrite: bool,
    #[arg(short, long)]
    /// Print every found tag and written file
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let env = Env::new().default_filter_or(if args.verbose { "debug" } else { "info" });
    env_logger::init_from_env(env);
    let base_out = args.output.unwrap_or_else(|| PathBuf::from("BWAV-Output"));
    let options = PersistOptions {
        overwrite: !args.no_overwrite,
    };

    let bars_files = collect_bars_files(&args.input)
        .with_context(|| format!("could not list BARS files in {:?}", args.input))?;
    info!("{} BARS file(s) to be processed", bars_files.len());

    let mut total_bwav_count = 0;
    for (idx, bars_file) in bars_files.iter().enumerate() {
        info!("{SPLITTER}({}/{}){SPLITTER}", idx + 1, bars_files.len());
        match extract_container(bars_file, &base_out, &options) {
            Ok(report) => {
                if report.name_count < report.data_marker_count {
                    warn!(
                        "{:?}: only {} names for {} BWAV files",
                        report.container, report.name_count, report.data_marker_count
                    );
                }
                if !report.name_errors.is_empty() {
                    warn!(
                        "{:?}: {} malformed AMTA name(s)",
                        report.container,
                        report.name_errors.len()
                    );
                }
                for failure in &report.persist.failures {
                    error!("{:?}: {failure}: {}", report.container, failure.source);
                }
                total_bwav_count += report.persist.written.len();
            }
            // only this container is affected, keep going with the rest
            Err(e) => error!("{:?}", anyhow::Error::new(e)),
        }
    }

    info!("{SPLITTER}{SPLITTER}");
    info!(
        "Done! Processed {} BARS files and generated {total_bwav_count} BWAV files in total.",
        bars_files.len()
    );
    Ok(())
}
