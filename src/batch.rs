use std::{
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

use log::info;
use thiserror::Error;

use crate::{
    names::NameError,
    persist::{persist_segments, PersistOptions, PersistReport},
    ParsedBars,
};

pub const BARS_EXTENSION: &str = "bars";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open BARS file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct ContainerReport {
    pub container: PathBuf,
    pub output_dir: PathBuf,
    pub data_marker_count: usize,
    pub name_count: usize,
    pub name_errors: Vec<NameError>,
    pub persist: PersistReport,
}

/// all `.bars` files directly inside `input` if it's a directory, otherwise just `input`
pub fn collect_bars_files(input: &Path) -> io::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_owned()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == BARS_EXTENSION) {
            files.push(path);
        }
    }
    // read_dir order isn't deterministic
    files.sort();
    Ok(files)
}

/// Extracts one container into `<base_out>/<container file stem>/`.
///
/// Only failing to read the container or to create its output directory is an error,
/// malformed names and failed writes are part of the report.
pub fn extract_container(
    path: &Path,
    base_out: &Path,
    options: &PersistOptions,
) -> Result<ContainerReport, ExtractError> {
    let data = fs::read(path).map_err(|source| ExtractError::Read {
        path: path.to_owned(),
        source,
    })?;
    info!("processing BARS file {path:?} size: {}", data.len());
    let bars = ParsedBars::parse(data);
    let stem = path.file_stem().unwrap_or_else(|| OsStr::new(BARS_EXTENSION));
    let output_dir = base_out.join(stem);
    info!(
        "found all BWAV files. total count: {}. writing bwav files to {output_dir:?}",
        bars.data_marker_count
    );
    fs::create_dir_all(&output_dir).map_err(|source| ExtractError::CreateDir {
        path: output_dir.clone(),
        source,
    })?;
    let persist = persist_segments(&bars, &output_dir, options);
    Ok(ContainerReport {
        container: path.to_owned(),
        output_dir,
        data_marker_count: bars.data_marker_count,
        name_count: bars.name_count,
        name_errors: bars.name_errors,
        persist,
    })
}
