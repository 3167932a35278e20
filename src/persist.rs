use std::{
    ffi::{OsStr, OsString},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Component, Path, PathBuf},
};

use log::{debug, error, warn};
use thiserror::Error;

use crate::ParsedBars;

pub const BWAV_EXTENSION: &str = "bwav";

#[derive(Debug, Clone)]
pub struct PersistOptions {
    /// replace files that already exist instead of picking a free `<name>-<n>.bwav`
    pub overwrite: bool,
}

impl Default for PersistOptions {
    fn default() -> Self {
        PersistOptions { overwrite: true }
    }
}

#[derive(Error, Debug)]
#[error("write bwav failed, path: {path:?} count: {index} offset: {offset:#x}")]
pub struct PersistFailure {
    pub index: usize,
    pub offset: usize,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Default)]
pub struct PersistReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PersistFailure>,
}

#[cfg(unix)]
fn bytes_to_os_string(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
fn bytes_to_os_string(bytes: Vec<u8>) -> OsString {
    String::from_utf8_lossy(&bytes).into_owned().into()
}

fn file_name(name: &[u8], suffix: Option<usize>) -> OsString {
    let mut bytes = name.to_vec();
    if let Some(n) = suffix {
        bytes.extend_from_slice(format!("-{n}").as_bytes());
    }
    bytes.push(b'.');
    bytes.extend_from_slice(BWAV_EXTENSION.as_bytes());
    bytes_to_os_string(bytes)
}

// exactly one normal component, anything else could point outside of the output directory
fn is_plain_file_name(file_name: &OsStr) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `<dir>/<name>.bwav`, or the first `<dir>/<name>-<n>.bwav` that doesn't exist yet
/// if overwriting is disabled.
///
/// `None` if the name isn't a plain file name (contains separators, `..`, is absolute, ...).
pub fn output_path(dir: &Path, name: &[u8], overwrite: bool) -> Option<PathBuf> {
    let base = file_name(name, None);
    if !is_plain_file_name(&base) {
        return None;
    }
    let path = dir.join(base);
    if overwrite || !path.exists() {
        return Some(path);
    }
    (1..)
        .map(|n| dir.join(file_name(name, Some(n))))
        .find(|candidate| !candidate.exists())
}

fn illegal_name_path(dir: &Path, counter: usize, overwrite: bool) -> PathBuf {
    let name = format!("illegal_name_{counter}");
    output_path(dir, name.as_bytes(), overwrite)
        .unwrap_or_else(|| dir.join(format!("{name}.{BWAV_EXTENSION}")))
}

fn write_bwav(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    f.write_all(data)?;
    f.flush()
}

/// Writes every segment to `dir`. A segment that can't be written (its name isn't a plain
/// file name, or the filesystem rejects it) is retried once as `illegal_name_<k>.bwav`, if that
/// fails too it ends up in the failures and the remaining segments are still written.
pub fn persist_segments(bars: &ParsedBars, dir: &Path, options: &PersistOptions) -> PersistReport {
    let mut report = PersistReport::default();
    let mut illegal_counter = 0;
    let total = bars.segments.len();
    for (index, (segment, data)) in bars.segments_with_data().enumerate() {
        let first_try = match output_path(dir, &segment.raw_name, options.overwrite) {
            Some(path) => {
                debug!(
                    "({}/{total}) writing {path:?} from offset {:#x}",
                    index + 1,
                    segment.start
                );
                match write_bwav(&path, data) {
                    Ok(()) => Ok(path),
                    Err(e) => Err(format!("could not write {path:?} ({e})")),
                }
            }
            None => Err(format!("{:?} is not a valid file name", segment.name())),
        };
        match first_try {
            Ok(path) => report.written.push(path),
            Err(reason) => {
                illegal_counter += 1;
                let retry = illegal_name_path(dir, illegal_counter, options.overwrite);
                warn!("{reason}, trying {retry:?}");
                match write_bwav(&retry, data) {
                    Ok(()) => report.written.push(retry),
                    Err(source) => {
                        let failure = PersistFailure {
                            index,
                            offset: segment.start,
                            path: retry,
                            source,
                        };
                        error!("{failure}");
                        report.failures.push(failure);
                    }
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod test {
    use std::fs;

    use crate::{test_util::BarsBuilder, ParsedBars};

    use super::{output_path, persist_segments, PersistOptions};

    fn two_songs() -> ParsedBars {
        ParsedBars::parse(
            BarsBuilder::new()
                .amta("clap")
                .amta("snare")
                .bwav(13)
                .bwav(40)
                .build(),
        )
    }

    #[test]
    pub fn writes_every_segment() {
        let dir = tempfile::tempdir().unwrap();
        let bars = two_songs();
        let report = persist_segments(&bars, dir.path(), &PersistOptions::default());
        assert!(report.failures.is_empty());
        assert_eq!(
            vec![dir.path().join("clap.bwav"), dir.path().join("snare.bwav")],
            report.written
        );
        for (segment, path) in bars.segments.iter().zip(&report.written) {
            assert_eq!(bars.segment_data(segment).unwrap(), fs::read(path).unwrap());
        }
    }

    #[test]
    pub fn output_path_picks_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = |name: &str| Some(dir.path().join(name));
        assert_eq!(path("clap.bwav"), output_path(dir.path(), b"clap", false));
        fs::write(dir.path().join("clap.bwav"), b"old").unwrap();
        assert_eq!(path("clap-1.bwav"), output_path(dir.path(), b"clap", false));
        assert_eq!(path("clap.bwav"), output_path(dir.path(), b"clap", true));
        fs::write(dir.path().join("clap-1.bwav"), b"old").unwrap();
        assert_eq!(path("clap-2.bwav"), output_path(dir.path(), b"clap", false));
    }

    #[test]
    pub fn output_path_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(None, output_path(dir.path(), b"/tmp/escaped", true));
        assert_eq!(None, output_path(dir.path(), b"../x", true));
        assert_eq!(None, output_path(dir.path(), b"a/b", false));
        // only looks like a parent dir, "...bwav" is a normal file name
        assert_eq!(
            Some(dir.path().join("...bwav")),
            output_path(dir.path(), b"..", true)
        );
    }

    #[test]
    pub fn no_overwrite_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clap.bwav"), b"old").unwrap();
        let report = persist_segments(&two_songs(), dir.path(), &PersistOptions { overwrite: false });
        assert_eq!(dir.path().join("clap-1.bwav"), report.written[0]);
        assert_eq!(b"old".as_slice(), fs::read(dir.path().join("clap.bwav")).unwrap());
    }

    #[test]
    pub fn overwrite_replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clap.bwav"), b"old").unwrap();
        let bars = two_songs();
        let report = persist_segments(&bars, dir.path(), &PersistOptions::default());
        assert_eq!(dir.path().join("clap.bwav"), report.written[0]);
        assert_eq!(
            bars.segment_data(&bars.segments[0]).unwrap(),
            fs::read(dir.path().join("clap.bwav")).unwrap()
        );
    }

    #[test]
    pub fn illegal_names_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let bars = ParsedBars::parse(
            BarsBuilder::new()
                .amta("no/such/dir")
                .amta("fine")
                .amta("also/missing")
                .bwav(8)
                .bwav(8)
                .bwav(8)
                .build(),
        );
        let report = persist_segments(&bars, dir.path(), &PersistOptions::default());
        assert!(report.failures.is_empty());
        assert_eq!(
            vec![
                dir.path().join("illegal_name_1.bwav"),
                dir.path().join("fine.bwav"),
                dir.path().join("illegal_name_2.bwav"),
            ],
            report.written
        );
    }

    #[test]
    pub fn failures_do_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let report = persist_segments(&two_songs(), &missing, &PersistOptions::default());
        assert!(report.written.is_empty());
        assert_eq!(2, report.failures.len());
        assert_eq!(missing.join("illegal_name_1.bwav"), report.failures[0].path);
        assert_eq!(1, report.failures[1].index);
        assert_eq!(missing.join("illegal_name_2.bwav"), report.failures[1].path);
    }

    #[test]
    pub fn names_never_escape_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let absolute = elsewhere.path().join("escaped");
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let bars = ParsedBars::parse(
            BarsBuilder::new()
                .amta(absolute.to_str().unwrap())
                .amta("../x")
                .amta("ok")
                .bwav(8)
                .bwav(8)
                .bwav(8)
                .build(),
        );
        let report = persist_segments(&bars, &out, &PersistOptions::default());
        assert!(report.failures.is_empty());
        assert_eq!(
            vec![
                out.join("illegal_name_1.bwav"),
                out.join("illegal_name_2.bwav"),
                out.join("ok.bwav"),
            ],
            report.written
        );
        assert!(report.written.iter().all(|p| p.starts_with(&out)));
        assert!(!elsewhere.path().join("escaped.bwav").exists());
        assert!(!dir.path().join("x.bwav").exists());
    }

    #[cfg(unix)]
    #[test]
    pub fn non_utf8_names_stay_apart() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = tempfile::tempdir().unwrap();
        let bars = ParsedBars::parse(
            BarsBuilder::new()
                .amta_raw(b"a\xff")
                .amta_raw(b"a\xfe")
                .bwav(8)
                .bwav(12)
                .build(),
        );
        let report = persist_segments(&bars, dir.path(), &PersistOptions { overwrite: false });
        assert!(report.failures.is_empty());
        assert_eq!(
            vec![
                dir.path().join(OsStr::from_bytes(b"a\xff.bwav")),
                dir.path().join(OsStr::from_bytes(b"a\xfe.bwav")),
            ],
            report.written
        );
    }
}
