use std::collections::HashSet;

use log::{debug, warn};
use thiserror::Error;

use crate::{
    scanner::next_marker,
    structs::{Marker, MarkerOccurrence, RecoveredName, MARKER_LEN},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("AMTA tag at {metadata_offset:#x} is not followed by another tag")]
    NoFollowingMarker { metadata_offset: usize },
    #[error("no name between the AMTA tag at {metadata_offset:#x} and the tag at {next_offset:#x}")]
    NameNotFound {
        metadata_offset: usize,
        next_offset: usize,
    },
    #[error("name before the tag at {next_offset:#x} is not terminated inside the AMTA block at {metadata_offset:#x}")]
    Unterminated {
        metadata_offset: usize,
        next_offset: usize,
    },
}

enum ScanState {
    // skipping the null padding right before the next tag
    SeekingStart,
    // `end` is the last byte of the name, inclusive
    CollectingName { end: usize },
}

/// Recovers the name stored at the end of the AMTA block at `metadata_offset`.
///
/// The name is the last run of non-null bytes before the next tag (of any kind),
/// it has to be preceded by a null byte inside the block.
pub fn recover_name(buf: &[u8], metadata_offset: usize) -> Result<RecoveredName, NameError> {
    let body_start = metadata_offset.saturating_add(MARKER_LEN);
    let next =
        next_marker(buf, body_start).ok_or(NameError::NoFollowingMarker { metadata_offset })?;
    debug!(
        "next tag after AMTA at {metadata_offset:#x} is {} at {:#x}",
        next.kind, next.offset
    );
    let mut state = ScanState::SeekingStart;
    for (pos, &byte) in buf[body_start..next.offset].iter().enumerate().rev() {
        let pos = body_start + pos;
        state = match (state, byte) {
            (ScanState::SeekingStart, 0) => ScanState::SeekingStart,
            (ScanState::SeekingStart, _) => ScanState::CollectingName { end: pos },
            (ScanState::CollectingName { end }, 0) => {
                return Ok(RecoveredName {
                    raw: buf[pos + 1..=end].to_vec(),
                    metadata_offset,
                });
            }
            (collecting, _) => collecting,
        };
    }
    Err(match state {
        ScanState::SeekingStart => NameError::NameNotFound {
            metadata_offset,
            next_offset: next.offset,
        },
        ScanState::CollectingName { .. } => NameError::Unterminated {
            metadata_offset,
            next_offset: next.offset,
        },
    })
}

/// Accepted names in the order they were found, duplicates get a `-<n>` suffix.
///
/// Names are compared as the raw bytes from the container, they don't have to be UTF-8.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    names: Vec<Vec<u8>>,
    taken: HashSet<Vec<u8>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, raw: &[u8]) -> &[u8] {
        let name = if self.taken.contains(raw) {
            (1..)
                .map(|n| [raw, format!("-{n}").as_bytes()].concat())
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_default()
        } else {
            raw.to_vec()
        };
        self.taken.insert(name.clone());
        self.names.push(name);
        &self.names[self.names.len() - 1]
    }

    pub fn names(&self) -> &[Vec<u8>] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct RecoveredNames {
    pub registry: NameRegistry,
    pub errors: Vec<NameError>,
}

impl RecoveredNames {
    /// names actually found in the container, without the placeholders
    pub fn recovered_count(&self) -> usize {
        self.registry.len() - self.errors.len()
    }
}

/// one accepted name per AMTA tag, malformed ones get an `unnamed_<k>` placeholder
/// so the names stay aligned with the BWAV tags
pub fn recover_names(buf: &[u8], markers: &[MarkerOccurrence]) -> RecoveredNames {
    let mut registry = NameRegistry::new();
    let mut errors = Vec::new();
    for marker in markers.iter().filter(|m| m.kind == Marker::Metadata) {
        match recover_name(buf, marker.offset) {
            Ok(recovered) => {
                let name = registry.accept(&recovered.raw);
                debug!("name: {}", String::from_utf8_lossy(name));
            }
            Err(e) => {
                warn!("{e}");
                errors.push(e);
                let name = registry.accept(format!("unnamed_{}", errors.len()).as_bytes());
                debug!("name: {}", String::from_utf8_lossy(name));
            }
        }
    }
    RecoveredNames { registry, errors }
}
