use log::debug;

use crate::structs::{Marker, MarkerOccurrence, MARKER_LEN};

/// all aligned BWAV and AMTA tags in the buffer, in the order they appear
pub fn scan_markers(buf: &[u8]) -> Vec<MarkerOccurrence> {
    (0..buf.len())
        .step_by(MARKER_LEN)
        .filter_map(|offset| Marker::at(buf, offset).map(|kind| MarkerOccurrence { kind, offset }))
        .inspect(|m| debug!("found {} at offset {:#x}", m.kind, m.offset))
        .collect()
}

/// the first tag of any kind at or after `from`, `from` has to be aligned
pub fn next_marker(buf: &[u8], from: usize) -> Option<MarkerOccurrence> {
    (from..buf.len())
        .step_by(MARKER_LEN)
        .find_map(|offset| Marker::at(buf, offset).map(|kind| MarkerOccurrence { kind, offset }))
}

pub fn data_offsets(markers: &[MarkerOccurrence]) -> Vec<usize> {
    markers
        .iter()
        .filter(|m| m.kind == Marker::Data)
        .map(|m| m.offset)
        .collect()
}
