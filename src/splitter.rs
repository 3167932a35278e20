use log::warn;

use crate::{names::NameRegistry, structs::AudioSegment};

/// Cuts the buffer at every BWAV offset, the last segment runs to the end of the buffer.
///
/// Names are matched by position: the n-th accepted name belongs to the n-th BWAV tag.
/// Missing trailing names are filled with `extra_<n>`, surplus names stay unused.
pub fn split_segments(
    data_offsets: &[usize],
    registry: &mut NameRegistry,
    buf_len: usize,
) -> Vec<AudioSegment> {
    let recovered = registry.len();
    if recovered < data_offsets.len() {
        warn!(
            "BWAV names count ({recovered}) is not the same as BWAV count ({})!",
            data_offsets.len()
        );
        for extra in 1..=data_offsets.len() - recovered {
            registry.accept(format!("extra_{extra}").as_bytes());
        }
    }
    data_offsets
        .iter()
        .enumerate()
        .zip(registry.names())
        .map(|((idx, &start), name)| {
            let end = data_offsets.get(idx + 1).copied().unwrap_or(buf_len);
            AudioSegment {
                raw_name: name.clone(),
                start,
                length: end - start,
            }
        })
        .collect()
}
