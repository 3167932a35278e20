use std::io::{self, Read};

use log::debug;

use crate::{
    names::{recover_names, NameError},
    scanner::{data_offsets, scan_markers},
    splitter::split_segments,
    structs::AudioSegment,
};

pub struct ParsedBars {
    data: Vec<u8>,
    pub segments: Vec<AudioSegment>,
    // number of BWAV tags found
    pub data_marker_count: usize,
    // names actually recovered from AMTA blocks, placeholders for malformed ones don't count
    pub name_count: usize,
    pub name_errors: Vec<NameError>,
}

impl ParsedBars {
    pub fn parse(data: Vec<u8>) -> Self {
        let markers = scan_markers(&data);
        let data_offsets = data_offsets(&markers);
        let mut recovered = recover_names(&data, &markers);
        let name_count = recovered.recovered_count();
        let segments = split_segments(&data_offsets, &mut recovered.registry, data.len());
        debug!(
            "{} BWAV tags, {} names, {} segments",
            data_offsets.len(),
            name_count,
            segments.len()
        );
        ParsedBars {
            data,
            segments,
            data_marker_count: data_offsets.len(),
            name_count,
            name_errors: recovered.errors,
        }
    }

    pub fn from_reader<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut data = Vec::new();
        r.read_to_end(&mut data)?;
        Ok(Self::parse(data))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn segment_data(&self, segment: &AudioSegment) -> Option<&[u8]> {
        self.data.get(segment.range())
    }

    pub fn segments_with_data(&self) -> impl Iterator<Item = (&AudioSegment, &[u8])> + '_ {
        self.segments
            .iter()
            .map(|segment| (segment, &self.data[segment.range()]))
    }

    pub fn names_match(&self) -> bool {
        self.name_count >= self.data_marker_count
    }
}
