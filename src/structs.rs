use std::{borrow::Cow, fmt, io::Cursor, ops::Range};

use binrw::{binrw, BinRead};

// every tag in a bars container is 4 bytes long and 4 byte aligned
pub const MARKER_LEN: usize = 4;

#[binrw]
#[brw(big)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// start of the raw bytes of one audio file
    #[brw(magic = b"BWAV")]
    Data,
    /// metadata block, ends with the name of the audio file
    #[brw(magic = b"AMTA")]
    Metadata,
}

impl Marker {
    /// the marker starting at `offset`, if there is one
    pub fn at(buf: &[u8], offset: usize) -> Option<Self> {
        let tag = buf.get(offset..offset.checked_add(MARKER_LEN)?)?;
        // most of the buffer is audio data, don't let binrw fail on every one of them
        if ![Marker::Data, Marker::Metadata]
            .iter()
            .any(|m| tag == m.magic())
        {
            return None;
        }
        Marker::read_be(&mut Cursor::new(tag)).ok()
    }

    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            Marker::Data => b"BWAV",
            Marker::Metadata => b"AMTA",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.magic()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerOccurrence {
    pub kind: Marker,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredName {
    // name bytes as stored, without the terminating null
    pub raw: Vec<u8>,
    // offset of the AMTA tag this name belongs to
    pub metadata_offset: usize,
}

impl RecoveredName {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    pub raw_name: Vec<u8>,
    pub start: usize,
    pub length: usize,
}

impl AudioSegment {
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_name)
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}
