use std::io::Cursor;

use binrw::BinWriterExt;

use crate::structs::{Marker, MARKER_LEN};

// byte that never starts a marker, used to fill audio payloads
const FILL: u8 = 0x11;

/// builds bars-like buffers, keeping every marker 4 byte aligned
#[derive(Default)]
pub struct BarsBuilder {
    buf: Vec<u8>,
}

impl BarsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(&mut self, marker: Marker) -> &mut Self {
        assert_eq!(0, self.buf.len() % MARKER_LEN, "unaligned marker");
        let end = self.buf.len() as u64;
        let mut cursor = Cursor::new(&mut self.buf);
        cursor.set_position(end);
        cursor.write_be(&marker).unwrap();
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + count, 0);
        self
    }

    pub fn align(&mut self) -> &mut Self {
        while self.buf.len() % MARKER_LEN != 0 {
            self.buf.push(0);
        }
        self
    }

    /// AMTA block: a bit of null header, then the name with at least one null after it
    pub fn amta(&mut self, name: &str) -> &mut Self {
        self.amta_raw(name.as_bytes())
    }

    pub fn amta_raw(&mut self, name: &[u8]) -> &mut Self {
        self.marker(Marker::Metadata)
            .zeros(4)
            .bytes(name)
            .zeros(1)
            .align()
    }

    /// BWAV tag followed by `payload` filler bytes, padded to the alignment
    pub fn bwav(&mut self, payload: usize) -> &mut Self {
        self.marker(Marker::Data);
        self.buf.resize(self.buf.len() + payload, FILL);
        self.align()
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}
