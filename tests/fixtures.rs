#![allow(dead_code)]
use std::sync::Once;

use amberdata::hunk::{HUNK_CODE, HUNK_DATA, HUNK_END, HUNK_HEADER, HUNK_RELOC32, HUNK_SYMBOL};
use amberdata::relocation::TARGET_HUNK;
use amberdata::tables::{ANCHOR_MARKER, ANCHOR_SKIP, CURSOR_SIZE};

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Builds the back-to-back table region of a data hunk.
#[derive(Default)]
pub struct TableBytes {
    pub bytes: Vec<u8>,
}

impl TableBytes {
    pub fn new() -> Self {
        TableBytes::default()
    }

    /// `count` glyphs of the given height; glyph `i` has advance `i` and every row set to `i`.
    pub fn glyphs(mut self, count: u16, height: u8) -> Self {
        push_u16(&mut self.bytes, count);
        self.bytes.push(height);
        for i in 0..count {
            self.bytes.push(i as u8);
            for _ in 0..height {
                push_u16(&mut self.bytes, i);
            }
        }
        self
    }

    /// Cursors whose first row is fully set in plane 0.
    pub fn cursors(mut self, hotspots: &[(u16, u16)]) -> Self {
        push_u16(&mut self.bytes, hotspots.len() as u16);
        for &(x, y) in hotspots {
            push_u16(&mut self.bytes, x);
            push_u16(&mut self.bytes, y);
            for row in 0..CURSOR_SIZE {
                push_u16(&mut self.bytes, if row == 0 { 0xFFFF } else { 0 });
                push_u16(&mut self.bytes, 0);
            }
        }
        self
    }

    pub fn names(mut self, names: &[&str]) -> Self {
        push_u16(&mut self.bytes, names.len() as u16);
        for name in names {
            self.bytes.extend_from_slice(name.as_bytes());
            self.bytes.push(0);
        }
        self
    }

    pub fn name_pairs(self, pairs: &[(&str, &str)]) -> Self {
        let long: Vec<&str> = pairs.iter().map(|(l, _)| *l).collect();
        let mut this = self.names(&long);
        for (_, short) in pairs {
            this.bytes.extend_from_slice(short.as_bytes());
            this.bytes.push(0);
        }
        this
    }

    pub fn texts(mut self, texts: &[&str]) -> Self {
        push_u16(&mut self.bytes, texts.len() as u16);
        for text in texts {
            push_u16(&mut self.bytes, text.len() as u16);
            self.bytes.extend_from_slice(text.as_bytes());
        }
        self
    }

    /// The marker plus the skipped gap, filled with junk that must never be decoded.
    pub fn anchor(mut self) -> Self {
        self.bytes.extend_from_slice(ANCHOR_MARKER);
        self.bytes.extend(std::iter::repeat_n(0xEE, ANCHOR_SKIP));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Fifteen relocation entries that resolve to the given glyph offset.
///
/// Everything is put into the last entry, so the codepage sits at 0 and the version text at 4.
pub fn relocation_entries_for(glyph_offset: u32) -> Vec<u32> {
    assert!(glyph_offset % 4 == 0 && glyph_offset >= 268);
    let mut entries = vec![0; 14];
    // glyph = e14 + 262, then rounded up to the next multiple of 4 (always moving).
    entries.push(glyph_offset - 4 - 262 + 1);
    entries
}

/// A minimal executable: one code hunk carrying the relocations, then the data hunk.
pub fn hunk_image(data_hunk: &[u8], reloc_entries: &[u32]) -> Vec<u8> {
    let mut data = data_hunk.to_vec();
    data.resize(data.len().next_multiple_of(4), 0);

    let mut out = Vec::new();
    push_u32(&mut out, HUNK_HEADER);
    push_u32(&mut out, 0); // no resident libraries
    push_u32(&mut out, 2);
    push_u32(&mut out, 0);
    push_u32(&mut out, 1);
    push_u32(&mut out, 1);
    push_u32(&mut out, (data.len() / 4) as u32);

    push_u32(&mut out, HUNK_CODE);
    push_u32(&mut out, 1);
    out.extend_from_slice(&[0x4E, 0x75, 0x4E, 0x71]); // rts; nop

    push_u32(&mut out, HUNK_RELOC32);
    push_u32(&mut out, reloc_entries.len() as u32);
    push_u32(&mut out, TARGET_HUNK);
    for &entry in reloc_entries {
        push_u32(&mut out, entry);
    }
    push_u32(&mut out, 0);

    push_u32(&mut out, HUNK_SYMBOL);
    push_u32(&mut out, 1);
    out.extend_from_slice(b"_go\0");
    push_u32(&mut out, 0);
    push_u32(&mut out, 0);
    push_u32(&mut out, HUNK_END);

    push_u32(&mut out, HUNK_DATA);
    push_u32(&mut out, (data.len() / 4) as u32);
    out.extend_from_slice(&data);
    push_u32(&mut out, HUNK_END);

    out
}

pub fn event_record(tag: u8, payload: [u8; 9], next: u16) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&payload);
    push_u16(&mut out, next);
    out
}

pub fn event_stream(entries: &[u16], records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, entries.len() as u16);
    for &entry in entries {
        push_u16(&mut out, entry);
    }
    push_u16(&mut out, records.len() as u16);
    for record in records {
        out.extend_from_slice(record);
    }
    out
}
