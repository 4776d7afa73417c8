#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::fmt::{self, Debug};

use encoding::EncodingRef;

pub use err::{AmberError, DeserializationError, DeserializationResult, Result};
pub use event::{
    ChainWalk, EventChain, EventPayload, EventRecord, EventType, decode_event_chain,
    decode_event_chain_from, decode_event_chains,
};
pub use executable::ExecutableData;
pub use hunk::{Hunk, HunkHeader, HunkKind, Image, MemoryFlags, RelocationTable};
pub use relocation::{ResolvedOffsets, resolve_offsets};
pub use tables::{TableSet, decode_tables};
pub use utils::ByteCursor;

pub mod err;
pub mod event;
pub mod executable;
pub mod hunk;
pub mod relocation;
pub mod tables;
mod utils;

/// Knobs shared by the table and event decoders.
#[derive(Clone)]
pub struct DecoderSettings {
    num_threads: usize,
    text_codec: EncodingRef,
    max_table_entries: u16,
    max_text_length: u16,
}

impl Debug for DecoderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderSettings")
            .field("num_threads", &self.num_threads)
            .field("text_codec", &self.text_codec.name())
            .field("max_table_entries", &self.max_table_entries)
            .field("max_text_length", &self.max_text_length)
            .finish()
    }
}

impl PartialEq for DecoderSettings {
    fn eq(&self, other: &Self) -> bool {
        self.num_threads == other.num_threads
            && self.text_codec.name() == other.text_codec.name()
            && self.max_table_entries == other.max_table_entries
            && self.max_text_length == other.max_text_length
    }
}

impl Default for DecoderSettings {
    fn default() -> Self {
        DecoderSettings {
            num_threads: 0,
            text_codec: encoding::all::ISO_8859_1,
            max_table_entries: 4096,
            max_text_length: 4096,
        }
    }
}

impl DecoderSettings {
    pub fn new() -> Self {
        DecoderSettings::default()
    }

    /// Sets the number of worker threads used by `decode_event_chains`.
    /// `0` lets rayon pick one thread per core.
    ///
    /// Has no effect unless the `multithreading` feature is enabled.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Codec for the 8-bit strings stored in the tables.
    pub fn text_codec(mut self, text_codec: EncodingRef) -> Self {
        self.text_codec = text_codec;
        self
    }

    /// Upper bound for any `u16` entry count read from a table. Counts above it are
    /// treated as corruption instead of being allocated.
    pub fn max_table_entries(mut self, max_table_entries: u16) -> Self {
        self.max_table_entries = max_table_entries;
        self
    }

    pub fn max_text_length(mut self, max_text_length: u16) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn get_text_codec(&self) -> EncodingRef {
        self.text_codec
    }

    pub fn get_max_table_entries(&self) -> u16 {
        self.max_table_entries
    }

    pub fn get_max_text_length(&self) -> u16 {
        self.max_text_length
    }
}

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;
    use std::sync::Once;

    static LOGGER_INIT: Once = Once::new();

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_builder() {
        let settings = DecoderSettings::new()
            .num_threads(3)
            .text_codec(encoding::all::ASCII)
            .max_table_entries(10)
            .max_text_length(20);

        assert_eq!(settings.get_num_threads(), 3);
        assert_eq!(settings.get_text_codec().name(), "ascii");
        assert_eq!(settings.get_max_table_entries(), 10);
        assert_eq!(settings.get_max_text_length(), 20);
        assert_ne!(settings, DecoderSettings::default());
        assert_eq!(settings.clone(), settings);
    }

    #[test]
    fn test_settings_debug_shows_codec_name() {
        let rendered = format!("{:?}", DecoderSettings::default());
        assert!(rendered.contains("iso-8859-1"), "{rendered}");
    }
}
