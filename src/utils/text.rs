use encoding::{DecoderTrap, EncodingRef};

use crate::err::{DeserializationError, DeserializationResult};

/// Decode legacy 8-bit text that started at `offset` in its buffer.
pub(crate) fn decode_text(
    bytes: &[u8],
    codec: EncodingRef,
    what: &'static str,
    offset: usize,
) -> DeserializationResult<String> {
    codec.decode(bytes, DecoderTrap::Strict).map_err(|message| {
        DeserializationError::invalid(
            what,
            offset as u64,
            format!("failed to decode text using {}: {}", codec.name(), message),
        )
    })
}
