use serde::Serialize;

use crate::DecoderSettings;
use crate::err::{DeserializationError, DeserializationResult};
use crate::tables::read_count;
use crate::utils::{ByteCursor, decode_text};

/// A name with its abbreviation, e.g. "Strength" / "STR".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamePair {
    pub name: String,
    pub short_name: String,
}

fn read_name(
    cursor: &mut ByteCursor,
    what: &'static str,
    settings: &DecoderSettings,
) -> DeserializationResult<String> {
    let start = cursor.pos();
    let raw = cursor.null_terminated_bytes(what)?;
    decode_text(raw, settings.get_text_codec(), what, start)
}

/// `u16 count` followed by `count` NUL-terminated strings.
pub(crate) fn read_name_list(
    cursor: &mut ByteCursor,
    what: &'static str,
    settings: &DecoderSettings,
) -> DeserializationResult<Vec<String>> {
    let count = read_count(cursor, what, settings)?;
    (0..count).map(|_| read_name(cursor, what, settings)).collect()
}

/// A name list directly followed by as many short names, which carry no count of their own.
pub(crate) fn read_name_pairs(
    cursor: &mut ByteCursor,
    what: &'static str,
    settings: &DecoderSettings,
) -> DeserializationResult<Vec<NamePair>> {
    let names = read_name_list(cursor, what, settings)?;
    let mut pairs = Vec::with_capacity(names.len());
    for name in names {
        let short_name = read_name(cursor, "short name", settings)?;
        pairs.push(NamePair { name, short_name });
    }
    Ok(pairs)
}

/// `u16 count` followed by `count` entries of `u16 length` + `length` bytes.
pub(crate) fn read_text_list(
    cursor: &mut ByteCursor,
    what: &'static str,
    settings: &DecoderSettings,
) -> DeserializationResult<Vec<String>> {
    let count = read_count(cursor, what, settings)?;
    let mut texts = Vec::with_capacity(count);

    for _ in 0..count {
        let length_offset = cursor.position();
        let length = cursor.u16_named("text length")?;
        if length > settings.get_max_text_length() {
            return Err(DeserializationError::invalid(
                "text length",
                length_offset,
                format!(
                    "implausible text length {length} (limit {})",
                    settings.get_max_text_length()
                ),
            ));
        }
        let start = cursor.pos();
        let raw = cursor.take_bytes(usize::from(length), what)?;
        texts.push(decode_text(raw, settings.get_text_codec(), what, start)?);
    }

    Ok(texts)
}
