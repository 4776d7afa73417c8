//! The text and graphics tables stored in the executable's main data hunk.
//!
//! The tables are stored back to back without a directory, so they have to be decoded in
//! exactly this order: each decoder starts where the previous one stopped. Halfway through,
//! the sequence re-synchronizes on a literal marker string, because the region following the
//! file list is not reachable from the relocation-derived offsets.

mod glyphs;
mod names;

pub use glyphs::{CURSOR_SIZE, CursorImage, Glyph, Glyphs, MAX_GLYPH_HEIGHT};
pub use names::NamePair;

use log::trace;
use serde::Serialize;

use crate::DecoderSettings;
use crate::err::{AmberError, DeserializationError, DeserializationResult, Result};
use crate::utils::ByteCursor;

/// The second half of the tables starts this many bytes past the end of the marker.
pub const ANCHOR_MARKER: &[u8] = b"Amberfiles/";
pub const ANCHOR_SKIP: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSet {
    pub glyphs: Glyphs,
    pub cursors: Vec<CursorImage>,
    pub file_names: Vec<String>,
    pub world_names: Vec<String>,
    pub messages: Vec<String>,
    pub automap_names: Vec<String>,
    pub option_names: Vec<String>,
    pub song_names: Vec<String>,
    pub spell_type_names: Vec<String>,
    pub spell_names: Vec<String>,
    pub language_names: Vec<String>,
    pub class_names: Vec<String>,
    pub race_names: Vec<String>,
    pub ability_names: Vec<NamePair>,
    pub attribute_names: Vec<NamePair>,
    pub item_type_names: Vec<String>,
    pub ailment_names: Vec<String>,
    pub ui_texts: Vec<String>,
}

pub(crate) fn read_count(
    cursor: &mut ByteCursor,
    what: &'static str,
    settings: &DecoderSettings,
) -> DeserializationResult<usize> {
    let offset = cursor.position();
    let count = cursor.u16_named(what)?;
    if count > settings.get_max_table_entries() {
        return Err(DeserializationError::invalid(
            what,
            offset,
            format!(
                "implausible entry count {count} (limit {})",
                settings.get_max_table_entries()
            ),
        ));
    }
    Ok(usize::from(count))
}

/// Runs one table decoder, attaching the table name to any failure.
fn step<'a, T>(
    cursor: &mut ByteCursor<'a>,
    table: &'static str,
    settings: &DecoderSettings,
    decode: impl FnOnce(&mut ByteCursor<'a>, &DecoderSettings) -> DeserializationResult<T>,
) -> Result<T> {
    let start = cursor.pos();
    let value = decode(cursor, settings)
        .map_err(|source| AmberError::FailedToDecodeTable { table, source })?;
    trace!("Decoded `{}` at {}..{}", table, start, cursor.pos());
    Ok(value)
}

fn name_list(
    what: &'static str,
) -> impl FnOnce(&mut ByteCursor<'_>, &DecoderSettings) -> DeserializationResult<Vec<String>> {
    move |cursor, settings| names::read_name_list(cursor, what, settings)
}

fn text_list(
    what: &'static str,
) -> impl FnOnce(&mut ByteCursor<'_>, &DecoderSettings) -> DeserializationResult<Vec<String>> {
    move |cursor, settings| names::read_text_list(cursor, what, settings)
}

fn name_pair_list(
    what: &'static str,
) -> impl FnOnce(&mut ByteCursor<'_>, &DecoderSettings) -> DeserializationResult<Vec<NamePair>> {
    move |cursor, settings| names::read_name_pairs(cursor, what, settings)
}

fn seek_past_anchor(cursor: &mut ByteCursor, _: &DecoderSettings) -> DeserializationResult<()> {
    let found = cursor
        .find(ANCHOR_MARKER)
        .ok_or(DeserializationError::MarkerNotFound {
            offset: cursor.position(),
        })?;
    cursor.set_pos(found + ANCHOR_MARKER.len() + ANCHOR_SKIP, "table anchor")
}

/// Decode every table, starting at the glyph tables the cursor points to.
///
/// Fails as a whole: if any table is malformed, nothing is returned.
pub fn decode_tables(cursor: &mut ByteCursor, settings: &DecoderSettings) -> Result<TableSet> {
    let glyphs = step(cursor, "glyphs", settings, glyphs::read_glyphs)?;
    let cursors = step(cursor, "cursors", settings, glyphs::read_cursors)?;
    let file_names = step(cursor, "file names", settings, name_list("file names"))?;

    step(cursor, "anchor", settings, seek_past_anchor)?;

    Ok(TableSet {
        glyphs,
        cursors,
        file_names,
        world_names: step(cursor, "world names", settings, name_list("world names"))?,
        messages: step(cursor, "messages", settings, text_list("messages"))?,
        automap_names: step(cursor, "automap names", settings, name_list("automap names"))?,
        option_names: step(cursor, "option names", settings, name_list("option names"))?,
        song_names: step(cursor, "song names", settings, name_list("song names"))?,
        spell_type_names: step(cursor, "spell type names", settings, name_list("spell type names"))?,
        spell_names: step(cursor, "spell names", settings, name_list("spell names"))?,
        language_names: step(cursor, "language names", settings, name_list("language names"))?,
        class_names: step(cursor, "class names", settings, name_list("class names"))?,
        race_names: step(cursor, "race names", settings, name_list("race names"))?,
        ability_names: step(cursor, "ability names", settings, name_pair_list("ability names"))?,
        attribute_names: step(
            cursor,
            "attribute names",
            settings,
            name_pair_list("attribute names"),
        )?,
        item_type_names: step(cursor, "item type names", settings, name_list("item type names"))?,
        ailment_names: step(cursor, "ailment names", settings, name_list("ailment names"))?,
        ui_texts: step(cursor, "ui texts", settings, text_list("ui texts"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_names(names: &[&str]) -> Vec<u8> {
        let mut out = (names.len() as u16).to_be_bytes().to_vec();
        for name in names {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }

    #[test]
    fn test_anchor_repositions_past_marker() {
        let mut data = vec![0xAA; 8];
        data.extend_from_slice(ANCHOR_MARKER);
        data.extend(std::iter::repeat_n(0xBB, ANCHOR_SKIP));
        data.extend(encode_names(&["Lyramion"]));

        let mut cursor = ByteCursor::new(&data);
        seek_past_anchor(&mut cursor, &DecoderSettings::default()).unwrap();
        assert_eq!(cursor.pos(), 8 + ANCHOR_MARKER.len() + ANCHOR_SKIP);

        let worlds = name_list("world names")(&mut cursor, &DecoderSettings::default()).unwrap();
        assert_eq!(worlds, vec!["Lyramion".to_string()]);
    }

    #[test]
    fn test_missing_anchor_names_the_step() {
        let mut data = vec![0x00, 0x00, 0x01]; // no glyphs, height 1
        data.extend([0x00, 0x00]); // no cursors
        data.extend(encode_names(&["data.amb"]));

        let mut cursor = ByteCursor::new(&data);
        let err = decode_tables(&mut cursor, &DecoderSettings::default()).unwrap_err();
        match err {
            AmberError::FailedToDecodeTable {
                table,
                source: DeserializationError::MarkerNotFound { offset },
            } => {
                assert_eq!(table, "anchor");
                assert_eq!(offset, data.len() as u64);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
