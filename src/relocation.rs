//! Recovering table offsets from relocation data.
//!
//! The executable has no symbol table for its data hunk, but the last `RELOC32` block lists
//! (among others) exactly 15 pointer displacements into hunk 5. Their running sums land on
//! the codepage table, the version text and the glyph tables. These are constants of one
//! specific executable build; a different build needs its own set.

use log::debug;
use serde::Serialize;

use crate::err::{AmberError, Result};
use crate::hunk::Image;

/// Relocation entries of this hunk index are summed.
pub const TARGET_HUNK: u32 = 5;
pub const EXPECTED_ENTRY_COUNT: usize = 15;

const CODEPAGE_ENTRIES: usize = 12;
const TEXT_BIAS: u64 = 4;
const GLYPH_BIAS: u64 = 262;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedOffsets {
    pub codepage_offset: usize,
    pub text_offset: usize,
    pub glyph_offset: usize,
}

/// Derive the table offsets inside the main data hunk from the image's relocation data.
pub fn resolve_offsets(image: &Image) -> Result<ResolvedOffsets> {
    let table = image
        .last_relocation_table()
        .ok_or(AmberError::NoRelocationTable)?;

    let entries = table.get(&TARGET_HUNK).map(Vec::as_slice);
    let entries = match entries {
        Some(entries) if entries.len() == EXPECTED_ENTRY_COUNT => entries,
        other => {
            return Err(AmberError::UnexpectedEntryCount {
                hunk: TARGET_HUNK,
                found: other.map(<[u32]>::len),
            });
        }
    };

    let offsets = offsets_from_entries(entries)?;
    debug!(
        "Resolved offsets: codepage={} text={} glyphs={}",
        offsets.codepage_offset, offsets.text_offset, offsets.glyph_offset
    );
    Ok(offsets)
}

fn offsets_from_entries(entries: &[u32]) -> Result<ResolvedOffsets> {
    let sum = |range: &[u32]| range.iter().map(|&e| u64::from(e)).sum::<u64>();

    let codepage = sum(&entries[..CODEPAGE_ENTRIES]);
    let text = codepage + sum(&entries[CODEPAGE_ENTRIES..14]) + TEXT_BIAS;
    let mut glyph = codepage + sum(&entries[CODEPAGE_ENTRIES..15]) + GLYPH_BIAS;
    // Always adds, even when `glyph` is already aligned.
    glyph += 4 - glyph % 4;

    Ok(ResolvedOffsets {
        codepage_offset: to_usize(codepage)?,
        text_offset: to_usize(text)?,
        glyph_offset: to_usize(glyph)?,
    })
}

fn to_usize(offset: u64) -> Result<usize> {
    usize::try_from(offset).map_err(|_| AmberError::OffsetOverflow { offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunk::{Hunk, HunkHeader, RelocationTable};

    fn image_with(tables: Vec<RelocationTable>) -> Image {
        let mut hunks = vec![Hunk::Data(vec![0; 16])];
        for table in tables {
            hunks.push(Hunk::Reloc32(table));
            hunks.push(Hunk::End);
        }
        Image {
            header: HunkHeader {
                resident_libraries: vec![],
                table_size: 1,
                first_hunk: 0,
                last_hunk: 0,
                segments: vec![],
            },
            hunks,
        }
    }

    fn table(entries: Vec<u32>) -> RelocationTable {
        let mut table = RelocationTable::new();
        table.insert(TARGET_HUNK, entries);
        table
    }

    #[test]
    fn test_resolves_offsets_from_running_sums() {
        // 12 entries of 10 -> 120; then 7, 9, 11.
        let mut entries = vec![10; 12];
        entries.extend([7, 9, 11]);
        let offsets = resolve_offsets(&image_with(vec![table(entries)])).unwrap();

        assert_eq!(offsets.codepage_offset, 120);
        assert_eq!(offsets.text_offset, 120 + 16 + 4);
        // 120 + 27 + 262 = 409 -> 409 + 3
        assert_eq!(offsets.glyph_offset, 412);
    }

    #[test]
    fn test_aligned_glyph_offset_still_moves_forward() {
        // 0 + (0 + 0 + 2) + 262 = 264, already aligned: still jumps a full word.
        let mut entries = vec![0; 14];
        entries.push(2);
        let offsets = resolve_offsets(&image_with(vec![table(entries)])).unwrap();
        assert_eq!(offsets.glyph_offset, 268);
    }

    #[test]
    fn test_glyph_offset_is_always_word_aligned() {
        for seed in 0..64u32 {
            let entries: Vec<u32> = (0..15).map(|i| seed.wrapping_mul(31) ^ (i * 7)).collect();
            let offsets = resolve_offsets(&image_with(vec![table(entries)])).unwrap();
            assert_eq!(offsets.glyph_offset % 4, 0, "seed {seed}");
        }
    }

    #[test]
    fn test_uses_the_last_relocation_table() {
        let first = table(vec![1; 3]);
        let last = table(vec![0; 15]);
        let offsets = resolve_offsets(&image_with(vec![first, last])).unwrap();
        assert_eq!(offsets.codepage_offset, 0);
        assert_eq!(offsets.text_offset, 4);
    }

    #[test]
    fn test_fails_without_relocations() {
        let err = resolve_offsets(&image_with(vec![])).unwrap_err();
        assert!(matches!(err, AmberError::NoRelocationTable));
        assert_eq!(err.to_string(), "no relocation table");
    }

    #[test]
    fn test_fails_on_unexpected_entry_count() {
        let err = resolve_offsets(&image_with(vec![table(vec![1; 14])])).unwrap_err();
        assert!(matches!(
            err,
            AmberError::UnexpectedEntryCount {
                hunk: 5,
                found: Some(14)
            }
        ));

        let mut other_hunk = RelocationTable::new();
        other_hunk.insert(4, vec![0; 15]);
        let err = resolve_offsets(&image_with(vec![other_hunk])).unwrap_err();
        assert!(matches!(
            err,
            AmberError::UnexpectedEntryCount { found: None, .. }
        ));
        assert!(err.is_format_error());
    }
}
