use serde::Serialize;

use crate::DecoderSettings;
use crate::err::{DeserializationError, DeserializationResult};
use crate::tables::read_count;
use crate::utils::ByteCursor;

pub const MAX_GLYPH_HEIGHT: u8 = 32;
pub const CURSOR_SIZE: usize = 16;
const CURSOR_PLANES: usize = 2;

/// A 16 pixel wide, 1 bit per pixel glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Glyph {
    pub advance: u8,
    /// One word per row, most significant bit is the leftmost pixel.
    pub rows: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Glyphs {
    pub height: u8,
    pub glyphs: Vec<Glyph>,
}

/// A 16x16 mouse pointer with two bitplanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorImage {
    pub hotspot_x: u16,
    pub hotspot_y: u16,
    /// `[row][plane]`.
    pub planes: Vec<[u16; CURSOR_PLANES]>,
}

impl CursorImage {
    /// Palette index (0..=3) of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= CURSOR_SIZE {
            return None;
        }
        let [p0, p1] = *self.planes.get(y)?;
        let bit = 15 - x;
        Some((((p1 >> bit) & 1) << 1 | ((p0 >> bit) & 1)) as u8)
    }
}

pub(crate) fn read_glyphs(
    cursor: &mut ByteCursor,
    settings: &DecoderSettings,
) -> DeserializationResult<Glyphs> {
    let count = read_count(cursor, "glyph count", settings)?;

    let height_offset = cursor.position();
    let height = cursor.u8_named("glyph height")?;
    if height == 0 || height > MAX_GLYPH_HEIGHT {
        return Err(DeserializationError::invalid(
            "glyph height",
            height_offset,
            format!("expected 1..={MAX_GLYPH_HEIGHT}, found {height}"),
        ));
    }

    let mut glyphs = Vec::with_capacity(count);
    for _ in 0..count {
        let advance = cursor.u8_named("glyph advance")?;
        let rows = (0..height)
            .map(|_| cursor.u16_named("glyph row"))
            .collect::<DeserializationResult<Vec<u16>>>()?;
        glyphs.push(Glyph { advance, rows });
    }

    Ok(Glyphs { height, glyphs })
}

pub(crate) fn read_cursors(
    cursor: &mut ByteCursor,
    settings: &DecoderSettings,
) -> DeserializationResult<Vec<CursorImage>> {
    let count = read_count(cursor, "cursor count", settings)?;

    let mut cursors = Vec::with_capacity(count);
    for _ in 0..count {
        let hotspot_x = cursor.u16_named("cursor hotspot x")?;
        let hotspot_y = cursor.u16_named("cursor hotspot y")?;
        let mut planes = Vec::with_capacity(CURSOR_SIZE);
        for _ in 0..CURSOR_SIZE {
            planes.push([
                cursor.u16_named("cursor plane 0")?,
                cursor.u16_named("cursor plane 1")?,
            ]);
        }
        cursors.push(CursorImage {
            hotspot_x,
            hotspot_y,
            planes,
        });
    }

    Ok(cursors)
}
