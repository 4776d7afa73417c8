use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;

use crate::DecoderSettings;
use crate::err::{AmberError, Result};
use crate::hunk::Image;
use crate::relocation::{ResolvedOffsets, resolve_offsets};
use crate::tables::{TableSet, decode_tables};
use crate::utils::ByteCursor;

/// Everything recovered from the game executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutableData {
    pub offsets: ResolvedOffsets,
    pub tables: TableSet,
}

impl ExecutableData {
    pub fn from_path(path: impl AsRef<Path>, settings: &DecoderSettings) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| AmberError::FailedToOpenFile {
            source,
            path: path.to_path_buf(),
        })?;
        info!("Read {} bytes from {}", data.len(), path.display());

        Self::from_bytes(&data, settings)
    }

    pub fn from_bytes(data: &[u8], settings: &DecoderSettings) -> Result<Self> {
        let image = Image::parse(data)?;
        Self::from_image(&image, settings)
    }

    /// Resolves the table offsets, then decodes the tables from the first `DATA` hunk.
    pub fn from_image(image: &Image, settings: &DecoderSettings) -> Result<Self> {
        let offsets = resolve_offsets(image)?;

        let data = image.data_hunks().next().ok_or(AmberError::MissingDataHunk)?;
        debug!(
            "Decoding tables from a {} byte data hunk, glyphs at {}",
            data.len(),
            offsets.glyph_offset
        );

        let mut cursor = ByteCursor::with_pos(data, offsets.glyph_offset)
            .map_err(|source| AmberError::FailedToDecodeTable {
                table: "glyphs",
                source,
            })?;
        let tables = decode_tables(&mut cursor, settings)?;

        Ok(ExecutableData { offsets, tables })
    }
}
