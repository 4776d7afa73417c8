//! Amiga hunk executables.
//!
//! A hunk file is a `HUNK_HEADER` followed by a flat run of typed blocks. Loadable blocks
//! (`CODE`, `DATA`, `BSS`) open a segment, and the blocks that follow them (`RELOC32`,
//! `SYMBOL`, `DEBUG`) describe that segment until a `HUNK_END` closes it.
//!
//! We never relocate anything. The relocation tables are kept because the offsets of the
//! embedded text tables can only be recovered from them (see [`crate::relocation`]).

use std::collections::BTreeMap;

use bitflags::bitflags;
use log::{debug, trace};
use serde::Serialize;

use crate::err::{AmberError, DeserializationError, DeserializationResult, Result};
use crate::utils::ByteCursor;

pub const HUNK_SYMBOL: u32 = 0x3F0;
pub const HUNK_CODE: u32 = 0x3E9;
pub const HUNK_DATA: u32 = 0x3EA;
pub const HUNK_BSS: u32 = 0x3EB;
pub const HUNK_RELOC32: u32 = 0x3EC;
pub const HUNK_DEBUG: u32 = 0x3F1;
pub const HUNK_END: u32 = 0x3F2;
pub const HUNK_HEADER: u32 = 0x3F3;
pub const HUNK_DREL32: u32 = 0x3F7;
pub const HUNK_RELOC32SHORT: u32 = 0x3FC;

// Type and size longwords carry memory attributes in their two top bits.
const LONGS_MASK: u32 = 0x3FFF_FFFF;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    #[serde(transparent)]
    pub struct MemoryFlags: u32 {
        const CHIP = 1 << 30;
        const FAST = 1 << 31;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentSize {
    /// Size in 32-bit longwords.
    pub longs: u32,
    pub memory: MemoryFlags,
    /// With both memory bits set, the attributes follow in a longword of their own.
    pub ext_memory: Option<u32>,
}

impl SegmentSize {
    pub fn is_extended(&self) -> bool {
        self.ext_memory.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkHeader {
    pub resident_libraries: Vec<Vec<u8>>,
    pub table_size: u32,
    pub first_hunk: u32,
    pub last_hunk: u32,
    pub segments: Vec<SegmentSize>,
}

/// Referenced hunk index -> displacements, in file order.
pub type RelocationTable = BTreeMap<u32, Vec<u32>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: Vec<u8>,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HunkKind {
    Code,
    Data,
    Bss,
    Reloc32,
    Reloc32Short,
    Symbol,
    Debug,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Hunk {
    Code(Vec<u8>),
    Data(Vec<u8>),
    /// Size in longwords; BSS has no payload on disk.
    Bss(u32),
    Reloc32(RelocationTable),
    Reloc32Short(RelocationTable),
    Symbol(Vec<Symbol>),
    Debug(Vec<u8>),
    End,
}

impl Hunk {
    pub fn kind(&self) -> HunkKind {
        match self {
            Hunk::Code(_) => HunkKind::Code,
            Hunk::Data(_) => HunkKind::Data,
            Hunk::Bss(_) => HunkKind::Bss,
            Hunk::Reloc32(_) => HunkKind::Reloc32,
            Hunk::Reloc32Short(_) => HunkKind::Reloc32Short,
            Hunk::Symbol(_) => HunkKind::Symbol,
            Hunk::Debug(_) => HunkKind::Debug,
            Hunk::End => HunkKind::End,
        }
    }

    pub fn is_loadable(&self) -> bool {
        matches!(self, Hunk::Code(_) | Hunk::Data(_) | Hunk::Bss(_))
    }
}

/// A parsed executable image. Owns copies of all hunk payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub header: HunkHeader,
    pub hunks: Vec<Hunk>,
}

impl Image {
    pub fn parse(data: &[u8]) -> Result<Image> {
        let mut cursor = ByteCursor::new(data);
        Self::from_cursor(&mut cursor).map_err(|source| AmberError::FailedToParseImage { source })
    }

    fn from_cursor(cursor: &mut ByteCursor) -> DeserializationResult<Image> {
        let header = read_header(cursor)?;
        debug!(
            "Hunk header: {} segments ({}..={})",
            header.segments.len(),
            header.first_hunk,
            header.last_hunk
        );

        let mut hunks = Vec::new();
        while !cursor.is_eof() {
            let hunk = read_hunk(cursor)?;
            trace!("{:?} hunk ends at {}", hunk.kind(), cursor.pos());
            hunks.push(hunk);
        }

        Ok(Image { header, hunks })
    }

    /// Payloads of all `DATA` hunks, in file order.
    pub fn data_hunks(&self) -> impl Iterator<Item = &[u8]> {
        self.hunks.iter().filter_map(|hunk| match hunk {
            Hunk::Data(data) => Some(data.as_slice()),
            _ => None,
        })
    }

    /// The loadable hunk (code, data or BSS) numbered `index`, as relocation tables count them.
    pub fn segment(&self, index: usize) -> Option<&Hunk> {
        self.hunks.iter().filter(|h| h.is_loadable()).nth(index)
    }

    pub fn last_relocation_table(&self) -> Option<&RelocationTable> {
        self.hunks.iter().rev().find_map(|hunk| match hunk {
            Hunk::Reloc32(table) => Some(table),
            _ => None,
        })
    }
}

fn read_header(cursor: &mut ByteCursor) -> DeserializationResult<HunkHeader> {
    let start = cursor.position();
    let magic = cursor.u32_named("hunk header magic")?;
    if magic != HUNK_HEADER {
        return Err(DeserializationError::invalid(
            "hunk header magic",
            start,
            format!("expected `0x{HUNK_HEADER:08x}`, found `0x{magic:08x}`"),
        ));
    }

    let mut resident_libraries = Vec::new();
    loop {
        let longs = cursor.u32_named("resident library name length")? as usize;
        if longs == 0 {
            break;
        }
        let name = cursor.take_bytes(longs * 4, "resident library name")?;
        resident_libraries.push(trim_nul_padding(name).to_vec());
    }

    let table_size = cursor.u32_named("hunk table size")?;
    let first_hunk = cursor.u32_named("first hunk")?;
    let last_hunk_offset = cursor.position();
    let last_hunk = cursor.u32_named("last hunk")?;
    if last_hunk < first_hunk {
        return Err(DeserializationError::invalid(
            "last hunk",
            last_hunk_offset,
            format!("last hunk {last_hunk} precedes first hunk {first_hunk}"),
        ));
    }

    let count = (last_hunk - first_hunk) as usize + 1;
    let segments = (0..count)
        .map(|_| read_size(cursor, "hunk size"))
        .collect::<DeserializationResult<Vec<SegmentSize>>>()?;

    Ok(HunkHeader {
        resident_libraries,
        table_size,
        first_hunk,
        last_hunk,
        segments,
    })
}

fn read_hunk(cursor: &mut ByteCursor) -> DeserializationResult<Hunk> {
    let offset = cursor.position();
    let hunk_type = cursor.u32_named("hunk type")? & LONGS_MASK;

    let hunk = match hunk_type {
        HUNK_CODE => {
            let size = read_size(cursor, "code hunk size")?;
            Hunk::Code(read_payload(cursor, size.longs, "code hunk")?)
        }
        HUNK_DATA => {
            let size = read_size(cursor, "data hunk size")?;
            Hunk::Data(read_payload(cursor, size.longs, "data hunk")?)
        }
        HUNK_BSS => Hunk::Bss(read_size(cursor, "bss size")?.longs),
        HUNK_RELOC32 => Hunk::Reloc32(read_reloc32(cursor)?),
        HUNK_RELOC32SHORT | HUNK_DREL32 => Hunk::Reloc32Short(read_reloc32_short(cursor)?),
        HUNK_SYMBOL => Hunk::Symbol(read_symbols(cursor)?),
        HUNK_DEBUG => {
            let longs = cursor.u32_named("debug hunk size")?;
            Hunk::Debug(read_payload(cursor, longs, "debug hunk")?)
        }
        HUNK_END => Hunk::End,
        other => {
            return Err(DeserializationError::UnknownHunkType {
                hunk_type: other,
                offset,
            });
        }
    };

    Ok(hunk)
}

/// A size longword as found in the header and in front of code, data and BSS hunks.
fn read_size(cursor: &mut ByteCursor, what: &'static str) -> DeserializationResult<SegmentSize> {
    let raw = cursor.u32_named(what)?;
    let memory = MemoryFlags::from_bits_truncate(raw);
    let ext_memory = if memory.contains(MemoryFlags::CHIP | MemoryFlags::FAST) {
        Some(cursor.u32_named("extended memory attributes")?)
    } else {
        None
    };

    Ok(SegmentSize {
        longs: raw & LONGS_MASK,
        memory,
        ext_memory,
    })
}

fn read_payload(
    cursor: &mut ByteCursor,
    longs: u32,
    what: &'static str,
) -> DeserializationResult<Vec<u8>> {
    let len = (longs as usize)
        .checked_mul(4)
        .ok_or_else(|| DeserializationError::invalid(what, cursor.position(), "size overflows"))?;
    Ok(cursor.take_bytes(len, what)?.to_vec())
}

fn read_reloc32(cursor: &mut ByteCursor) -> DeserializationResult<RelocationTable> {
    let mut table = RelocationTable::new();
    loop {
        let count = cursor.u32_named("reloc32 count")? as usize;
        if count == 0 {
            break;
        }
        let target = cursor.u32_named("reloc32 hunk")?;
        let offsets = cursor.u32_vec(count, "reloc32 offsets")?;
        table.entry(target).or_default().extend(offsets);
    }
    Ok(table)
}

fn read_reloc32_short(cursor: &mut ByteCursor) -> DeserializationResult<RelocationTable> {
    let start = cursor.pos();
    let mut table = RelocationTable::new();
    loop {
        let count = cursor.u16_named("reloc32short count")? as usize;
        if count == 0 {
            break;
        }
        let target = u32::from(cursor.u16_named("reloc32short hunk")?);
        let entry = table.entry(target).or_default();
        for _ in 0..count {
            entry.push(u32::from(cursor.u16_named("reloc32short offset")?));
        }
    }

    // Word-sized tables are padded back to a longword boundary.
    if (cursor.pos() - start) % 4 != 0 {
        cursor.advance(2, "reloc32short padding")?;
    }
    Ok(table)
}

fn read_symbols(cursor: &mut ByteCursor) -> DeserializationResult<Vec<Symbol>> {
    let mut symbols = Vec::new();
    loop {
        let longs = cursor.u32_named("symbol name length")? as usize;
        if longs == 0 {
            break;
        }
        let name = trim_nul_padding(cursor.take_bytes(longs * 4, "symbol name")?).to_vec();
        let value = cursor.u32_named("symbol value")?;
        symbols.push(Symbol { name, value });
    }
    Ok(symbols)
}

fn trim_nul_padding(name: &[u8]) -> &[u8] {
    let end = name.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &name[..end]
}
