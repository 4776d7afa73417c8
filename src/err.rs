use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AmberError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;

/// Errors raised while reading the raw bytes of an image, a table or an event stream.
///
/// Every variant carries the byte offset (relative to the buffer being decoded) at which
/// the problem was detected.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error(
        "Offset `0x{offset:08x} ({offset})` - ran out of data while reading {what} (need {need} bytes, have {have})"
    )]
    OutOfData {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("Offset `0x{offset:08x} ({offset})` - invalid {what}: {message}")]
    InvalidFormat {
        what: &'static str,
        offset: u64,
        message: String,
    },

    #[error("Offset `0x{offset:08x} ({offset})` - unknown hunk type `0x{hunk_type:08x}`")]
    UnknownHunkType { hunk_type: u32, offset: u64 },

    #[error("Offset `0x{offset:08x} ({offset})` - table anchor marker not found in buffer")]
    MarkerNotFound { offset: u64 },
}

impl DeserializationError {
    pub fn offset(&self) -> u64 {
        match self {
            DeserializationError::OutOfData { offset, .. }
            | DeserializationError::InvalidFormat { offset, .. }
            | DeserializationError::UnknownHunkType { offset, .. }
            | DeserializationError::MarkerNotFound { offset } => *offset,
        }
    }

    pub(crate) fn invalid(what: &'static str, offset: u64, message: impl Into<String>) -> Self {
        DeserializationError::InvalidFormat {
            what,
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AmberError {
    #[error("Failed to open file {}", path.display())]
    FailedToOpenFile {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    #[error("Failed to parse hunk image")]
    FailedToParseImage {
        #[source]
        source: DeserializationError,
    },

    #[error("no relocation table")]
    NoRelocationTable,

    #[error("unexpected entry count for relocations of hunk {hunk}: expected 15, found {found:?}")]
    UnexpectedEntryCount { hunk: u32, found: Option<usize> },

    #[error("Image does not contain a data hunk")]
    MissingDataHunk,

    #[error("Relocation offset {offset} does not fit the address space")]
    OffsetOverflow { offset: u64 },

    #[error("Failed to decode table `{table}`")]
    FailedToDecodeTable {
        table: &'static str,
        #[source]
        source: DeserializationError,
    },

    #[error("Failed to decode event chain")]
    FailedToDecodeEventChain {
        #[source]
        source: DeserializationError,
    },

    #[error("`serde_json` failed")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}

impl AmberError {
    /// Byte offset of the failure, when the failure happened while reading bytes.
    pub fn offset(&self) -> Option<u64> {
        match self {
            AmberError::FailedToParseImage { source }
            | AmberError::FailedToDecodeTable { source, .. }
            | AmberError::FailedToDecodeEventChain { source } => Some(source.offset()),
            _ => None,
        }
    }

    /// `true` when a read would have consumed bytes past the end of its buffer.
    pub fn is_out_of_data(&self) -> bool {
        matches!(
            self,
            AmberError::FailedToParseImage {
                source: DeserializationError::OutOfData { .. }
            } | AmberError::FailedToDecodeTable {
                source: DeserializationError::OutOfData { .. },
                ..
            } | AmberError::FailedToDecodeEventChain {
                source: DeserializationError::OutOfData { .. }
            }
        )
    }

    /// `true` when a structural assumption about the layout was violated.
    pub fn is_format_error(&self) -> bool {
        match self {
            AmberError::NoRelocationTable
            | AmberError::UnexpectedEntryCount { .. }
            | AmberError::MissingDataHunk
            | AmberError::OffsetOverflow { .. } => true,
            AmberError::FailedToParseImage { source }
            | AmberError::FailedToDecodeTable { source, .. }
            | AmberError::FailedToDecodeEventChain { source } => {
                !matches!(source, DeserializationError::OutOfData { .. })
            }
            AmberError::FailedToOpenFile { .. } | AmberError::JsonError { .. } => false,
        }
    }
}
