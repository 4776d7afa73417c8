pub(crate) mod byte_cursor;
pub(crate) mod bytes;
mod text;

pub use self::byte_cursor::ByteCursor;
pub(crate) use self::text::decode_text;
