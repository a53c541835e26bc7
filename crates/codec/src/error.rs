use enum_as_inner::EnumAsInner;
use shale_primitives::ColId;
use shale_schema::TypeKind;
use thiserror::Error;

/// Malformed bytes observed while decoding a key, row value or index value.
#[derive(Error, Debug, EnumAsInner, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    Eof,
    #[error("invalid byte-group marker {0:#04x}")]
    InvalidMarker(u8),
    #[error("nonzero padding in byte group")]
    NonZeroPadding,
    #[error("unknown datum flag {0:#04x}")]
    UnknownFlag(u8),
    #[error("cannot decode {found} where the column type is {expected:?}")]
    TypeMismatch { expected: TypeKind, found: &'static str },
    #[error("row value references column {0} absent from the schema")]
    UnknownColumn(ColId),
    #[error("malformed row value: {0}")]
    RowFormat(&'static str),
    #[error("malformed key: {0}")]
    KeyFormat(&'static str),
    #[error("timestamp {0} out of representable range")]
    TimeOutOfRange(i64),
    #[error("invalid utf-8 in string value")]
    InvalidUtf8(#[from] core::str::Utf8Error),
}

/// A logical value that does not fit the column type it is encoded at,
/// or a row that does not fit the row-format header.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("cannot encode {found} at column type {expected:?}")]
    TypeMismatch { expected: TypeKind, found: &'static str },
    #[error("row with {0} columns exceeds the row-format column limit")]
    TooManyColumns(usize),
}
