use enum_as_inner::EnumAsInner;
use shale_codec::{Datum, DecodeError, EncodeError};
use shale_primitives::{ColId, IndexId, TableId};
use thiserror::Error;

pub type Result<T, E = CheckError> = core::result::Result<T, E>;

/// An inconsistency between staged mutation bytes and the logical row.
///
/// Every variant is fatal and non-retryable: it signals either an encoder
/// bug or real corruption, and the caller is expected to abort the
/// statement or transaction rather than attempt recovery.
#[derive(Error, Debug, EnumAsInner, PartialEq)]
pub enum CheckError {
    #[error("multiple row mutations staged for table {table} (second key: {key:02x?})")]
    MultipleRowMutations { table: TableId, key: Vec<u8> },
    #[error("index mutation references index {0} absent from the schema")]
    IndexNotFound(IndexId),
    #[error("decoded row column {col} is `{decoded:?}` but the logical row holds `{expected:?}`")]
    InconsistentRow {
        col: ColId,
        expected: Datum,
        decoded: Datum,
    },
    #[error(
        "index {index} column {col} decodes to `{decoded:?}` but the logical row holds `{expected:?}` (both after truncation)"
    )]
    InconsistentIndex {
        index: IndexId,
        col: ColId,
        expected: Datum,
        decoded: Datum,
    },
    #[error("index {index} stages {dir} but the caller supplied no logical row for it")]
    MissingLogicalRow { index: IndexId, dir: &'static str },
    #[error("logical row with {len} columns has no value at offset {offset} for column {col}")]
    LogicalRowTooShort { col: ColId, offset: usize, len: usize },
    #[error("row value names column {0} absent from the column maps")]
    ColumnNotFound(ColId),
    #[error("failed to decode staged mutation (key: {key:02x?}): {source}")]
    Decode {
        key: Vec<u8>,
        #[source]
        source: DecodeError,
    },
}

impl CheckError {
    /// Wraps a codec error with the offending key for diagnostics.
    pub(crate) fn decode(key: &[u8], source: DecodeError) -> Self {
        CheckError::Decode {
            key: key.to_vec(),
            source,
        }
    }
}

/// A failure while encoding and staging a row change.
#[derive(Error, Debug, PartialEq)]
pub enum WriteError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("row has {len} columns but table `{table}` declares {expected}")]
    RowArity {
        table: TableId,
        len: usize,
        expected: usize,
    },
    #[error(transparent)]
    Check(#[from] CheckError),
}
