//! Physical key/value layout of row and index records.
//!
//! Keys:
//!
//! ```text
//! row key:   't' [table id: u64 be] "_r" [handle: ordered i64]
//! index key: 't' [table id: u64 be] "_i" [index id: u64 be] [datums: keycode] [handle: ordered i64]
//! ```
//!
//! An index value is empty for a deletion. For an insertion it is a flag
//! byte, optionally followed by the handle (unique indexes) and by a
//! restored-data payload in the row format, carrying the original values
//! of columns whose key encoding is lossy.

use crate::keycode;
use crate::row;
use crate::{Datum, DecodeError, EncodeError, RawDatum};
use chrono::FixedOffset;
use shale_primitives::map::IntMap;
use shale_primitives::{ColId, Handle, IndexId, TableId};
use shale_schema::FieldType;

const TABLE_PREFIX: u8 = b't';
const ROW_MARKER: &[u8; 2] = b"_r";
const INDEX_MARKER: &[u8; 2] = b"_i";

/// Length of `'t' [table id] [marker]`.
pub const RECORD_PREFIX_LEN: usize = 1 + 8 + 2;
/// Where the encoded datums of an index key begin.
pub const INDEX_DATA_OFFSET: usize = RECORD_PREFIX_LEN + 8;
/// Exact length of a row key.
pub const ROW_KEY_LEN: usize = RECORD_PREFIX_LEN + 8;

const VALUE_HAS_HANDLE: u8 = 0b01;
const VALUE_HAS_RESTORE_DATA: u8 = 0b10;

/// Whether the handle suffix of an index key is part of the decoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    /// Decode the handle as a final value.
    Needed,
    /// Stop after the indexed columns; the handle suffix is ignored.
    NotNeeded,
}

/// Per-column decoding descriptor for one index, in index-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRowCol {
    pub col_id: ColId,
    /// Whether the key encoding of this column is lossy, so its original
    /// value lives in the restored-data payload of the index value.
    pub restored: bool,
}

pub fn encode_row_key(table: TableId, handle: Handle) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROW_KEY_LEN);
    key.push(TABLE_PREFIX);
    key.extend_from_slice(&u64::from(table).to_be_bytes());
    key.extend_from_slice(ROW_MARKER);
    keycode::encode_handle(&mut key, handle.0);
    key
}

/// Encodes an index key from already-truncated column datums.
///
/// Prefix truncation is the encoder's job; this function encodes exactly
/// the datums it is handed.
pub fn encode_index_key(
    table: TableId,
    index: IndexId,
    cols: &[(&FieldType, &Datum)],
    handle: Handle,
    tz: FixedOffset,
) -> Result<Vec<u8>, EncodeError> {
    let mut key = Vec::with_capacity(INDEX_DATA_OFFSET + 10 * cols.len() + 8);
    key.push(TABLE_PREFIX);
    key.extend_from_slice(&u64::from(table).to_be_bytes());
    key.extend_from_slice(INDEX_MARKER);
    key.extend_from_slice(&u64::from(index).to_be_bytes());
    for (ty, datum) in cols {
        keycode::encode_datum(&mut key, datum, ty, tz)?;
    }
    keycode::encode_handle(&mut key, handle.0);
    Ok(key)
}

/// Encodes an index value for an insertion.
///
/// `restore` carries the original datums of lossy-encoded columns;
/// `handle` is stored for unique indexes so point lookups need not parse
/// the key suffix.
pub fn encode_index_value(
    handle: Option<Handle>,
    restore: Option<&[(ColId, &FieldType, &Datum)]>,
    tz: FixedOffset,
) -> Result<Vec<u8>, EncodeError> {
    let mut flags = 0;
    if handle.is_some() {
        flags |= VALUE_HAS_HANDLE;
    }
    if restore.is_some() {
        flags |= VALUE_HAS_RESTORE_DATA;
    }
    let mut value = vec![flags];
    if let Some(h) = handle {
        value.extend_from_slice(&(h.0 as u64 ^ 1 << 63).to_be_bytes());
    }
    if let Some(entries) = restore {
        value.extend_from_slice(&row::encode_row(entries, tz)?);
    }
    Ok(value)
}

/// The table id component of any row or index key, if the key has one.
pub fn table_id_of_key(key: &[u8]) -> Option<TableId> {
    if key.len() < RECORD_PREFIX_LEN || key[0] != TABLE_PREFIX {
        return None;
    }
    let raw = u64::from_be_bytes(key[1..9].try_into().ok()?);
    u32::try_from(raw).ok().map(TableId)
}

/// Whether `key` has the row-key shape (table + handle, no index marker).
pub fn is_row_key(key: &[u8]) -> bool {
    key.len() == ROW_KEY_LEN && key[0] == TABLE_PREFIX && &key[9..11] == ROW_MARKER
}

/// The index id component of an index key.
pub fn index_id_of_key(key: &[u8]) -> Result<IndexId, DecodeError> {
    if key.len() < INDEX_DATA_OFFSET || key[0] != TABLE_PREFIX || &key[9..11] != INDEX_MARKER {
        return Err(DecodeError::KeyFormat("not an index key"));
    }
    let raw = u64::from_be_bytes(key[11..19].try_into().map_err(|_| DecodeError::Eof)?);
    u32::try_from(raw)
        .map(IndexId)
        .map_err(|_| DecodeError::KeyFormat("index id out of range"))
}

/// The handle encoded in a row key.
pub fn row_key_handle(key: &[u8]) -> Result<Handle, DecodeError> {
    if !is_row_key(key) {
        return Err(DecodeError::KeyFormat("not a row key"));
    }
    let mut r = &key[RECORD_PREFIX_LEN..];
    keycode::decode_handle(&mut r).map(Handle)
}

/// Decodes the indexed-column values of one index entry.
///
/// `value` is the index value payload when present (insertions); columns
/// flagged `restored` in `layout` take their value from the restored-data
/// payload instead of the lossy key bytes. With [`HandleMode::Needed`]
/// the handle suffix is decoded as one final value.
pub fn decode_index_values(
    key: &[u8],
    value: Option<&[u8]>,
    layout: &[IndexRowCol],
    mode: HandleMode,
) -> Result<Vec<RawDatum>, DecodeError> {
    // Re-checks the key shape so a caller cannot feed a row key in here.
    index_id_of_key(key)?;
    let restore = match value {
        Some(v) => decode_restore_data(v)?,
        None => IntMap::default(),
    };

    let mut r = &key[INDEX_DATA_OFFSET..];
    let mut out = Vec::with_capacity(layout.len() + 1);
    for col in layout {
        let from_key = keycode::decode_raw(&mut r)?;
        let datum = match (col.restored, restore.get(&col.col_id)) {
            (true, Some(original)) => original.clone(),
            _ => from_key,
        };
        out.push(datum);
    }
    if mode == HandleMode::Needed {
        out.push(RawDatum::Int(keycode::decode_handle(&mut r)?));
    }
    Ok(out)
}

fn decode_restore_data(value: &[u8]) -> Result<IntMap<ColId, RawDatum>, DecodeError> {
    let (&flags, mut rest) = value.split_first().ok_or(DecodeError::Eof)?;
    if flags & VALUE_HAS_HANDLE != 0 {
        if rest.len() < 8 {
            return Err(DecodeError::Eof);
        }
        rest = &rest[8..];
    }
    if flags & VALUE_HAS_RESTORE_DATA == 0 {
        return Ok(IntMap::default());
    }
    Ok(row::decode_row_raw(rest)?.into_iter().collect())
}
