//! The row format: a column-ID keyed value encoding.
//!
//! Layout:
//!
//! ```text
//! [version: u8] [ncols: u16 le] [col ids: u32 le * n] [cell ends: u32 le * n] [cells]
//! ```
//!
//! Cell ends are offsets into the cell region, so individual cells need
//! no length of their own. Columns may be omitted (default-valued
//! columns commonly are); decoding yields only the columns present.

use crate::valcode;
use crate::{Datum, DecodeError, EncodeError, RawDatum};
use chrono::FixedOffset;
use shale_primitives::map::IntMap;
use shale_primitives::ColId;
use shale_schema::FieldType;

pub const ROW_VERSION: u8 = 0x80;

/// Encodes `entries` into a row value. Entry order is preserved.
pub fn encode_row(
    entries: &[(ColId, &FieldType, &Datum)],
    tz: FixedOffset,
) -> Result<Vec<u8>, EncodeError> {
    let ncols =
        u16::try_from(entries.len()).map_err(|_| EncodeError::TooManyColumns(entries.len()))?;
    let mut buf = vec![ROW_VERSION];
    buf.extend_from_slice(&ncols.to_le_bytes());
    for (col_id, _, _) in entries {
        buf.extend_from_slice(&col_id.0.to_le_bytes());
    }
    let ends_at = buf.len();
    buf.resize(ends_at + 4 * entries.len(), 0);
    let cells_at = buf.len();
    for (i, (_, ty, datum)) in entries.iter().enumerate() {
        valcode::encode_cell(&mut buf, datum, ty, tz)?;
        let end = (buf.len() - cells_at) as u32;
        buf[ends_at + 4 * i..ends_at + 4 * (i + 1)].copy_from_slice(&end.to_le_bytes());
    }
    Ok(buf)
}

/// Decodes a row value into `(column id, typed datum)` pairs, using each
/// column's field type from `col_types` and the session timezone.
///
/// A column id absent from `col_types` is an error: the staged bytes
/// claim a column the schema does not know.
pub fn decode_row(
    bytes: &[u8],
    col_types: &IntMap<ColId, FieldType>,
    tz: FixedOffset,
) -> Result<Vec<(ColId, Datum)>, DecodeError> {
    walk_row(bytes, |col_id, cell| {
        let ty = col_types.get(&col_id).ok_or(DecodeError::UnknownColumn(col_id))?;
        valcode::decode_cell(cell, ty, tz)
    })
}

/// Flag-directed decode of a row value, used for restored-data payloads.
pub fn decode_row_raw(bytes: &[u8]) -> Result<Vec<(ColId, RawDatum)>, DecodeError> {
    walk_row(bytes, |_, cell| valcode::decode_cell_raw(cell))
}

fn walk_row<T>(
    bytes: &[u8],
    mut decode: impl FnMut(ColId, &[u8]) -> Result<T, DecodeError>,
) -> Result<Vec<(ColId, T)>, DecodeError> {
    let (&version, rest) = bytes.split_first().ok_or(DecodeError::Eof)?;
    if version != ROW_VERSION {
        return Err(DecodeError::RowFormat("unknown row format version"));
    }
    let (ncols, rest) = rest.split_first_chunk::<2>().ok_or(DecodeError::Eof)?;
    let n = u16::from_le_bytes(*ncols) as usize;
    if rest.len() < 8 * n {
        return Err(DecodeError::Eof);
    }
    let (ids, rest) = rest.split_at(4 * n);
    let (ends, cells) = rest.split_at(4 * n);

    let mut out = Vec::with_capacity(n);
    let mut start = 0usize;
    for i in 0..n {
        let col_id = ColId(u32::from_le_bytes(ids[4 * i..4 * i + 4].try_into().unwrap()));
        let end = u32::from_le_bytes(ends[4 * i..4 * i + 4].try_into().unwrap()) as usize;
        let cell = cells
            .get(start..end)
            .ok_or(DecodeError::RowFormat("cell ends out of order or out of range"))?;
        out.push((col_id, decode(col_id, cell)?));
        start = end;
    }
    Ok(out)
}
