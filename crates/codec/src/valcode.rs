//! Cell encoding for the row format.
//!
//! Unlike [`keycode`](crate::keycode), cells never participate in key
//! comparison, so they use the cheap native-endian-free layout: one flag
//! byte plus a fixed or cell-delimited payload. Cell boundaries come from
//! the row header, so byte strings carry no length of their own.

use crate::datum::wall_to_utc_micros;
use crate::{Datum, DecodeError, EncodeError, RawDatum};
use chrono::FixedOffset;
use shale_schema::{FieldType, TypeKind};

const NIL_FLAG: u8 = 0x00;
const BYTES_FLAG: u8 = 0x01;
const INT_FLAG: u8 = 0x03;
const UINT_FLAG: u8 = 0x04;
const FLOAT_FLAG: u8 = 0x05;
const STR_FLAG: u8 = 0x06;
const TIME_FLAG: u8 = 0x07;

/// Encodes one cell of `datum` at column type `ty` into `buf`.
pub(crate) fn encode_cell(
    buf: &mut Vec<u8>,
    datum: &Datum,
    ty: &FieldType,
    tz: FixedOffset,
) -> Result<(), EncodeError> {
    match (datum, ty.kind) {
        (Datum::Null, _) => buf.push(NIL_FLAG),
        (Datum::Int(v), TypeKind::Int) => {
            buf.push(INT_FLAG);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        (Datum::Uint(v), TypeKind::Uint) => {
            buf.push(UINT_FLAG);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        (Datum::Float(v), TypeKind::Float) => {
            buf.push(FLOAT_FLAG);
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
        (Datum::Bytes(b), TypeKind::Bytes) => {
            buf.push(BYTES_FLAG);
            buf.extend_from_slice(b);
        }
        // The cell stores the original string, not its sort key;
        // the row format is the lossless side of the encoding pair.
        (Datum::Str(s), TypeKind::Str) => {
            buf.push(STR_FLAG);
            buf.extend_from_slice(s.as_bytes());
        }
        (Datum::Time(t), TypeKind::Time) => {
            buf.push(TIME_FLAG);
            buf.extend_from_slice(&wall_to_utc_micros(*t, tz).to_le_bytes());
        }
        (datum, expected) => {
            return Err(EncodeError::TypeMismatch {
                expected,
                found: datum.kind_name(),
            })
        }
    }
    Ok(())
}

/// Type-directed decode of one cell, checking the flag against `ty`.
pub(crate) fn decode_cell(cell: &[u8], ty: &FieldType, tz: FixedOffset) -> Result<Datum, DecodeError> {
    let raw = decode_cell_raw(cell)?;
    if let RawDatum::Bytes(b) = raw {
        // decode_cell_raw collapses both string and byte cells to raw
        // bytes; re-check the flag so a bytes cell cannot pose as a
        // string cell or vice versa.
        let flag = cell[0];
        return match (flag, ty.kind) {
            (BYTES_FLAG, TypeKind::Bytes) | (STR_FLAG, TypeKind::Str) => {
                Datum::from_raw(RawDatum::Bytes(b), ty, tz)
            }
            _ => Err(DecodeError::TypeMismatch {
                expected: ty.kind,
                found: if flag == STR_FLAG { "str" } else { "bytes" },
            }),
        };
    }
    Datum::from_raw(raw, ty, tz)
}

/// Flag-directed decode of one cell, used for restored-data payloads
/// where the column type is applied later.
pub(crate) fn decode_cell_raw(cell: &[u8]) -> Result<RawDatum, DecodeError> {
    let (&flag, payload) = cell.split_first().ok_or(DecodeError::Eof)?;
    let fixed8 = |p: &[u8]| -> Result<[u8; 8], DecodeError> {
        p.try_into().map_err(|_| DecodeError::Eof)
    };
    match flag {
        NIL_FLAG => {
            if !payload.is_empty() {
                return Err(DecodeError::RowFormat("null cell with payload"));
            }
            Ok(RawDatum::Null)
        }
        INT_FLAG => Ok(RawDatum::Int(i64::from_le_bytes(fixed8(payload)?))),
        UINT_FLAG => Ok(RawDatum::Uint(u64::from_le_bytes(fixed8(payload)?))),
        FLOAT_FLAG => Ok(RawDatum::Float(f64::from_bits(u64::from_le_bytes(fixed8(payload)?)))),
        BYTES_FLAG | STR_FLAG => Ok(RawDatum::Bytes(payload.to_vec())),
        TIME_FLAG => Ok(RawDatum::Time(i64::from_le_bytes(fixed8(payload)?))),
        other => Err(DecodeError::UnknownFlag(other)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use shale_schema::Collation;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn cell(datum: &Datum, ty: &FieldType) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_cell(&mut buf, datum, ty, utc()).unwrap();
        buf
    }

    #[test]
    fn cells_round_trip() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let time = NaiveDate::from_ymd_opt(2023, 7, 4)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let cases = [
            (Datum::Null, FieldType::new(TypeKind::Int)),
            (Datum::Int(-42), FieldType::new(TypeKind::Int)),
            (Datum::Uint(42), FieldType::new(TypeKind::Uint)),
            (Datum::Float(1.5), FieldType::new(TypeKind::Float)),
            (Datum::Bytes(vec![0, 1, 2]), FieldType::new(TypeKind::Bytes)),
            (Datum::Str("Hêllo".into()), FieldType::str_with(Collation::GeneralCi)),
            (Datum::Time(time), FieldType::new(TypeKind::Time)),
        ];
        for (datum, ty) in cases {
            let mut buf = Vec::new();
            encode_cell(&mut buf, &datum, &ty, tz).unwrap();
            assert_eq!(decode_cell(&buf, &ty, tz).unwrap(), datum, "{ty:?}");
        }
    }

    #[test]
    fn ci_string_cell_keeps_the_original() {
        let ty = FieldType::str_with(Collation::GeneralCi);
        let buf = cell(&Datum::Str("AbC".into()), &ty);
        assert_eq!(decode_cell(&buf, &ty, utc()).unwrap(), Datum::Str("AbC".into()));
    }

    #[test]
    fn flag_type_mismatch_is_rejected() {
        let buf = cell(&Datum::Bytes(vec![1]), &FieldType::new(TypeKind::Bytes));
        let err = decode_cell(&buf, &FieldType::new(TypeKind::Str), utc());
        assert_eq!(
            err,
            Err(DecodeError::TypeMismatch {
                expected: TypeKind::Str,
                found: "bytes"
            })
        );
        let buf = cell(&Datum::Int(1), &FieldType::new(TypeKind::Int));
        assert!(decode_cell(&buf, &FieldType::new(TypeKind::Uint), utc()).is_err());
    }

    #[test]
    fn truncated_cell_is_an_error_not_a_panic() {
        let buf = cell(&Datum::Int(7), &FieldType::new(TypeKind::Int));
        assert_eq!(
            decode_cell(&buf[..5], &FieldType::new(TypeKind::Int), utc()),
            Err(DecodeError::Eof)
        );
    }
}
