//! Memcomparable datum encoding used inside row and index keys.
//!
//! The defining property: for two datums of the same column type,
//! `encode(a) < encode(b)` under bytewise comparison iff `a < b`.
//! Byte strings are chunked into groups of eight with a trailing marker
//! byte per group so that no terminator can collide with value bytes.

use crate::datum::wall_to_utc_micros;
use crate::{Datum, DecodeError, EncodeError, RawDatum};
use chrono::FixedOffset;
use shale_schema::{FieldType, TypeKind};

const NIL_FLAG: u8 = 0x00;
const BYTES_FLAG: u8 = 0x01;
const INT_FLAG: u8 = 0x03;
const UINT_FLAG: u8 = 0x04;
const FLOAT_FLAG: u8 = 0x05;
const TIME_FLAG: u8 = 0x07;

const SIGN_MASK: u64 = 1 << 63;

const GROUP_SIZE: usize = 8;
const PAD: u8 = 0x00;
// Marker for a group holding `n` meaningful bytes is `GROUP_MARKER_BASE + n`,
// so fuller groups (longer values) order after emptier ones.
const GROUP_MARKER_BASE: u8 = 0xF7;

/// Encodes `datum` at column type `ty` into `buf`.
///
/// String values are encoded via their collation sort key, which is what
/// makes the key bytewise-comparable and, for lossy collations, what
/// forces index values to carry restored data.
pub fn encode_datum(
    buf: &mut Vec<u8>,
    datum: &Datum,
    ty: &FieldType,
    tz: FixedOffset,
) -> Result<(), EncodeError> {
    match (datum, ty.kind) {
        (Datum::Null, _) => buf.push(NIL_FLAG),
        (Datum::Int(v), TypeKind::Int) => {
            buf.push(INT_FLAG);
            encode_ordered_i64(buf, *v);
        }
        (Datum::Uint(v), TypeKind::Uint) => {
            buf.push(UINT_FLAG);
            buf.extend_from_slice(&v.to_be_bytes());
        }
        (Datum::Float(v), TypeKind::Float) => {
            buf.push(FLOAT_FLAG);
            encode_ordered_f64(buf, *v);
        }
        (Datum::Bytes(b), TypeKind::Bytes) => {
            buf.push(BYTES_FLAG);
            encode_comparable_bytes(buf, b);
        }
        (Datum::Str(s), TypeKind::Str) => {
            buf.push(BYTES_FLAG);
            encode_comparable_bytes(buf, &ty.collation.sort_key(s));
        }
        (Datum::Time(t), TypeKind::Time) => {
            buf.push(TIME_FLAG);
            encode_ordered_i64(buf, wall_to_utc_micros(*t, tz));
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

/// Encodes a row handle the way it appears in keys: no flag byte,
/// just the order-preserving fixed-width integer form.
pub fn encode_handle(buf: &mut Vec<u8>, handle: i64) {
    encode_ordered_i64(buf, handle);
}

/// Decodes a handle encoded by [`encode_handle`].
pub fn decode_handle(r: &mut &[u8]) -> Result<i64, DecodeError> {
    Ok(decode_ordered_u64(r)? as i64 ^ i64::MIN)
}

/// Decodes one datum from the front of `r`, advancing it.
///
/// The result is raw: string columns come back as their sort-key bytes
/// and times as UTC microseconds; [`Datum::from_raw`] applies the column
/// type and session timezone.
pub fn decode_raw(r: &mut &[u8]) -> Result<RawDatum, DecodeError> {
    let (&flag, rest) = r.split_first().ok_or(DecodeError::Eof)?;
    *r = rest;
    match flag {
        NIL_FLAG => Ok(RawDatum::Null),
        INT_FLAG => Ok(RawDatum::Int(decode_ordered_u64(r)? as i64 ^ i64::MIN)),
        UINT_FLAG => Ok(RawDatum::Uint(decode_ordered_u64(r)?)),
        FLOAT_FLAG => Ok(RawDatum::Float(decode_ordered_f64(r)?)),
        BYTES_FLAG => Ok(RawDatum::Bytes(decode_comparable_bytes(r)?)),
        TIME_FLAG => Ok(RawDatum::Time(decode_ordered_u64(r)? as i64 ^ i64::MIN)),
        other => Err(DecodeError::UnknownFlag(other)),
    }
}

fn encode_ordered_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&((v as u64) ^ SIGN_MASK).to_be_bytes());
}

fn encode_ordered_f64(buf: &mut Vec<u8>, v: f64) {
    let bits = v.to_bits();
    let ordered = if bits & SIGN_MASK != 0 { !bits } else { bits | SIGN_MASK };
    buf.extend_from_slice(&ordered.to_be_bytes());
}

fn decode_ordered_u64(r: &mut &[u8]) -> Result<u64, DecodeError> {
    let (head, rest) = r.split_first_chunk::<8>().ok_or(DecodeError::Eof)?;
    *r = rest;
    Ok(u64::from_be_bytes(*head))
}

fn decode_ordered_f64(r: &mut &[u8]) -> Result<f64, DecodeError> {
    let ordered = decode_ordered_u64(r)?;
    let bits = if ordered & SIGN_MASK != 0 {
        ordered ^ SIGN_MASK
    } else {
        !ordered
    };
    Ok(f64::from_bits(bits))
}

fn encode_comparable_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    // Every group is padded to GROUP_SIZE and followed by its marker; a
    // length that is an exact multiple of the group size still emits a
    // final empty group so the marker always terminates the value.
    let mut idx = 0;
    loop {
        let end = usize::min(idx + GROUP_SIZE, data.len());
        let group = &data[idx..end];
        buf.extend_from_slice(group);
        buf.resize(buf.len() + (GROUP_SIZE - group.len()), PAD);
        buf.push(GROUP_MARKER_BASE + group.len() as u8);
        if group.len() < GROUP_SIZE {
            return;
        }
        idx = end;
        if idx == data.len() {
            buf.extend_from_slice(&[PAD; GROUP_SIZE]);
            buf.push(GROUP_MARKER_BASE);
            return;
        }
    }
}

fn decode_comparable_bytes(r: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    loop {
        let (group, rest) = r.split_first_chunk::<{ GROUP_SIZE + 1 }>().ok_or(DecodeError::Eof)?;
        *r = rest;
        let marker = group[GROUP_SIZE];
        let real = marker
            .checked_sub(GROUP_MARKER_BASE)
            .filter(|&n| n as usize <= GROUP_SIZE)
            .ok_or(DecodeError::InvalidMarker(marker))? as usize;
        out.extend_from_slice(&group[..real]);
        if real < GROUP_SIZE {
            if group[real..GROUP_SIZE].iter().any(|&b| b != PAD) {
                return Err(DecodeError::NonZeroPadding);
            }
            return Ok(out);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use shale_schema::Collation;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn encoded(datum: &Datum, ty: &FieldType) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_datum(&mut buf, datum, ty, utc()).unwrap();
        buf
    }

    #[test]
    fn known_byte_vectors() {
        assert_eq!(encoded(&Datum::Null, &FieldType::new(TypeKind::Int)), [NIL_FLAG]);
        assert_eq!(
            encoded(&Datum::Int(0), &FieldType::new(TypeKind::Int)),
            [INT_FLAG, 0x80, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            encoded(&Datum::Bytes(vec![]), &FieldType::new(TypeKind::Bytes)),
            [BYTES_FLAG, 0, 0, 0, 0, 0, 0, 0, 0, GROUP_MARKER_BASE]
        );
        // One full group then an empty terminating group.
        assert_eq!(
            encoded(&Datum::Bytes(b"abcdefgh".to_vec()), &FieldType::new(TypeKind::Bytes)).len(),
            1 + 9 + 9
        );
    }

    #[test]
    fn ci_strings_encode_their_sort_key() {
        let ty = FieldType::str_with(Collation::GeneralCi);
        assert_eq!(encoded(&Datum::Str("AbC".into()), &ty), encoded(&Datum::Str("aBc".into()), &ty));
    }

    #[test]
    fn encode_rejects_mistyped_datum() {
        let mut buf = Vec::new();
        let err = encode_datum(&mut buf, &Datum::Int(1), &FieldType::new(TypeKind::Uint), utc());
        assert_eq!(
            err,
            Err(EncodeError::TypeMismatch {
                expected: TypeKind::Uint,
                found: "int"
            })
        );
    }

    #[test]
    fn corrupted_pad_bytes_are_detected() {
        let mut buf = encoded(&Datum::Bytes(vec![1, 2]), &FieldType::new(TypeKind::Bytes));
        // Flip a padding byte inside the group.
        buf[5] = 0xAA;
        let mut r = &buf[..];
        assert_eq!(decode_raw(&mut r), Err(DecodeError::NonZeroPadding));
    }

    fn arb_datum_ty() -> impl Strategy<Value = (Datum, FieldType)> {
        prop_oneof![
            any::<i64>().prop_map(|v| (Datum::Int(v), FieldType::new(TypeKind::Int))),
            any::<u64>().prop_map(|v| (Datum::Uint(v), FieldType::new(TypeKind::Uint))),
            (-1.0e12f64..1.0e12).prop_map(|v| (Datum::Float(v), FieldType::new(TypeKind::Float))),
            prop::collection::vec(any::<u8>(), 0..40)
                .prop_map(|v| (Datum::Bytes(v), FieldType::new(TypeKind::Bytes))),
            ".{0,24}".prop_map(|v| (Datum::Str(v), FieldType::new(TypeKind::Str))),
        ]
    }

    proptest! {
        #[test]
        fn round_trips_through_raw((datum, ty) in arb_datum_ty()) {
            let buf = encoded(&datum, &ty);
            let mut r = &buf[..];
            let raw = decode_raw(&mut r).unwrap();
            prop_assert!(r.is_empty());
            let back = Datum::from_raw(raw, &ty, utc()).unwrap();
            prop_assert_eq!(back, datum);
        }

        #[test]
        fn byte_order_matches_value_order(
            a in prop::collection::vec(any::<u8>(), 0..40),
            b in prop::collection::vec(any::<u8>(), 0..40),
        ) {
            let ty = FieldType::new(TypeKind::Bytes);
            let ea = encoded(&Datum::Bytes(a.clone()), &ty);
            let eb = encoded(&Datum::Bytes(b.clone()), &ty);
            prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
        }

        #[test]
        fn int_order_matches_value_order(a in any::<i64>(), b in any::<i64>()) {
            let ty = FieldType::new(TypeKind::Int);
            let ea = encoded(&Datum::Int(a), &ty);
            let eb = encoded(&Datum::Int(b), &ty);
            prop_assert_eq!(ea.cmp(&eb), a.cmp(&b));
        }
    }
}
