use crate::DecodeError;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use core::cmp::Ordering;
use enum_as_inner::EnumAsInner;
use shale_schema::{FieldType, TypeKind};
use std::borrow::Cow;

/// A decoded column value.
///
/// Values are type erased; the schema's [`FieldType`] decides how bytes
/// become a `Datum` and which pairs of datums are comparable.
///
/// `Time` is wall-clock in the session timezone. The encodings store UTC
/// microseconds, so the session offset participates in every encode and
/// decode of a `Time` value.
#[derive(EnumAsInner, Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Time(NaiveDateTime),
}

/// A value decoded from bytes before the column type is applied.
///
/// The key and row codecs produce these; [`Datum::from_raw`] finishes the
/// job once the column's [`FieldType`] and the session timezone are known.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDatum {
    Null,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bytes(Vec<u8>),
    /// UTC microseconds since the epoch.
    Time(i64),
}

impl RawDatum {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            RawDatum::Null => "null",
            RawDatum::Int(_) => "int",
            RawDatum::Uint(_) => "uint",
            RawDatum::Float(_) => "float",
            RawDatum::Bytes(_) => "bytes",
            RawDatum::Time(_) => "time",
        }
    }
}

impl Datum {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Int(_) => "int",
            Datum::Uint(_) => "uint",
            Datum::Float(_) => "float",
            Datum::Bytes(_) => "bytes",
            Datum::Str(_) => "str",
            Datum::Time(_) => "time",
        }
    }

    /// Finishes decoding a raw value at the column type `ty`.
    ///
    /// String columns arrive as raw bytes; under a binary collation those
    /// bytes are the original value, under a lossy collation the caller
    /// must have substituted restored data beforehand.
    pub fn from_raw(raw: RawDatum, ty: &FieldType, tz: FixedOffset) -> Result<Self, DecodeError> {
        match (raw, ty.kind) {
            (RawDatum::Null, _) => Ok(Datum::Null),
            (RawDatum::Int(v), TypeKind::Int) => Ok(Datum::Int(v)),
            (RawDatum::Uint(v), TypeKind::Uint) => Ok(Datum::Uint(v)),
            (RawDatum::Float(v), TypeKind::Float) => Ok(Datum::Float(v)),
            (RawDatum::Bytes(b), TypeKind::Bytes) => Ok(Datum::Bytes(b)),
            (RawDatum::Bytes(b), TypeKind::Str) => {
                let s = core::str::from_utf8(&b)?;
                Ok(Datum::Str(s.to_owned()))
            }
            (RawDatum::Time(micros), TypeKind::Time) => {
                Ok(Datum::Time(utc_micros_to_wall(micros, tz)?))
            }
            (raw, expected) => Err(DecodeError::TypeMismatch {
                expected,
                found: raw.kind_name(),
            }),
        }
    }

    /// The standard value comparator.
    ///
    /// `None` means the two datums are of incomparable kinds, which the
    /// consistency checker treats the same as a mismatch. Nulls order
    /// before everything, and signed/unsigned integers compare by value.
    pub fn compare(&self, other: &Datum) -> Option<Ordering> {
        use Datum::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Uint(a), Uint(b)) => Some(a.cmp(b)),
            (Int(a), Uint(b)) => Some(cmp_int_uint(*a, *b)),
            (Uint(a), Int(b)) => Some(cmp_int_uint(*b, *a).reverse()),
            (Float(a), Float(b)) => Some(a.total_cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Str(a), Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Truncates to the first `prefix_len` units, mirroring how the
    /// encoder truncates prefix-indexed columns: characters for strings,
    /// bytes for byte strings, a no-op for everything else.
    pub fn truncated_to_prefix(&self, prefix_len: Option<usize>) -> Cow<'_, Datum> {
        let Some(n) = prefix_len else {
            return Cow::Borrowed(self);
        };
        match self {
            Datum::Str(s) => match s.char_indices().nth(n) {
                Some((at, _)) => Cow::Owned(Datum::Str(s[..at].to_owned())),
                None => Cow::Borrowed(self),
            },
            Datum::Bytes(b) if b.len() > n => Cow::Owned(Datum::Bytes(b[..n].to_vec())),
            _ => Cow::Borrowed(self),
        }
    }
}

fn cmp_int_uint(a: i64, b: u64) -> Ordering {
    if a < 0 {
        Ordering::Less
    } else {
        (a as u64).cmp(&b)
    }
}

/// Converts session wall-clock time to the UTC microseconds the encodings store.
pub(crate) fn wall_to_utc_micros(wall: NaiveDateTime, tz: FixedOffset) -> i64 {
    wall.and_utc().timestamp_micros() - i64::from(tz.local_minus_utc()) * 1_000_000
}

/// Converts stored UTC microseconds back to session wall-clock time.
pub(crate) fn utc_micros_to_wall(micros: i64, tz: FixedOffset) -> Result<NaiveDateTime, DecodeError> {
    let utc = DateTime::from_timestamp_micros(micros).ok_or(DecodeError::TimeOutOfRange(micros))?;
    Ok(utc.with_timezone(&tz).naive_local())
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int(v)
    }
}

impl From<u64> for Datum {
    fn from(v: u64) -> Self {
        Datum::Uint(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::Str(v.to_owned())
    }
}

impl From<&[u8]> for Datum {
    fn from(v: &[u8]) -> Self {
        Datum::Bytes(v.to_vec())
    }
}
