//! Binary codecs for the shale storage layer.
//!
//! Two independent encodings live here:
//!
//! - the **key codec** ([`keycode`]): memcomparable encoding used inside
//!   row and index keys, where byte order must equal value order;
//! - the **row codec** ([`row`]): column-ID keyed value encoding used in
//!   row values and in the restored-data payload of index values.
//!
//! [`index`] composes both into the physical key/value layout of row and
//! index records. [`Datum`] is the decoded value type shared by all of
//! them, with the standard comparator and prefix truncation used by the
//! write-path consistency checker.

mod datum;
mod error;
pub mod index;
pub mod keycode;
pub mod row;
mod valcode;

pub use datum::{Datum, RawDatum};
pub use error::{DecodeError, EncodeError};
pub use index::{HandleMode, IndexRowCol};
