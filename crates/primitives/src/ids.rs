//! Provides identifiers such as `TableId`.
use core::fmt;
use nohash_hasher::IsEnabled;

/// Identifies a table in the schema catalog.
///
/// Also the leading component of every row and index key,
/// so mutations staged for different tables can be told apart
/// without consulting the catalog.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct TableId(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ColId(pub u32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct IndexId(pub u32);

macro_rules! storage_id {
    ($name:ident) => {
        impl $name {
            pub fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }
        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0 as u64
            }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        /// The id is already as good as a hash, so no need to hash again.
        impl IsEnabled for $name {}
    };
}
storage_id!(TableId);
storage_id!(ColId);
storage_id!(IndexId);

/// The unique physical row identifier encoded in row and index keys.
///
/// For tables with a clustered (common) handle this is derived from the
/// primary key; otherwise it is allocated by the row id sequence.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Handle(pub i64);

crate::static_assert_size!(Handle, 8);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_display_as_raw_numbers() {
        assert_eq!(TableId(7).to_string(), "7");
        assert_eq!(ColId(0).to_string(), "0");
        assert_eq!(Handle(-3).to_string(), "-3");
    }

    #[test]
    fn ids_widen_losslessly() {
        assert_eq!(u64::from(TableId(u32::MAX)), u32::MAX as u64);
        assert_eq!(IndexId(9).idx(), 9);
    }
}
