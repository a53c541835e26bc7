use core::fmt;

/// The value domain of a column, without any encoding concerns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    Uint,
    /// IEEE-754 double.
    Float,
    /// Raw byte string, compared bytewise.
    Bytes,
    /// UTF-8 string, compared per its collation.
    Str,
    /// Microsecond-precision point in time, stored in UTC and
    /// presented in the session timezone.
    Time,
}

/// How string values order and compare.
///
/// Only meaningful for [`TypeKind::Str`]; other kinds ignore it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Collation {
    /// Bytewise comparison. The encoded sort key is the value itself,
    /// so a key-only index encoding is lossless.
    #[default]
    Binary,
    /// Case-insensitive comparison. The sort key folds case, which loses
    /// the original spelling; index entries for such columns must carry
    /// the original in their value payload.
    GeneralCi,
}

impl Collation {
    /// The memcomparable sort key of `s` under this collation.
    pub fn sort_key(self, s: &str) -> Vec<u8> {
        match self {
            Collation::Binary => s.as_bytes().to_vec(),
            Collation::GeneralCi => s.to_lowercase().into_bytes(),
        }
    }
}

/// A column's type together with its collation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: TypeKind,
    pub collation: Collation,
}

impl FieldType {
    pub const fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            collation: Collation::Binary,
        }
    }

    pub const fn str_with(collation: Collation) -> Self {
        Self {
            kind: TypeKind::Str,
            collation,
        }
    }

    /// Whether an index key alone cannot reconstruct a value of this type,
    /// so index entries must carry restored data in their value payload.
    pub fn needs_restored_data(&self) -> bool {
        self.kind == TypeKind::Str && self.collation != Collation::Binary
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.collation) {
            (TypeKind::Str, Collation::GeneralCi) => write!(f, "str/general_ci"),
            (kind, _) => write!(f, "{kind:?}"),
        }
    }
}
