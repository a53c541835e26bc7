use crate::FieldType;
use shale_primitives::{ColId, IndexId, TableId};
use smallvec::SmallVec;

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub id: ColId,
    /// Position of the column in the table's column list.
    /// Logical rows are indexed by this offset, not by `id`.
    pub offset: usize,
    pub name: Box<str>,
    pub ty: FieldType,
}

/// One column of an index, referring back into the table's column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumn {
    /// Offset of the indexed column in the owning table's column list.
    pub col_offset: usize,
    /// For prefix indexes, how many units of the value are indexed.
    /// `None` indexes the whole value.
    pub prefix_len: Option<usize>,
}

impl IndexColumn {
    pub const fn whole(col_offset: usize) -> Self {
        Self {
            col_offset,
            prefix_len: None,
        }
    }

    pub const fn prefix(col_offset: usize, len: usize) -> Self {
        Self {
            col_offset,
            prefix_len: Some(len),
        }
    }
}

/// A secondary (or primary) index over a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub id: IndexId,
    pub name: Box<str>,
    pub primary: bool,
    pub unique: bool,
    pub columns: SmallVec<[IndexColumn; 4]>,
}

impl IndexInfo {
    /// Whether any indexed column's key encoding is lossy, so entries of
    /// this index carry restored data in their value payload.
    pub fn needs_restored_data(&self, table: &TableInfo) -> bool {
        self.columns
            .iter()
            .any(|ic| table.columns[ic.col_offset].ty.needs_restored_data())
    }
}

/// A table as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: TableId,
    pub name: Box<str>,
    /// Ordered column list; `columns[i].offset == i`.
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    /// Partitioned tables route rows to physical partitions,
    /// so key shapes differ from the single-table layout.
    pub partitioned: bool,
    /// Whether the primary key is embedded in the row key itself
    /// (clustered / common handle), leaving no separate physical
    /// primary-index entry.
    pub clustered_handle: bool,
}

impl TableInfo {
    /// A plain, unpartitioned table with integer row ids.
    pub fn new(id: TableId, name: &str, columns: Vec<ColumnInfo>, indexes: Vec<IndexInfo>) -> Self {
        debug_assert!(columns.iter().enumerate().all(|(i, c)| c.offset == i));
        Self {
            id,
            name: name.into(),
            columns,
            indexes,
            partitioned: false,
            clustered_handle: false,
        }
    }

    pub fn with_partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    pub fn with_clustered_handle(mut self, clustered: bool) -> Self {
        self.clustered_handle = clustered;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| &*c.name == name)
    }
}
