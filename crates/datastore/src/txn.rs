use crate::buffer::MemBuffer;
use crate::column_maps::ColumnMaps;
use chrono::{FixedOffset, Offset, Utc};
use shale_primitives::map::IntMap;
use shale_primitives::TableId;
use shale_schema::TableInfo;
use std::rc::Rc;

/// Whether the write path runs the mutation consistency check.
///
/// Mandatory skips (partitioned tables, buffers without staging support)
/// apply regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistencyCheck {
    Off,
    #[default]
    On,
}

/// A mutable transaction: the staged-mutation buffer plus the
/// transaction-scoped scratch state that lives exactly as long as it.
///
/// The transaction is exclusively owned by the single logical flow
/// executing the statement; nothing here is shared across threads or
/// across transactions.
pub struct MutTxn {
    buf: MemBuffer,
    tz: FixedOffset,
    check: ConsistencyCheck,
    /// Per-table decoding maps, built lazily at most once per table and
    /// reused by every consistency check within this transaction.
    column_maps: IntMap<TableId, Rc<ColumnMaps>>,
}

impl MutTxn {
    /// Begins a transaction with a UTC session timezone.
    pub fn begin() -> Self {
        Self::with_buffer(MemBuffer::new())
    }

    pub fn with_buffer(buf: MemBuffer) -> Self {
        Self {
            buf,
            tz: Utc.fix(),
            check: ConsistencyCheck::default(),
            column_maps: IntMap::default(),
        }
    }

    pub fn with_timezone(mut self, tz: FixedOffset) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_consistency_check(mut self, check: ConsistencyCheck) -> Self {
        self.check = check;
        self
    }

    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    pub fn consistency_check(&self) -> ConsistencyCheck {
        self.check
    }

    pub fn buffer(&self) -> &MemBuffer {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut MemBuffer {
        &mut self.buf
    }

    /// The decoding maps for `table`, built on first use and memoized
    /// for the rest of this transaction.
    pub fn column_maps(&mut self, table: &TableInfo) -> Rc<ColumnMaps> {
        if let Some(maps) = self.column_maps.get(&table.id) {
            return Rc::clone(maps);
        }
        log::debug!("building column maps for table {} (`{}`)", table.id, table.name);
        let maps = Rc::new(ColumnMaps::build(table));
        self.column_maps.insert(table.id, Rc::clone(&maps));
        maps
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shale_primitives::{ColId, TableId};
    use shale_schema::{ColumnInfo, FieldType, TypeKind};

    fn table(id: u32) -> TableInfo {
        TableInfo::new(
            TableId(id),
            "t",
            vec![ColumnInfo {
                id: ColId(1),
                offset: 0,
                name: "a".into(),
                ty: FieldType::new(TypeKind::Int),
            }],
            vec![],
        )
    }

    #[test]
    fn column_maps_are_built_once_per_table() {
        let mut txn = MutTxn::begin();
        let t = table(1);
        let first = txn.column_maps(&t);
        let second = txn.column_maps(&t);
        assert!(Rc::ptr_eq(&first, &second));
        // A different table gets its own maps.
        let other = txn.column_maps(&table(2));
        assert!(!Rc::ptr_eq(&first, &other));
    }

    #[test]
    fn fresh_transaction_rebuilds_the_maps() {
        let t = table(1);
        let mut txn = MutTxn::begin();
        let first = txn.column_maps(&t);
        let mut txn2 = MutTxn::begin();
        let rebuilt = txn2.column_maps(&t);
        assert!(!Rc::ptr_eq(&first, &rebuilt));
    }
}
