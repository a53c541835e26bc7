//! Per-table decoding maps, memoized per transaction.
//!
//! Checking one statement's mutations needs the same handful of schema
//! lookups for every mutation; with many statements per transaction that
//! goes quadratic against the catalog. [`ColumnMaps`] is built from the
//! table schema once per (transaction, table) and held on the
//! transaction (see [`MutTxn::column_maps`](crate::MutTxn::column_maps)).

use shale_codec::IndexRowCol;
use shale_primitives::map::IntMap;
use shale_primitives::{ColId, IndexId};
use shale_schema::{ColumnInfo, FieldType, IndexInfo, TableInfo};
use smallvec::SmallVec;

/// Per-index decoding descriptors in index-column order.
pub type IndexLayout = SmallVec<[IndexRowCol; 4]>;

/// Everything the checker needs to decode one table's mutations,
/// keyed by the ids that appear in the encoded bytes.
#[derive(Debug, Clone)]
pub struct ColumnMaps {
    pub col_infos: IntMap<ColId, ColumnInfo>,
    pub col_types: IntMap<ColId, FieldType>,
    pub index_infos: IntMap<IndexId, IndexInfo>,
    pub index_layouts: IntMap<IndexId, IndexLayout>,
}

impl ColumnMaps {
    /// Builds the maps from `table`'s schema.
    ///
    /// The primary index of a clustered-handle table is excluded: the
    /// primary key lives in the row key itself, so no separate physical
    /// index mutation exists to check against it.
    pub fn build(table: &TableInfo) -> Self {
        let mut col_infos = IntMap::default();
        let mut col_types = IntMap::default();
        for col in &table.columns {
            col_infos.insert(col.id, col.clone());
            col_types.insert(col.id, col.ty);
        }

        let mut index_infos = IntMap::default();
        let mut index_layouts = IntMap::default();
        for index in &table.indexes {
            if index.primary && table.clustered_handle {
                continue;
            }
            let layout = index
                .columns
                .iter()
                .map(|ic| {
                    let col = &table.columns[ic.col_offset];
                    IndexRowCol {
                        col_id: col.id,
                        restored: col.ty.needs_restored_data(),
                    }
                })
                .collect();
            index_infos.insert(index.id, index.clone());
            index_layouts.insert(index.id, layout);
        }

        Self {
            col_infos,
            col_types,
            index_infos,
            index_layouts,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shale_primitives::TableId;
    use shale_schema::{Collation, IndexColumn, TypeKind};

    fn col(id: u32, offset: usize, name: &str, ty: FieldType) -> ColumnInfo {
        ColumnInfo {
            id: ColId(id),
            offset,
            name: name.into(),
            ty,
        }
    }

    fn index(id: u32, primary: bool, cols: &[usize]) -> IndexInfo {
        IndexInfo {
            id: IndexId(id),
            name: format!("idx{id}").into(),
            primary,
            unique: primary,
            columns: cols.iter().map(|&o| IndexColumn::whole(o)).collect(),
        }
    }

    #[test]
    fn maps_cover_all_columns_and_indexes() {
        let table = TableInfo::new(
            TableId(1),
            "t",
            vec![
                col(10, 0, "a", FieldType::new(TypeKind::Int)),
                col(11, 1, "b", FieldType::str_with(Collation::GeneralCi)),
            ],
            vec![index(1, false, &[0]), index(2, false, &[1, 0])],
        );
        let maps = ColumnMaps::build(&table);
        assert_eq!(maps.col_infos.len(), 2);
        assert_eq!(maps.col_types.get(&ColId(11)), Some(&FieldType::str_with(Collation::GeneralCi)));
        assert_eq!(maps.index_infos.len(), 2);
        let layout = &maps.index_layouts[&IndexId(2)];
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0], IndexRowCol { col_id: ColId(11), restored: true });
        assert_eq!(layout[1], IndexRowCol { col_id: ColId(10), restored: false });
    }

    #[test]
    fn clustered_primary_index_is_excluded() {
        let table = TableInfo::new(
            TableId(1),
            "t",
            vec![col(10, 0, "a", FieldType::new(TypeKind::Int))],
            vec![index(1, true, &[0]), index(2, false, &[0])],
        )
        .with_clustered_handle(true);
        let maps = ColumnMaps::build(&table);
        assert!(!maps.index_infos.contains_key(&IndexId(1)));
        assert!(maps.index_infos.contains_key(&IndexId(2)));
    }

    #[test]
    fn non_clustered_primary_index_is_kept() {
        let table = TableInfo::new(
            TableId(1),
            "t",
            vec![col(10, 0, "a", FieldType::new(TypeKind::Int))],
            vec![index(1, true, &[0])],
        );
        let maps = ColumnMaps::build(&table);
        assert!(maps.index_infos.contains_key(&IndexId(1)));
    }
}
