//! The row write path: encoding a logical row change into staged
//! mutations, then verifying the staged bytes decode back to it.
//!
//! Each operation takes a buffer checkpoint before staging anything, so
//! the consistency check sees exactly the mutations of this one change.

use crate::buffer::KeyFlags;
use crate::check::check_data_consistency;
use crate::error::WriteError;
use crate::txn::MutTxn;
use chrono::FixedOffset;
use shale_codec::index::{encode_index_key, encode_index_value, encode_row_key};
use shale_codec::{row, Datum};
use shale_primitives::Handle;
use shale_schema::{IndexInfo, TableInfo};
use std::borrow::Cow;

/// Stages a full-row insertion and its index entries.
pub fn stage_insert(
    txn: &mut MutTxn,
    table: &TableInfo,
    handle: Handle,
    values: &[Datum],
) -> Result<(), WriteError> {
    check_arity(table, values)?;
    let tz = txn.timezone();
    let since = txn.buffer().checkpoint();

    let entries: Vec<_> = table
        .columns
        .iter()
        .zip(values)
        .map(|(col, v)| (col.id, &col.ty, v))
        .collect();
    let row_value = row::encode_row(&entries, tz)?;
    txn.buffer_mut().stage(
        encode_row_key(table.id, handle),
        KeyFlags::PRESUME_NOT_EXISTS,
        row_value,
    );

    for index in checked_indexes(table) {
        let key = index_entry_key(table, index, values, handle, tz)?;
        let value = index_entry_value(table, index, values, handle, tz)?;
        let flags = if index.unique {
            KeyFlags::ASSERT_NOT_EXISTS
        } else {
            KeyFlags::PRESUME_NOT_EXISTS
        };
        txn.buffer_mut().stage(key, flags, value);
    }

    check_data_consistency(txn, table, Some(values), None, since)?;
    Ok(())
}

/// Stages a full-row deletion: empty values for the row key and every
/// index entry of the old row.
pub fn stage_delete(
    txn: &mut MutTxn,
    table: &TableInfo,
    handle: Handle,
    values: &[Datum],
) -> Result<(), WriteError> {
    check_arity(table, values)?;
    let tz = txn.timezone();
    let since = txn.buffer().checkpoint();

    txn.buffer_mut()
        .stage(encode_row_key(table.id, handle), KeyFlags::ASSERT_EXISTS, Vec::new());
    for index in checked_indexes(table) {
        let key = index_entry_key(table, index, values, handle, tz)?;
        txn.buffer_mut().stage(key, KeyFlags::empty(), Vec::new());
    }

    check_data_consistency(txn, table, None, Some(values), since)?;
    Ok(())
}

/// Stages an in-place update of the row at `handle`.
///
/// The row value is rewritten unconditionally. An index entry is
/// rewritten only when the update changes it: a moved key stages a
/// deletion of the old entry and an insertion of the new one, and a
/// same-key entry whose value payload changed (the restore data of a
/// lossy column tracks spelling the folded key bytes cannot see) is
/// overwritten in place. An entry whose key and value are both
/// unchanged stages nothing.
pub fn stage_update(
    txn: &mut MutTxn,
    table: &TableInfo,
    handle: Handle,
    old_values: &[Datum],
    new_values: &[Datum],
) -> Result<(), WriteError> {
    check_arity(table, old_values)?;
    check_arity(table, new_values)?;
    let tz = txn.timezone();
    let since = txn.buffer().checkpoint();

    let entries: Vec<_> = table
        .columns
        .iter()
        .zip(new_values)
        .map(|(col, v)| (col.id, &col.ty, v))
        .collect();
    let row_value = row::encode_row(&entries, tz)?;
    txn.buffer_mut()
        .stage(encode_row_key(table.id, handle), KeyFlags::empty(), row_value);

    for index in checked_indexes(table) {
        let old_key = index_entry_key(table, index, old_values, handle, tz)?;
        let new_key = index_entry_key(table, index, new_values, handle, tz)?;
        let new_value = index_entry_value(table, index, new_values, handle, tz)?;
        if old_key == new_key {
            let old_value = index_entry_value(table, index, old_values, handle, tz)?;
            if old_value == new_value {
                continue;
            }
            txn.buffer_mut().stage(new_key, KeyFlags::empty(), new_value);
        } else {
            txn.buffer_mut().stage(old_key, KeyFlags::empty(), Vec::new());
            txn.buffer_mut().stage(new_key, KeyFlags::empty(), new_value);
        }
    }

    check_data_consistency(txn, table, Some(new_values), Some(old_values), since)?;
    Ok(())
}

fn check_arity(table: &TableInfo, values: &[Datum]) -> Result<(), WriteError> {
    if values.len() != table.columns.len() {
        return Err(WriteError::RowArity {
            table: table.id,
            len: values.len(),
            expected: table.columns.len(),
        });
    }
    Ok(())
}

/// The indexes that get physical entries: everything except the primary
/// index of a clustered-handle table, which lives in the row key.
fn checked_indexes(table: &TableInfo) -> impl Iterator<Item = &IndexInfo> {
    table
        .indexes
        .iter()
        .filter(move |index| !(index.primary && table.clustered_handle))
}

fn index_entry_key(
    table: &TableInfo,
    index: &IndexInfo,
    values: &[Datum],
    handle: Handle,
    tz: FixedOffset,
) -> Result<Vec<u8>, WriteError> {
    let truncated: Vec<Cow<'_, Datum>> = index
        .columns
        .iter()
        .map(|ic| values[ic.col_offset].truncated_to_prefix(ic.prefix_len))
        .collect();
    let cols: Vec<_> = index
        .columns
        .iter()
        .zip(&truncated)
        .map(|(ic, datum)| (&table.columns[ic.col_offset].ty, datum.as_ref()))
        .collect();
    Ok(encode_index_key(table.id, index.id, &cols, handle, tz)?)
}

fn index_entry_value(
    table: &TableInfo,
    index: &IndexInfo,
    values: &[Datum],
    handle: Handle,
    tz: FixedOffset,
) -> Result<Vec<u8>, WriteError> {
    let restore: Vec<_> = index
        .columns
        .iter()
        .filter_map(|ic| {
            let col = &table.columns[ic.col_offset];
            col.ty
                .needs_restored_data()
                .then(|| (col.id, &col.ty, &values[ic.col_offset]))
        })
        .collect();
    Ok(encode_index_value(
        index.unique.then_some(handle),
        (!restore.is_empty()).then_some(restore.as_slice()),
        tz,
    )?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mutation::{classify_mutations, IndexOp};
    use pretty_assertions::assert_eq;
    use shale_codec::index::decode_index_values;
    use shale_codec::{HandleMode, IndexRowCol, RawDatum};
    use shale_primitives::{ColId, IndexId, TableId};
    use shale_schema::{Collation, ColumnInfo, FieldType, IndexColumn, TypeKind};

    fn table() -> TableInfo {
        TableInfo::new(
            TableId(1),
            "people",
            vec![
                ColumnInfo {
                    id: ColId(1),
                    offset: 0,
                    name: "id".into(),
                    ty: FieldType::new(TypeKind::Int),
                },
                ColumnInfo {
                    id: ColId(2),
                    offset: 1,
                    name: "name".into(),
                    ty: FieldType::str_with(Collation::GeneralCi),
                },
            ],
            vec![
                IndexInfo {
                    id: IndexId(1),
                    name: "uniq_id".into(),
                    primary: false,
                    unique: true,
                    columns: [IndexColumn::whole(0)].into_iter().collect(),
                },
                IndexInfo {
                    id: IndexId(2),
                    name: "name_prefix".into(),
                    primary: false,
                    unique: false,
                    columns: [IndexColumn::prefix(1, 3)].into_iter().collect(),
                },
            ],
        )
    }

    fn row(id: i64, name: &str) -> Vec<Datum> {
        vec![Datum::Int(id), Datum::Str(name.into())]
    }

    #[test]
    fn insert_stages_row_and_index_mutations_and_passes_the_check() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        stage_insert(&mut txn, &t, Handle(7), &row(42, "Miriam")).unwrap();

        let (index_muts, row_mut) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        assert_eq!(row_mut.unwrap().handle, Handle(7));
        assert_eq!(index_muts.len(), 2);
        assert!(index_muts.iter().all(|m| matches!(m.op, IndexOp::Put(_))));
    }

    #[test]
    fn wrong_arity_is_rejected_before_staging() {
        let t = table();
        let mut txn = MutTxn::begin();
        let err = stage_insert(&mut txn, &t, Handle(1), &[Datum::Int(1)]).unwrap_err();
        assert_eq!(
            err,
            WriteError::RowArity {
                table: t.id,
                len: 1,
                expected: 2
            }
        );
        assert!(txn.buffer().is_empty());
    }

    #[test]
    fn delete_stages_empty_values_and_passes_the_check() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        stage_delete(&mut txn, &t, Handle(7), &row(42, "Miriam")).unwrap();

        let (index_muts, row_mut) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        // An empty-value row mutation is a deletion, not a row write.
        assert!(row_mut.is_none());
        assert_eq!(index_muts.len(), 2);
        assert!(index_muts.iter().all(|m| m.op == IndexOp::Delete));
    }

    #[test]
    fn update_rewrites_only_the_moved_index() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        // Same id, new name: the unique id index stays put.
        stage_update(&mut txn, &t, Handle(7), &row(42, "Miriam"), &row(42, "Noor")).unwrap();

        let (index_muts, row_mut) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        assert!(row_mut.is_some());
        assert_eq!(index_muts.len(), 2);
        assert!(index_muts.iter().all(|m| m.index_id == IndexId(2)));
        assert_eq!(index_muts[0].op, IndexOp::Delete);
        assert!(matches!(index_muts[1].op, IndexOp::Put(_)));
    }

    #[test]
    fn update_with_identical_indexed_values_stages_only_the_row() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        stage_update(&mut txn, &t, Handle(7), &row(42, "Mirjam"), &row(42, "Mirjam")).unwrap();

        let (index_muts, row_mut) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        assert!(row_mut.is_some());
        assert!(index_muts.is_empty());
    }

    #[test]
    fn case_only_update_rewrites_the_restore_payload() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        // "Mirjam" and "MIRJAM" fold to the same sort key, so the key
        // bytes do not move; the restore payload still must, or the index
        // would keep handing out the old spelling.
        stage_update(&mut txn, &t, Handle(7), &row(42, "Mirjam"), &row(42, "MIRJAM")).unwrap();

        let (index_muts, row_mut) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        assert!(row_mut.is_some());
        assert_eq!(index_muts.len(), 1);
        let m = &index_muts[0];
        assert_eq!(m.index_id, IndexId(2));

        let layout = [IndexRowCol { col_id: ColId(2), restored: true }];
        let vals =
            decode_index_values(&m.key, m.payload(), &layout, HandleMode::NotNeeded).unwrap();
        assert_eq!(vals, vec![RawDatum::Bytes(b"MIRJAM".to_vec())]);
    }

    #[test]
    fn unique_index_value_carries_the_handle() {
        let t = table();
        let mut txn = MutTxn::begin();
        let cp = txn.buffer().checkpoint().unwrap();
        stage_insert(&mut txn, &t, Handle(9), &row(1, "a")).unwrap();

        let (index_muts, _) = classify_mutations(txn.buffer(), cp, t.id).unwrap();
        let uniq = index_muts.iter().find(|m| m.index_id == IndexId(1)).unwrap();
        let payload = uniq.payload().unwrap();
        assert_eq!(payload[0] & 0b01, 0b01);
    }
}
