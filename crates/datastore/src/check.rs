//! The write-path mutation consistency check.
//!
//! After a statement stages its row and index mutations, this pass
//! re-derives the logical values from the staged bytes and verifies they
//! agree with the logical row the executor supplied. It checks one
//! direction only: every *staged* mutation must decode back to the
//! logical row (soundness). It does not verify that every *expected*
//! mutation was staged — that would re-implement the encoder's mutation
//! generation and turn encoder/checker drift into false positives.

use crate::buffer::Checkpoint;
use crate::column_maps::ColumnMaps;
use crate::error::{CheckError, Result};
use crate::mutation::{classify_mutations, IndexMutation, IndexOp, RowMutation};
use crate::txn::{ConsistencyCheck, MutTxn};
use chrono::FixedOffset;
use core::cmp::Ordering;
use shale_codec::index::decode_index_values;
use shale_codec::{row, Datum, HandleMode};
use shale_schema::TableInfo;

/// Verifies that the mutations staged since `since` agree with the
/// logical row being inserted and/or removed.
///
/// Returns success without decoding anything when the table is
/// partitioned (physical routing breaks the key-shape assumptions), when
/// `since` is `None` (the buffer has no staging support), or when the
/// transaction has the check disabled. Any error returned is fatal; the
/// caller is expected to abort rather than recover.
pub fn check_data_consistency(
    txn: &mut MutTxn,
    table: &TableInfo,
    insert_row: Option<&[Datum]>,
    remove_row: Option<&[Datum]>,
    since: Option<Checkpoint>,
) -> Result<()> {
    if table.partitioned {
        return Ok(());
    }
    let Some(since) = since else {
        return Ok(());
    };
    if txn.consistency_check() == ConsistencyCheck::Off {
        return Ok(());
    }

    let maps = txn.column_maps(table);
    let tz = txn.timezone();
    let (index_muts, row_mut) = classify_mutations(txn.buffer(), since, table.id)?;
    if let Some(row_mut) = &row_mut {
        check_row_insertion(insert_row, row_mut, &maps, tz)?;
    }
    check_index_mutations(insert_row, remove_row, &index_muts, &maps, tz)
}

/// Decodes the staged row value and compares every column it carries
/// against the logical row.
///
/// A pure deletion has no logical insert row and nothing to validate.
/// The decoded value may cover a subset of the table's columns; only the
/// columns present are compared.
fn check_row_insertion(
    insert_row: Option<&[Datum]>,
    row_mut: &RowMutation,
    maps: &ColumnMaps,
    tz: FixedOffset,
) -> Result<()> {
    let Some(logical) = insert_row else {
        return Ok(());
    };
    let decoded = row::decode_row(&row_mut.value, &maps.col_types, tz)
        .map_err(|e| CheckError::decode(&row_mut.key, e))?;
    for (col_id, decoded_datum) in decoded {
        let info = maps
            .col_infos
            .get(&col_id)
            .ok_or(CheckError::ColumnNotFound(col_id))?;
        let expected = logical.get(info.offset).ok_or(CheckError::LogicalRowTooShort {
            col: col_id,
            offset: info.offset,
            len: logical.len(),
        })?;
        if expected.compare(&decoded_datum) != Some(Ordering::Equal) {
            log::error!(
                "inconsistent row mutation for handle {}: column {} decodes to {:?}, logical row holds {:?}",
                row_mut.handle,
                col_id,
                decoded_datum,
                expected,
            );
            return Err(CheckError::InconsistentRow {
                col: col_id,
                expected: expected.clone(),
                decoded: decoded_datum,
            });
        }
    }
    Ok(())
}

/// Decodes every staged index mutation and compares its column values,
/// after prefix truncation of both sides, against the logical row for
/// its direction: insertions against `insert_row`, deletions against
/// `remove_row`.
fn check_index_mutations(
    insert_row: Option<&[Datum]>,
    remove_row: Option<&[Datum]>,
    index_muts: &[IndexMutation],
    maps: &ColumnMaps,
    tz: FixedOffset,
) -> Result<()> {
    for m in index_muts {
        let index = maps
            .index_infos
            .get(&m.index_id)
            .ok_or(CheckError::IndexNotFound(m.index_id))?;
        let layout = maps
            .index_layouts
            .get(&m.index_id)
            .ok_or(CheckError::IndexNotFound(m.index_id))?;

        // A deletion carries no value payload. If the key encoding of
        // any indexed column is lossy, the original values cannot be
        // reconstructed, so no claim is made about this mutation.
        if m.op == IndexOp::Delete && layout.iter().any(|c| c.restored) {
            log::trace!(
                "skipping delete mutation of index {}: originals not reconstructible from the key",
                m.index_id
            );
            continue;
        }

        let (logical, dir) = match &m.op {
            IndexOp::Put(_) => (insert_row, "an insertion"),
            IndexOp::Delete => (remove_row, "a deletion"),
        };
        let logical = logical.ok_or(CheckError::MissingLogicalRow {
            index: m.index_id,
            dir,
        })?;

        let raws = decode_index_values(&m.key, m.payload(), layout, HandleMode::NotNeeded)
            .map_err(|e| CheckError::decode(&m.key, e))?;

        for ((raw, meta), icol) in raws.into_iter().zip(layout.iter()).zip(&index.columns) {
            let col = maps
                .col_infos
                .get(&meta.col_id)
                .ok_or(CheckError::ColumnNotFound(meta.col_id))?;
            let decoded = Datum::from_raw(raw, &col.ty, tz).map_err(|e| CheckError::decode(&m.key, e))?;
            let expected = logical.get(col.offset).ok_or(CheckError::LogicalRowTooShort {
                col: col.id,
                offset: col.offset,
                len: logical.len(),
            })?;

            let expected = expected.truncated_to_prefix(icol.prefix_len);
            let decoded = decoded.truncated_to_prefix(icol.prefix_len);
            if expected.compare(&decoded) != Some(Ordering::Equal) {
                log::error!(
                    "inconsistent index mutation for index {}: column {} decodes to {:?}, logical row holds {:?}",
                    m.index_id,
                    col.id,
                    decoded,
                    expected,
                );
                return Err(CheckError::InconsistentIndex {
                    index: m.index_id,
                    col: col.id,
                    expected: expected.into_owned(),
                    decoded: decoded.into_owned(),
                });
            }
        }
    }
    Ok(())
}
