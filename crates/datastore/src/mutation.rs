//! Classification of staged mutations for one table.
//!
//! The buffer holds an undifferentiated stream of key/value pairs; the
//! checker needs them split into at most one row mutation and a list of
//! index mutations, with the insert-vs-delete direction of each index
//! mutation decided exactly once, here, from value emptiness.

use crate::buffer::{Checkpoint, MemBuffer};
use crate::error::{CheckError, Result};
use shale_codec::index as keys;
use shale_primitives::{Handle, IndexId, TableId};

/// The staged primary-row write of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMutation {
    pub key: Vec<u8>,
    pub handle: Handle,
    /// Row-format encoding of the written columns. Never empty: an
    /// empty-value row key is a pure deletion and is not classified as
    /// a row mutation.
    pub value: Vec<u8>,
}

/// The direction of one index mutation, decided from value emptiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    /// An insertion with its value payload.
    Put(Vec<u8>),
    /// A deletion; there is no payload.
    Delete,
}

/// One staged secondary-index write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMutation {
    pub key: Vec<u8>,
    pub index_id: IndexId,
    pub op: IndexOp,
}

impl IndexMutation {
    /// The value payload, if this mutation is an insertion.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.op {
            IndexOp::Put(v) => Some(v),
            IndexOp::Delete => None,
        }
    }
}

/// Partitions the mutations staged since `since` into index mutations
/// (in staging order) and at most one row mutation for `table_id`.
///
/// Mutations for other tables in the same transaction are ignored. A
/// second non-empty row mutation is always a bug: one statement must not
/// stage two conflicting physical writes to the same logical row.
pub fn classify_mutations(
    buf: &MemBuffer,
    since: Checkpoint,
    table_id: TableId,
) -> Result<(Vec<IndexMutation>, Option<RowMutation>)> {
    let mut index_muts = Vec::new();
    let mut row_mut: Option<RowMutation> = None;

    buf.for_each_since(since, |m| {
        if keys::table_id_of_key(&m.key) != Some(table_id) {
            return Ok(());
        }
        if keys::is_row_key(&m.key) {
            if m.value.is_empty() {
                // Pure deletion: no payload to validate against.
                return Ok(());
            }
            if row_mut.is_some() {
                return Err(CheckError::MultipleRowMutations {
                    table: table_id,
                    key: m.key.clone(),
                });
            }
            let handle = keys::row_key_handle(&m.key).map_err(|e| CheckError::decode(&m.key, e))?;
            row_mut = Some(RowMutation {
                key: m.key.clone(),
                handle,
                value: m.value.clone(),
            });
            return Ok(());
        }
        let index_id = keys::index_id_of_key(&m.key).map_err(|e| CheckError::decode(&m.key, e))?;
        let op = if m.value.is_empty() {
            IndexOp::Delete
        } else {
            IndexOp::Put(m.value.clone())
        };
        index_muts.push(IndexMutation {
            key: m.key.clone(),
            index_id,
            op,
        });
        Ok(())
    })?;

    Ok((index_muts, row_mut))
}
