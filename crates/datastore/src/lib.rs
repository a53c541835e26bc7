//! Transaction write path and mutation consistency checker.
//!
//! A statement stages one row key/value mutation plus zero or more
//! secondary-index mutations into the transaction's buffer. Before the
//! transaction may proceed to commit, [`check::check_data_consistency`]
//! re-derives the logical values from the staged bytes and verifies they
//! agree with the row the executor believes it just wrote — a last-line
//! guard against encoder bugs and silent corruption, not a user-facing
//! validator.

pub mod buffer;
pub mod check;
pub mod column_maps;
mod error;
pub mod mutation;
mod txn;
pub mod write;

pub use buffer::{Checkpoint, KeyFlags, MemBuffer, Mutation};
pub use check::check_data_consistency;
pub use column_maps::ColumnMaps;
pub use error::{CheckError, Result, WriteError};
pub use txn::{ConsistencyCheck, MutTxn};
pub use write::{stage_delete, stage_insert, stage_update};
