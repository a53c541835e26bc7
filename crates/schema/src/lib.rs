//! Schema descriptors for the shale storage layer.
//!
//! Everything in this crate is a plain description of a table as the
//! catalog sees it: columns with their field types, indexes with their
//! indexed-column lists, and the table-level layout flags. The storage
//! layer consumes these read-only; nothing here touches bytes.

mod field_type;
mod schema;

pub use field_type::{Collation, FieldType, TypeKind};
pub use schema::{ColumnInfo, IndexColumn, IndexInfo, TableInfo};
