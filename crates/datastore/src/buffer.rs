//! The transaction's staged-mutation buffer.
//!
//! Mutations accumulate in staging order and are never reordered; a
//! [`Checkpoint`] marks a position so later passes can inspect only the
//! mutations one statement staged. Some embedding contexts provide a
//! buffer without staging support, in which case [`MemBuffer::checkpoint`]
//! yields `None` and checkpoint-scoped passes degrade to no-ops.

use bitflags::bitflags;

bitflags! {
    /// Opaque per-mutation hints set by the write path.
    ///
    /// The consistency checker carries these through untouched; only the
    /// commit pipeline interprets them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyFlags: u8 {
        /// The writer presumes the key does not yet exist.
        const PRESUME_NOT_EXISTS = 0b001;
        /// Commit must assert the key exists in the store.
        const ASSERT_EXISTS = 0b010;
        /// Commit must assert the key does not exist in the store.
        const ASSERT_NOT_EXISTS = 0b100;
    }
}

/// One pending write in the transaction's staging buffer.
///
/// An empty `value` is meaningful: it marks a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub key: Vec<u8>,
    pub flags: KeyFlags,
    pub value: Vec<u8>,
}

/// A position in the staging buffer; mutations at or after it are
/// "staged since" the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// In-memory staged-mutation buffer owned by one transaction.
#[derive(Debug, Default)]
pub struct MemBuffer {
    entries: Vec<Mutation>,
    staging: bool,
}

impl MemBuffer {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            staging: true,
        }
    }

    /// A buffer for embedding contexts without staging support.
    pub fn without_staging() -> Self {
        Self {
            entries: Vec::new(),
            staging: false,
        }
    }

    /// Marks the current position, or `None` if staging is unsupported.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.staging.then_some(Checkpoint(self.entries.len()))
    }

    pub fn stage(&mut self, key: Vec<u8>, flags: KeyFlags, value: Vec<u8>) {
        self.entries.push(Mutation { key, flags, value });
    }

    /// Read-only visit of every mutation staged since `since`, in
    /// staging order.
    pub fn for_each_since<E>(
        &self,
        since: Checkpoint,
        mut visit: impl FnMut(&Mutation) -> Result<(), E>,
    ) -> Result<(), E> {
        self.entries[since.0.min(self.entries.len())..]
            .iter()
            .try_for_each(&mut visit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
