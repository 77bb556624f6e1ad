//! Persistence for `ActionRecord`s.
//!
//! `RecordStore` is a document-style contract: records are keyed by action
//! name, merged field-wise, and created on first write. Every mutating call is
//! atomic per name; `update` additionally lets the caller inspect the current
//! record and reject the write, which is how the orchestrator performs its
//! check-and-set when a run starts.

pub mod db;
pub mod memory;

pub use db::RedbRecordStore;
pub use memory::MemoryRecordStore;

use crate::error::Result;
use crate::record::{ActionRecord, RecordPatch};

pub trait RecordStore: Send + Sync {
    /// The stored record for `name`, or the default record if none exists.
    fn get(&self, name: &str) -> Result<ActionRecord>;

    /// Atomically read the record for `name`, pass it to `f`, and merge the
    /// returned patch. If `f` fails nothing is written and its error is
    /// returned unchanged.
    fn update(
        &self,
        name: &str,
        f: &mut dyn FnMut(&ActionRecord) -> Result<RecordPatch>,
    ) -> Result<ActionRecord>;

    /// Every stored record, in no particular order.
    fn list(&self) -> Result<Vec<ActionRecord>>;

    /// Merge `patch` into the record for `name`, creating it if absent.
    fn upsert(&self, name: &str, patch: &RecordPatch) -> Result<ActionRecord> {
        self.update(name, &mut |_| Ok(patch.clone()))
    }
}
