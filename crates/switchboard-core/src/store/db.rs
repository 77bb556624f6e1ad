//! Durable record store backed by redb.
//!
//! One `ACTION_RECORDS` table keyed by action name, values are JSON-encoded
//! `ActionRecord`s. redb admits a single write transaction at a time, so a
//! read-modify-write performed inside one write transaction is atomic with
//! respect to every other writer.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{Result, SwitchboardError};
use crate::record::{ActionRecord, RecordPatch};

use super::RecordStore;

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: action name. Value: JSON-encoded ActionRecord.
const ACTION_RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("action_records");

fn store_err(e: impl Display) -> SwitchboardError {
    SwitchboardError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbRecordStore
// ---------------------------------------------------------------------------

pub struct RedbRecordStore {
    db: Database,
}

impl RedbRecordStore {
    /// Open or create the database at `path`, creating parent directories and
    /// the `ACTION_RECORDS` table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(ACTION_RECORDS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }
}

impl RecordStore for RedbRecordStore {
    fn get(&self, name: &str) -> Result<ActionRecord> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(ACTION_RECORDS).map_err(store_err)?;
        let record = match table.get(name).map_err(store_err)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => ActionRecord::new(name),
        };
        Ok(record)
    }

    fn update(
        &self,
        name: &str,
        f: &mut dyn FnMut(&ActionRecord) -> Result<RecordPatch>,
    ) -> Result<ActionRecord> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let outcome = {
            let mut table = wt.open_table(ACTION_RECORDS).map_err(store_err)?;
            let current: ActionRecord = match table.get(name).map_err(store_err)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => ActionRecord::new(name),
            };
            match f(&current) {
                Ok(patch) => {
                    let mut record = current;
                    record.apply(&patch);
                    let bytes = serde_json::to_vec(&record)?;
                    table
                        .insert(name, bytes.as_slice())
                        .map_err(store_err)?;
                    Ok(record)
                }
                Err(e) => Err(e),
            }
        };
        match outcome {
            Ok(record) => {
                wt.commit().map_err(store_err)?;
                Ok(record)
            }
            Err(e) => {
                wt.abort().map_err(store_err)?;
                Err(e)
            }
        }
    }

    fn list(&self) -> Result<Vec<ActionRecord>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(ACTION_RECORDS).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, v) = entry.map_err(store_err)?;
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
