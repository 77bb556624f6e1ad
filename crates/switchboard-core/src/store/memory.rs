use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SwitchboardError};
use crate::record::{ActionRecord, RecordPatch};

use super::RecordStore;

/// Process-local record store. Records vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, ActionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ActionRecord>>> {
        self.records
            .lock()
            .map_err(|_| SwitchboardError::Store("record map lock poisoned".into()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, name: &str) -> Result<ActionRecord> {
        Ok(self
            .lock()?
            .get(name)
            .cloned()
            .unwrap_or_else(|| ActionRecord::new(name)))
    }

    fn update(
        &self,
        name: &str,
        f: &mut dyn FnMut(&ActionRecord) -> Result<RecordPatch>,
    ) -> Result<ActionRecord> {
        let mut records = self.lock()?;
        let mut record = records
            .get(name)
            .cloned()
            .unwrap_or_else(|| ActionRecord::new(name));
        let patch = f(&record)?;
        record.apply(&patch);
        records.insert(name.to_string(), record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ActionRecord>> {
        Ok(self.lock()?.values().cloned().collect())
    }
}
