//! Record store contract and the in-memory reference store.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::{
    error::StoreError,
    record::{Record, RecordId},
};

/// Persistent storage for records, consulted only by the collection
/// emulators. Calls are synchronous and never retried.
pub trait RecordStore {
    /// Fetch the record of type `record_type` with identity `id`.
    fn get(&self, record_type: &str, id: RecordId) -> Result<Record, StoreError>;

    /// Insert `record`, assigning an identity when it has none, and return
    /// the stored record.
    fn create(&mut self, record: &Record) -> Result<Record, StoreError>;

    /// Overwrite an already persisted record.
    fn update(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Whether a record of type `record_type` with identity `id` is
    /// persisted. The default probes with [`get`](Self::get).
    fn contains(&self, record_type: &str, id: RecordId) -> Result<bool, StoreError> {
        match self.get(record_type, id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// [`RecordStore`] keeping detached copies of records in memory, with
/// sequential identities per record type.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<String, BTreeMap<RecordId, Record>>,
    last_ids: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of `record_type`.
    pub fn len(&self, record_type: &str) -> usize {
        self.tables.get(record_type).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, record_type: &str, id: RecordId) -> Result<Record, StoreError> {
        self.tables
            .get(record_type)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                record_type: record_type.to_string(),
                id,
            })
    }

    fn create(&mut self, record: &Record) -> Result<Record, StoreError> {
        let name = record.type_name().to_string();
        let last = self.last_ids.entry(name.clone()).or_insert(0);
        let id = match record.id() {
            Some(id) => {
                *last = (*last).max(id.0);
                id
            }
            None => {
                *last += 1;
                RecordId(*last)
            }
        };

        let mut created = record.clone();
        created.set_id(id)?;
        self.tables
            .entry(name)
            .or_default()
            .insert(id, created.detached());
        debug!(record_type = created.type_name(), %id, "created record");
        Ok(created)
    }

    fn contains(&self, record_type: &str, id: RecordId) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .get(record_type)
            .is_some_and(|table| table.contains_key(&id)))
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        let id = record.id().ok_or_else(|| StoreError::MissingIdentity {
            record_type: record.type_name().to_string(),
        })?;
        let slot = self
            .tables
            .get_mut(record.type_name())
            .and_then(|table| table.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound {
                record_type: record.type_name().to_string(),
                id,
            })?;
        *slot = record.detached();
        debug!(record_type = record.type_name(), %id, "updated record");
        Ok(())
    }
}
