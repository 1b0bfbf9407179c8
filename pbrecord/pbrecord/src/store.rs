use pbrecord_core::{RecordId, RecordStore, StoreError, load_collections, save_record};
use pbrecord_protobuf::Mapper;
use prost_reflect::DynamicMessage;

use crate::Error;

/// Fetch a record, load its emulated collections and convert it.
pub fn fetch_message(
    mapper: &Mapper,
    store: &dyn RecordStore,
    record_type: &str,
    id: RecordId,
    depth: Option<i32>,
) -> Result<DynamicMessage, Error> {
    let mut record = store.get(record_type, id)?;
    load_collections(&mut record, store)?;
    Ok(mapper.to_message_with_depth(&record, depth)?)
}

/// Build a record from `message` and persist it together with its
/// emulated collections. Returns the identity the store assigned.
pub fn store_message(
    mapper: &Mapper,
    store: &mut dyn RecordStore,
    record_type: &str,
    message: &DynamicMessage,
) -> Result<RecordId, Error> {
    let mut record = mapper.from_message(record_type, message)?;
    save_record(&mut record, store)?;
    let id = record.id().ok_or_else(|| StoreError::MissingIdentity {
        record_type: record_type.to_string(),
    })?;
    Ok(id)
}
