//! Storage half of the emulated collections.
//!
//! A repeated-message or message-map field has no native representation in
//! the record model. Its members are ordinary records of the related type;
//! which ones belong to the collection (and in which order, or under which
//! key) is kept in the hidden auxiliary index next to it. The in-memory
//! collection is authoritative once loaded or assigned; the index is only
//! rewritten by [`save_collection`].

use tracing::debug;

use crate::{
    error::StoreError,
    index::AuxiliaryIndex,
    record::{Record, RecordId},
    record_type::{RecordField, index_field_name},
    store::RecordStore,
    value::Value,
};

fn collection_field(record: &Record, field: &str) -> Result<RecordField, StoreError> {
    record
        .record_type()
        .field(field)
        .filter(|f| f.kind.is_emulated_collection() && f.related.is_some())
        .cloned()
        .ok_or_else(|| StoreError::NotACollection {
            record_type: record.type_name().to_string(),
            field: field.to_string(),
        })
}

fn invalid_index(record: &Record, field: &str, source: serde_json::Error) -> StoreError {
    StoreError::InvalidIndex {
        record_type: record.type_name().to_string(),
        field: index_field_name(field),
        source,
    }
}

/// Materialize the collection `field` from its index, resolving every
/// identifier against the store. A collection that is already loaded is
/// left untouched.
pub fn load_collection(
    record: &mut Record,
    field: &str,
    store: &dyn RecordStore,
) -> Result<(), StoreError> {
    if record.is_loaded(field) {
        return Ok(());
    }
    let def = collection_field(record, field)?;
    let target = def.related.as_deref().unwrap_or_default();
    let stored = record.get(&index_field_name(field))?;
    let index =
        AuxiliaryIndex::decode(def.kind, stored).map_err(|e| invalid_index(record, field, e))?;

    let value = match index {
        AuxiliaryIndex::List(ids) => Value::RecordList(
            ids.into_iter()
                .map(|id| store.get(target, id))
                .collect::<Result<_, _>>()?,
        ),
        AuxiliaryIndex::Map(entries) => Value::RecordMap(
            entries
                .into_iter()
                .map(|(key, id)| store.get(target, id).map(|r| (key, r)))
                .collect::<Result<_, _>>()?,
        ),
    };
    debug!(
        record_type = record.type_name(),
        field,
        related = target,
        "loaded emulated collection"
    );
    record.set(field, value)?;
    Ok(())
}

/// Load every emulated collection of `record`.
pub fn load_collections(record: &mut Record, store: &dyn RecordStore) -> Result<(), StoreError> {
    let names: Vec<String> = record
        .record_type()
        .emulated_collections()
        .map(|f| f.name.clone())
        .collect();
    for name in names {
        load_collection(record, &name, store)?;
    }
    Ok(())
}

fn persist_member(member: &mut Record, store: &mut dyn RecordStore) -> Result<RecordId, StoreError> {
    save_record(member, store)?;
    member.id().ok_or_else(|| StoreError::MissingIdentity {
        record_type: member.type_name().to_string(),
    })
}

/// Persist every member of the collection `field` with [`save_record`] and
/// rewrite its index from the in-memory collection. Does nothing if the
/// collection was never loaded or assigned. The owning record itself is not
/// persisted.
pub fn save_collection(
    record: &mut Record,
    field: &str,
    store: &mut dyn RecordStore,
) -> Result<(), StoreError> {
    let def = collection_field(record, field)?;
    if !record.is_loaded(field) {
        return Ok(());
    }

    let index = match record.value_mut(field) {
        Some(Value::RecordList(members)) => AuxiliaryIndex::List(
            members
                .iter_mut()
                .map(|m| persist_member(m, store))
                .collect::<Result<_, _>>()?,
        ),
        Some(Value::RecordMap(entries)) => AuxiliaryIndex::Map(
            entries
                .iter_mut()
                .map(|(key, m)| persist_member(m, store).map(|id| (key.clone(), id)))
                .collect::<Result<_, _>>()?,
        ),
        _ => AuxiliaryIndex::empty(def.kind),
    };

    let encoded = index.encode().map_err(|e| invalid_index(record, field, e))?;
    debug!(
        record_type = record.type_name(),
        field,
        members = index.len(),
        "rewrote auxiliary index"
    );
    record.set_index(&index_field_name(field), encoded)?;
    Ok(())
}

/// Save every loaded emulated collection of `record`, then persist the
/// record: updated when the store already holds its identity, created
/// otherwise (keeping an identity it already carries).
pub fn save_record(record: &mut Record, store: &mut dyn RecordStore) -> Result<(), StoreError> {
    let names: Vec<String> = record
        .record_type()
        .emulated_collections()
        .map(|f| f.name.clone())
        .collect();
    for name in &names {
        save_collection(record, name, store)?;
    }

    match record.id() {
        Some(id) if store.contains(record.type_name(), id)? => store.update(record),
        _ => {
            let created = store.create(record)?;
            if let Some(id) = created.id() {
                record.set_id(id)?;
            }
            Ok(())
        }
    }
}
