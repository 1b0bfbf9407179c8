use std::sync::Arc;

use pbrecord_core::{
    AuxiliaryIndex, MapKey, MemoryStore, Record, RecordField, RecordId, RecordStore, RecordType,
    StorageKind, StoreError, Value, load_collection, load_collections, save_collection,
    save_record,
};

fn song_type() -> Arc<RecordType> {
    Arc::new(RecordType::new(
        "Song",
        vec![RecordField::new("title", StorageKind::String)],
    ))
}

fn playlist_type() -> Arc<RecordType> {
    Arc::new(RecordType::new(
        "Playlist",
        vec![
            RecordField::new("name", StorageKind::String),
            RecordField::relation("songs", StorageKind::RepeatedMessage, "Song"),
            RecordField::auxiliary_index("songs"),
            RecordField::relation("by_slot", StorageKind::MessageMap, "Song"),
            RecordField::auxiliary_index("by_slot"),
        ],
    ))
}

fn song(title: &str) -> Record {
    let mut record = Record::new(song_type());
    record.set("title", title).unwrap();
    record
}

fn titles(value: &Value) -> Vec<String> {
    value
        .try_records()
        .unwrap()
        .iter()
        .map(|r| r.get("title").unwrap().try_str().unwrap().unwrap().to_string())
        .collect()
}

#[test]
fn save_writes_index_in_iteration_order() {
    let mut store = MemoryStore::new();
    // Pre-existing song so the collection mixes new and persisted members.
    let existing = store.create(&song("b")).unwrap();

    let mut playlist = Record::new(playlist_type());
    playlist
        .set("songs", vec![song("c"), existing.clone(), song("a")])
        .unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    let stored = playlist.get("songs_index").unwrap();
    let index = AuxiliaryIndex::decode(StorageKind::RepeatedMessage, stored).unwrap();
    assert_eq!(
        index,
        AuxiliaryIndex::List(vec![RecordId(2), existing.id().unwrap(), RecordId(3)])
    );
    assert_eq!(store.len("Song"), 3);
    assert_eq!(store.len("Playlist"), 1);
    assert!(playlist.id().is_some());
}

#[test]
fn reload_restores_collection_order() {
    let mut store = MemoryStore::new();
    let mut playlist = Record::new(playlist_type());
    playlist
        .set("songs", vec![song("one"), song("two"), song("three")])
        .unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    let mut reloaded = store.get("Playlist", playlist.id().unwrap()).unwrap();
    assert!(!reloaded.is_loaded("songs"));
    load_collection(&mut reloaded, "songs", &store).unwrap();
    assert_eq!(
        titles(reloaded.get("songs").unwrap()),
        vec!["one", "two", "three"]
    );
}

#[test]
fn message_map_index_keeps_keys() {
    let mut store = MemoryStore::new();
    let mut playlist = Record::new(playlist_type());
    playlist
        .set(
            "by_slot",
            Value::RecordMap(vec![
                (MapKey::from("opener"), song("x")),
                (MapKey::from("closer"), song("y")),
            ]),
        )
        .unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    let json = match playlist.get("by_slot_index").unwrap() {
        Value::Json(json) => json.clone(),
        other => panic!("expected Json, got {other:?}"),
    };
    assert_eq!(
        json,
        serde_json::json!([[{"String": "opener"}, 1], [{"String": "closer"}, 2]])
    );

    let mut reloaded = store.get("Playlist", playlist.id().unwrap()).unwrap();
    load_collections(&mut reloaded, &store).unwrap();
    let entries = reloaded.get("by_slot").unwrap().try_record_map().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, MapKey::from("opener"));
    assert_eq!(entries[1].1.get("title").unwrap(), &Value::string("y"));
}

#[test]
fn index_is_stale_until_saved() {
    let mut store = MemoryStore::new();
    let mut playlist = Record::new(playlist_type());
    playlist.set("songs", vec![song("one")]).unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    playlist
        .set("songs", vec![song("two"), song("three")])
        .unwrap();
    let stale = AuxiliaryIndex::decode(
        StorageKind::RepeatedMessage,
        playlist.get("songs_index").unwrap(),
    )
    .unwrap();
    assert_eq!(stale.len(), 1);

    save_collection(&mut playlist, "songs", &mut store).unwrap();
    let fresh = AuxiliaryIndex::decode(
        StorageKind::RepeatedMessage,
        playlist.get("songs_index").unwrap(),
    )
    .unwrap();
    assert_eq!(fresh.len(), 2);
}

#[test]
fn save_inserts_records_carrying_unknown_ids() {
    let mut store = MemoryStore::new();
    let mut member = song("imported");
    member.set_id(RecordId(11)).unwrap();
    let mut playlist = Record::new(playlist_type());
    playlist.set_id(RecordId(7)).unwrap();
    playlist.set("songs", vec![member]).unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    assert!(store.contains("Playlist", RecordId(7)).unwrap());
    assert!(store.contains("Song", RecordId(11)).unwrap());

    let mut reloaded = store.get("Playlist", RecordId(7)).unwrap();
    load_collection(&mut reloaded, "songs", &store).unwrap();
    assert_eq!(titles(reloaded.get("songs").unwrap()), vec!["imported"]);

    // Ids handed out later continue past the imported ones.
    let fresh = store.create(&song("next")).unwrap();
    assert_eq!(fresh.id(), Some(RecordId(12)));
}

#[test]
fn save_updates_existing_members() {
    let mut store = MemoryStore::new();
    let mut existing = store.create(&song("draft")).unwrap();
    existing.set("title", "final").unwrap();

    let mut playlist = Record::new(playlist_type());
    playlist.set("songs", vec![existing.clone()]).unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    assert_eq!(store.len("Song"), 1);
    let stored = store.get("Song", existing.id().unwrap()).unwrap();
    assert_eq!(stored.get("title").unwrap(), &Value::string("final"));
}

#[test]
fn load_propagates_missing_member() {
    let mut store = MemoryStore::new();
    let mut playlist = Record::new(playlist_type());
    playlist.set("songs", vec![song("gone")]).unwrap();
    save_record(&mut playlist, &mut store).unwrap();

    // A fresh store has the playlist but not its song.
    let mut other = MemoryStore::new();
    other.create(&playlist).unwrap();
    let mut reloaded = other.get("Playlist", playlist.id().unwrap()).unwrap();
    let err = load_collection(&mut reloaded, "songs", &other).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { ref record_type, .. } if record_type == "Song"));
}

#[test]
fn load_rejects_non_collection_field() {
    let store = MemoryStore::new();
    let mut playlist = Record::new(playlist_type());
    playlist.set("songs", Vec::<Record>::new()).unwrap();
    let mut detached = playlist.detached();
    let err = load_collection(&mut detached, "name", &store).unwrap_err();
    assert!(matches!(err, StoreError::NotACollection { .. }));
}

#[test]
fn update_requires_identity() {
    let mut store = MemoryStore::new();
    let err = store.update(&song("x")).unwrap_err();
    assert!(matches!(err, StoreError::MissingIdentity { .. }));
}
