use contactsweep_core::db::open_db_in_memory;
use contactsweep_core::{
    CancelToken, ContactStore, DedupEngine, GrantedCapabilities, NewContact, OnDemandSqliteStore,
    OutcomeStatus, OwnerId, PhoneRow, RawContactId, SnapshotReader, SqliteContactStore,
    StoreError,
};

fn contact(owner: i64, name: Option<&str>, numbers: &[&str]) -> NewContact {
    NewContact {
        owner_id: OwnerId(owner),
        display_name: name.map(str::to_string),
        numbers: numbers.iter().map(|number| number.to_string()).collect(),
    }
}

#[test]
fn insert_contact_creates_raw_and_phone_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::new(&conn);

    store
        .insert_contact(&contact(10, Some("Alice"), &["555-1234", "+1 555 0000"]))
        .unwrap();

    let rows = store.query_phone_rows().unwrap();
    assert_eq!(
        rows,
        vec![
            PhoneRow {
                number: Some("555-1234".to_string()),
                owner_id: Some("10".to_string()),
                display_name: Some("Alice".to_string()),
            },
            PhoneRow {
                number: Some("+1 555 0000".to_string()),
                owner_id: Some("10".to_string()),
                display_name: Some("Alice".to_string()),
            },
        ]
    );
    assert_eq!(store.raw_contact_count().unwrap(), 1);
    assert!(store.owner_exists(OwnerId(10)).unwrap());
    assert!(!store.owner_exists(OwnerId(11)).unwrap());
}

#[test]
fn owner_fans_out_to_every_raw_contact() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::new(&conn);

    let first = store.insert_contact(&contact(7, Some("Kim"), &["1"])).unwrap();
    let second = store.insert_contact(&contact(7, Some("Kim"), &["2"])).unwrap();
    store.insert_contact(&contact(8, Some("Lee"), &["3"])).unwrap();

    let ids = store.query_raw_contact_ids(OwnerId(7)).unwrap();
    assert_eq!(ids, vec![first, second]);
    assert!(store.query_raw_contact_ids(OwnerId(99)).unwrap().is_empty());
}

#[test]
fn deleting_raw_contact_cascades_to_phone_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::new(&conn);

    let raw_id = store
        .insert_contact(&contact(1, Some("Ann"), &["100", "200"]))
        .unwrap();
    store.insert_contact(&contact(2, Some("Bo"), &["300"])).unwrap();

    assert_eq!(store.delete_raw_contact(raw_id).unwrap(), 1);
    assert_eq!(store.delete_raw_contact(raw_id).unwrap(), 0);
    assert_eq!(store.delete_raw_contact(RawContactId(12345)).unwrap(), 0);

    let rows = store.query_phone_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].owner_id.as_deref(), Some("2"));
}

#[test]
fn malformed_rows_are_returned_raw_and_skipped_by_reader() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::new(&conn);
    store.insert_contact(&contact(5, None, &["555"])).unwrap();
    conn.execute_batch(
        "INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, '555', 'abc', 'Broken');
         INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, NULL, '6', 'No Number');
         INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, '555', NULL, 'No Owner');",
    )
    .unwrap();

    assert_eq!(store.query_phone_rows().unwrap().len(), 4);

    let snapshot = SnapshotReader::new(&store).read().unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.skipped, 3);
    assert_eq!(snapshot.records[0].owner_id, OwnerId(5));
    assert_eq!(snapshot.records[0].display_name, "");
}

#[test]
fn non_text_cells_degrade_per_row_instead_of_failing_the_read() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteContactStore::new(&conn);
    store.insert_contact(&contact(10, Some("Alice"), &["555-1234"])).unwrap();
    store.insert_contact(&contact(11, Some("Alice"), &["5551234"])).unwrap();
    conn.execute_batch(
        "INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, '999', '12', X'FF00');
         INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, CAST(X'FF35' AS TEXT), '13', 'Bad Number');
         INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, X'3535', '14', 'Blob Number');
         INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
         VALUES (NULL, '777', X'FF', 'Bad Owner');",
    )
    .unwrap();

    let rows = store.query_phone_rows().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[2].display_name.as_deref(), Some(""));
    assert_eq!(rows[3].number, None);
    assert_eq!(rows[4].number, None);
    assert_eq!(rows[5].owner_id, None);

    let snapshot = SnapshotReader::new(&store).read().unwrap();
    assert_eq!(snapshot.records.len(), 3);
    assert_eq!(snapshot.skipped, 3);
    assert_eq!(snapshot.records[2].owner_id, OwnerId(12));
    assert_eq!(snapshot.records[2].display_name, "");

    let outcome = DedupEngine::new(&store, &GrantedCapabilities::all()).run(&CancelToken::new());
    assert!(matches!(outcome, OutcomeStatus::Success { deleted_count: 1 }));
    assert!(!store.owner_exists(OwnerId(10)).unwrap());
    assert!(store.owner_exists(OwnerId(11)).unwrap());
}

#[test]
fn on_demand_store_opens_database_on_first_use() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.sqlite3");
    let store = OnDemandSqliteStore::new(&path);

    assert!(!store.is_open());
    assert!(!path.exists());

    assert!(store.query_phone_rows().unwrap().is_empty());
    assert!(store.is_open());
    assert!(path.exists());
    assert!(store.query_raw_contact_ids(OwnerId(1)).unwrap().is_empty());
}

#[test]
fn on_demand_store_reports_open_failure_as_db_error() {
    let store = OnDemandSqliteStore::new("");

    let err = store.query_phone_rows().unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
    assert!(err.is_fatal());
    assert!(!store.is_open());
}

#[test]
fn new_contact_deserializes_with_optional_fields() {
    let parsed: Vec<NewContact> = serde_json::from_str(
        r#"[{"owner_id": 3, "display_name": "Ann", "numbers": ["1"]}, {"owner_id": 4}]"#,
    )
    .unwrap();
    assert_eq!(parsed[0], contact(3, Some("Ann"), &["1"]));
    assert_eq!(parsed[1], contact(4, None, &[]));
}
