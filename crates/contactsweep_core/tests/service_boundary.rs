use contactsweep_core::db::open_db;
use contactsweep_core::{
    CancelToken, DedupError, DedupService, GrantedCapabilities, NewContact, OutcomeStatus,
    OwnerId, ServiceError, SqliteContactStore, SqliteDedupRunner, StatusCode,
};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn seeded_db(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("contacts.db");
    let conn = open_db(&path).unwrap();
    let store = SqliteContactStore::new(&conn);
    for (owner, number) in [(10, "555-1234"), (11, "5551234")] {
        store
            .insert_contact(&NewContact {
                owner_id: OwnerId(owner),
                display_name: Some("Alice".to_string()),
                numbers: vec![number.to_string()],
            })
            .unwrap();
    }
    path
}

#[test]
fn connect_requires_a_started_service() {
    let service = DedupService::new(Arc::new(|_: &CancelToken| OutcomeStatus::NoDuplicatesFound));

    assert_eq!(service.connect().err(), Some(ServiceError::NotRunning));
    service.start();
    assert!(service.connect().is_ok());
}

#[test]
fn repeated_calls_over_one_connection_follow_store_state() {
    let dir = tempfile::tempdir().unwrap();
    let runner = SqliteDedupRunner::new(seeded_db(&dir), GrantedCapabilities::all());
    let service = DedupService::new(Arc::new(runner));
    service.start();

    let connection = service.connect().unwrap();
    assert_eq!(connection.remove_duplicates(), StatusCode::Success);
    assert_eq!(connection.remove_duplicates(), StatusCode::NoDuplicatesFound);
    connection.disconnect();
    assert_eq!(service.active_connections(), 0);
}

#[test]
fn permission_denied_collapses_to_error_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-created.db");
    let runner = SqliteDedupRunner::new(
        &path,
        GrantedCapabilities::parse(&["read_contacts"]).unwrap(),
    );
    let service = DedupService::new(Arc::new(runner));
    service.start();

    let code = service
        .with_connection(|connection| connection.remove_duplicates())
        .unwrap();
    assert_eq!(code, StatusCode::Error);
    assert_eq!(code.as_i32(), 2);
    assert!(!path.exists(), "permission gate must run before opening the store");
}

#[test]
fn connections_are_released_on_every_path() {
    let service = DedupService::new(Arc::new(|_: &CancelToken| OutcomeStatus::NoDuplicatesFound));
    service.start();

    let first = service.connect().unwrap();
    let second = service.connect().unwrap();
    assert_eq!(service.active_connections(), 2);
    drop(first);
    assert_eq!(service.active_connections(), 1);
    second.disconnect();
    assert_eq!(service.active_connections(), 0);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        service.with_connection(|_| panic!("caller failure")).unwrap();
    }));
    assert!(result.is_err());
    assert_eq!(service.active_connections(), 0);
    assert!(!service.is_busy());
}

#[test]
fn concurrent_call_is_rejected_while_one_is_in_flight() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);
    let release_rx = Mutex::new(release_rx);

    let service = DedupService::new(Arc::new(move |_: &CancelToken| {
        entered_tx.lock().unwrap().send(()).unwrap();
        release_rx.lock().unwrap().recv().unwrap();
        OutcomeStatus::Success { deleted_count: 1 }
    }));
    service.start();

    let background = service.clone();
    let first = thread::spawn(move || {
        background
            .with_connection(|connection| connection.remove_duplicates())
            .unwrap()
    });
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(service.is_busy());

    let connection = service.connect().unwrap();
    let outcome = connection.remove_duplicates_outcome();
    assert!(matches!(outcome, OutcomeStatus::Error(DedupError::Busy)));

    release_tx.send(()).unwrap();
    assert_eq!(first.join().unwrap(), StatusCode::Success);
    assert!(!service.is_busy());
}

#[test]
fn stop_cancels_the_in_flight_run() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let entered_tx = Mutex::new(entered_tx);

    let service = DedupService::new(Arc::new(move |cancel: &CancelToken| {
        entered_tx.lock().unwrap().send(()).unwrap();
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(5));
        }
        OutcomeStatus::Error(DedupError::Cancelled)
    }));
    service.start();

    let connection = service.connect().unwrap();
    let worker = thread::spawn(move || connection.remove_duplicates());
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    service.stop();
    assert_eq!(worker.join().unwrap(), StatusCode::Error);
    assert!(!service.is_running());
    assert_eq!(service.active_connections(), 0);
}

#[test]
fn call_after_stop_returns_error_code() {
    let service = DedupService::new(Arc::new(|_: &CancelToken| OutcomeStatus::NoDuplicatesFound));
    service.start();
    let connection = service.connect().unwrap();
    service.stop();

    assert!(matches!(
        connection.remove_duplicates_outcome(),
        OutcomeStatus::Error(DedupError::Unavailable(_))
    ));
    assert!(!service.cancel_in_flight());
}

#[test]
fn preview_uses_the_configured_database() {
    let dir = tempfile::tempdir().unwrap();
    let runner = SqliteDedupRunner::new(seeded_db(&dir), GrantedCapabilities::all());

    let preview = runner.preview().unwrap();
    assert_eq!(preview.plan.as_slice(), &[OwnerId(10)]);
    assert_eq!(preview.groups[0].survivor, OwnerId(11));
}
