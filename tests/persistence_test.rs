use chrono::Utc;
use phoros::persistence::{
    FileRecoveryStore, MemoryRecoveryStore, PendingPaymentRecord, RecoveryStore,
};
use phoros::session::SessionStatus;

fn sample_record() -> PendingPaymentRecord {
    PendingPaymentRecord {
        session_id: "sess-42".to_string(),
        session_status: SessionStatus::Completed,
        energy_consumed: 12.5,
        price_per_kwh: Some(4000.0),
        captured_at: Utc::now(),
    }
}

#[test]
fn file_store_roundtrip() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();

    let mut store = FileRecoveryStore::new(path.clone());
    let record = sample_record();
    store.write(&record).unwrap();

    // A fresh store over the same path sees the identical record
    let store2 = FileRecoveryStore::new(path);
    let read_back = store2.read().unwrap().unwrap();
    assert_eq!(read_back, record);
}

#[test]
fn file_store_absent_means_no_unresolved_payment() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecoveryStore::new(dir.path().join("missing.json"));
    assert!(store.read().unwrap().is_none());
}

#[test]
fn file_store_treats_corrupt_slot_as_absent() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "{not json").unwrap();

    let store = FileRecoveryStore::new(tmp.path().to_path_buf());
    assert!(store.read().unwrap().is_none());
}

#[test]
fn file_store_clear_empties_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut store = FileRecoveryStore::new(path);
    store.write(&sample_record()).unwrap();
    assert!(store.read().unwrap().is_some());

    store.clear().unwrap();
    assert!(store.read().unwrap().is_none());

    // Clearing an already-empty slot is a no-op
    store.clear().unwrap();
}

#[test]
fn file_store_write_overwrites() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut store = FileRecoveryStore::new(tmp.path().to_path_buf());

    store.write(&sample_record()).unwrap();
    let mut newer = sample_record();
    newer.session_id = "sess-43".to_string();
    newer.energy_consumed = 3.0;
    store.write(&newer).unwrap();

    let read_back = store.read().unwrap().unwrap();
    assert_eq!(read_back.session_id, "sess-43");
    assert!((read_back.energy_consumed - 3.0).abs() < f64::EPSILON);
}

#[test]
fn memory_store_roundtrip() {
    let mut store = MemoryRecoveryStore::new();
    assert!(store.read().unwrap().is_none());

    let record = sample_record();
    store.write(&record).unwrap();
    assert_eq!(store.read().unwrap().unwrap(), record);

    store.clear().unwrap();
    assert!(store.read().unwrap().is_none());
}

#[test]
fn persisted_layout_uses_camel_case_keys() {
    let json = serde_json::to_string(&sample_record()).unwrap();
    assert!(json.contains("\"sessionId\""));
    assert!(json.contains("\"sessionStatus\""));
    assert!(json.contains("\"energyConsumed\""));
    assert!(json.contains("\"pricePerKwh\""));
    assert!(json.contains("\"capturedAt\""));
}
