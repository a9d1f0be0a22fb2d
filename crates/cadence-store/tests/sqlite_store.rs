// Behaviour of the SQLite task store against an in-memory database.

use cadence_core::{HttpMethod, ScheduleKind, Task, TaskData, TaskStatus};
use cadence_store::{SqliteTaskStore, StoreError, TaskStore};

fn task(id: &str, recurring: bool, end_unix: i64) -> Task {
    Task {
        id: id.to_string(),
        schedule: ScheduleKind::Now,
        enable: true,
        schedule_date: String::new(),
        schedule_time: String::new(),
        recur: if recurring { 3600 } else { 0 },
        is_recur_enabled: recurring,
        number_of_attempts: 3,
        created_at: "2030-01-01T00:00:00.000Z".into(),
        updated_at: "2030-01-01T00:00:00.000Z".into(),
        expires_at: "2040-01-01T00:00:00.000Z".into(),
        start_unix: 1_000,
        end_unix,
        task_data: TaskData {
            task_type: "webhook".into(),
            request_type: HttpMethod::Post,
            url: "http://localhost/hook".into(),
            query_params: serde_json::json!({"page": 2, "q": "x"})
                .as_object()
                .cloned()
                .unwrap(),
            headers: [("x-token".to_string(), "abc".to_string())].into(),
            request_body: Some(serde_json::json!({"hello": "world"})),
        },
        status: TaskStatus::default(),
    }
}

#[test]
fn insert_then_get_one_round_trips_every_field() {
    let store = SqliteTaskStore::in_memory().unwrap();
    let t = task(&uuid::Uuid::new_v4().to_string(), true, 9_000);
    store.insert(&t).unwrap();
    assert_eq!(store.get_one(&t.id).unwrap(), t);
}

#[test]
fn unknown_ids_are_not_found() {
    let store = SqliteTaskStore::in_memory().unwrap();
    assert!(matches!(store.get_one("nope"), Err(StoreError::NotFound { .. })));
    assert!(store.delete("nope").unwrap_err().is_not_found());
    assert!(store.update_enable("nope", false).unwrap_err().is_not_found());
    assert!(store
        .update_task_status("nope", "", true)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn status_update_stamps_last_executed_at() {
    let store = SqliteTaskStore::in_memory().unwrap();
    let t = task("t1", false, 9_000);
    store.insert(&t).unwrap();

    store.update_task_status("t1", "503 Service Unavailable", false).unwrap();
    let got = store.get_one("t1").unwrap();
    assert!(got.status.is_already_executed());
    assert!(!got.status.is_complete);
    assert_eq!(got.status.exception_message, "503 Service Unavailable");
}

#[test]
fn get_active_filters_disabled_expired_and_finished_one_shots() {
    let store = SqliteTaskStore::in_memory().unwrap();
    let now = 5_000;

    store.insert(&task("live-once", false, 9_000)).unwrap();
    store.insert(&task("live-recur", true, 9_000)).unwrap();
    store.insert(&task("expired", true, 4_999)).unwrap();
    store.insert(&task("disabled", true, 9_000)).unwrap();
    store.update_enable("disabled", false).unwrap();
    store.insert(&task("ran-once", false, 9_000)).unwrap();
    store.update_task_status("ran-once", "", true).unwrap();
    store.insert(&task("ran-recur", true, 9_000)).unwrap();
    store.update_task_status("ran-recur", "", true).unwrap();

    let mut ids: Vec<String> = store
        .get_active(now)
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["live-once", "live-recur", "ran-recur"]);
}

#[test]
fn delete_removes_the_row() {
    let store = SqliteTaskStore::in_memory().unwrap();
    store.insert(&task("gone", false, 9_000)).unwrap();
    store.delete("gone").unwrap();
    assert!(store.get_one("gone").unwrap_err().is_not_found());
    assert!(store.ping().is_ok());
}

#[test]
fn recur_is_stored_losslessly_or_rejected() {
    let store = SqliteTaskStore::in_memory().unwrap();

    let mut wide = task("wide", true, 9_000);
    wide.recur = i64::MAX as u64;
    store.insert(&wide).unwrap();
    assert_eq!(store.get_one("wide").unwrap().recur, i64::MAX as u64);

    let mut overflow = task("overflow", true, 9_000);
    overflow.recur = i64::MAX as u64 + 1;
    assert!(matches!(
        store.insert(&overflow),
        Err(StoreError::OutOfRange { field: "recur", .. })
    ));
    assert!(store.get_one("overflow").unwrap_err().is_not_found());
}
