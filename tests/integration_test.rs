use std::time::Duration;

use certwatch::ingest;
use certwatch::store::Store;
use certwatch::ChangeDetector;
use chrono::NaiveDate;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn open_store(dir: &TempDir) -> Store {
    Store::open(&dir.path().join("certwatch.db"), Duration::from_secs(1)).unwrap()
}

const PIPELINE_RUN: &str = r#"[
    {"device": "A", "name": "Solar A", "address": "1 Main St", "country": "Chile",
     "issuance_history": [{"year": "2020", "volume": "100"}],
     "url": "https://registry.example/A", "date": "10/12/2026"},
    {"device": "A", "name": "Solar A", "address": "1 Main St", "country": "Chile",
     "issuance_history": [{"year": "2020", "volume": "100"}],
     "url": "https://registry.example/A", "date": "10/16/2026"},
    {"device": "B", "name": "Wind B", "address": "2 Side Rd", "country": "Peru",
     "issuance_history": [{"year": "2020", "volume": "100"}],
     "url": "https://registry.example/B", "date": "10/12/2026"},
    {"device": "B", "name": "Wind B", "address": "2 Side Rd", "country": "Peru",
     "issuance_history": [{"year": "2020", "volume": "150"}],
     "url": "https://registry.example/B", "date": "10/16/2026"},
    {"device": "C", "name": "Hydro C", "address": "3 River Way", "country": "Peru",
     "issuance_history": [{"year": "2020", "volume": "100"}],
     "url": "https://registry.example/C", "date": "10/16/2026"}
]"#;

fn import(store: &mut Store, dir: &TempDir, name: &str, contents: &str) -> usize {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    ingest::import_file(store, &path).unwrap()
}

#[test]
fn imported_history_reports_only_changed_devices() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    assert_eq!(import(&mut store, &dir, "run.json", PIPELINE_RUN), 5);

    let result = ChangeDetector::new(&store)
        .query_on(["A", "B", "C", "D"], 7, today())
        .unwrap();

    let rows: Vec<(&str, NaiveDate)> = result
        .iter()
        .map(|s| (s.device_id.as_str(), s.captured_on))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("B", NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()),
            ("B", NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()),
        ]
    );
}

#[test]
fn reimport_overwrites_instead_of_appending() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    import(&mut store, &dir, "run.json", PIPELINE_RUN);

    // a rerun for device A on the same day now reports a different volume
    let rerun = r#"[{"device": "A", "name": "Solar A", "address": "1 Main St", "country": "Chile",
        "issuance_history": [{"year": "2020", "volume": "175"}],
        "url": "https://registry.example/A", "date": "2026-10-16"}]"#;
    import(&mut store, &dir, "rerun.json", rerun);

    assert_eq!(store.list_snapshots().unwrap().len(), 5);

    let result = ChangeDetector::new(&store).query_on(["A"], 7, today()).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[1].issuance_history.as_ref().unwrap().to_string(), "2020: 175");
}

#[test]
fn narrow_window_drops_earlier_snapshots() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    import(&mut store, &dir, "run.json", PIPELINE_RUN);

    let result = ChangeDetector::new(&store).query_on(["B"], 2, today()).unwrap();
    assert!(result.is_empty());

    let result = ChangeDetector::new(&store).query_on(["B"], 5, today()).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn invalid_file_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"[{"device": "A", "name": "Solar A", "url": "u", "date": "2026-10-16"},
            {"device": "B", "name": "Wind B", "url": "u", "date": "someday"}]"#,
    )
    .unwrap();

    assert!(ingest::import_file(&mut store, &path).is_err());
    assert!(store.list_snapshots().unwrap().is_empty());
}

#[test]
fn data_persists_across_handles() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_store(&dir);
        import(&mut store, &dir, "run.json", PIPELINE_RUN);
        store.add_device("B", "Wind B", None).unwrap();
    }

    let store = open_store(&dir);
    let watched = store.watched_device_ids().unwrap();
    let result = ChangeDetector::new(&store).query_on(&watched, 7, today()).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn directory_as_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = Store::open(dir.path(), Duration::from_millis(100)).err().unwrap();
    assert!(err.is_store_unavailable());
}

#[test]
fn locked_database_fails_query_as_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("certwatch.db");
    let mut store = Store::open(&path, Duration::from_millis(100)).unwrap();
    import(&mut store, &dir, "run.json", PIPELINE_RUN);

    let writer = rusqlite::Connection::open(&path).unwrap();
    writer.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let err = ChangeDetector::new(&store)
        .query_on(["A", "B"], 7, today())
        .unwrap_err();
    assert!(err.is_store_unavailable());

    writer.execute_batch("ROLLBACK;").unwrap();
    let result = ChangeDetector::new(&store).query_on(["A", "B"], 7, today()).unwrap();
    assert_eq!(result.len(), 2);
}
