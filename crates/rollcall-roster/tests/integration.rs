//! Integration tests for the JSON-file roster store.

use rollcall_roster::schema::{FULL_NAME, IP_ADDRESS, REQUIRED_COLUMNS, STATUS};
use rollcall_roster::{FileRoster, Grid, RosterError, RosterStore};

fn make_grid() -> Grid {
    let mut grid = Grid::new(REQUIRED_COLUMNS);
    grid.push_row([
        "2024-03-01 09:00:00",
        "ada@example.com",
        "Ada Lovelace",
        "ada@example.com",
        "Analytics",
        "192.168.1.50",
        "",
    ]);
    grid.push_row([
        "2024-03-01 09:01:00",
        "bob@example.com",
        " Bob ",
        "bob@example.com",
        "Ops",
        "",
        "",
    ]);
    grid
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRoster::new(dir.path().join("absent.json"));

    let result = store.read_all_rows(&REQUIRED_COLUMNS).await;
    assert!(matches!(result, Err(RosterError::NotFound { .. })));
}

#[tokio::test]
async fn save_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRoster::new(dir.path().join("nested/roster.json"));
    store.save(&make_grid()).await.unwrap();

    let sheet = store.read_all_rows(&REQUIRED_COLUMNS).await.unwrap();
    assert_eq!(sheet.rows.len(), 2);
    assert_eq!(sheet.rows[0].get(IP_ADDRESS), "192.168.1.50");
    assert_eq!(sheet.rows[1].get(FULL_NAME), "Bob");
    assert!(!sheet.has_column("Status Log"));
}

#[tokio::test]
async fn writes_persist_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let store = FileRoster::new(&path);
    store.save(&make_grid()).await.unwrap();

    store
        .write_range(2, STATUS, &["Present".to_string(), "Invalid Wi-Fi".to_string()])
        .await
        .unwrap();
    store.write_cell(3, STATUS, "Duplicate Entry").await.unwrap();

    let reopened = FileRoster::new(&path);
    let sheet = reopened.read_all_rows(&[STATUS]).await.unwrap();
    assert_eq!(sheet.rows[0].get(STATUS), "Present");
    assert_eq!(sheet.rows[1].get(STATUS), "Duplicate Entry");
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn delete_row_shifts_later_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRoster::new(dir.path().join("roster.json"));
    store.save(&make_grid()).await.unwrap();

    store.delete_row(2).await.unwrap();

    let sheet = store.read_all_rows(&[FULL_NAME]).await.unwrap();
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].row, 2);
    assert_eq!(sheet.rows[0].get(FULL_NAME), "Bob");
}

#[tokio::test]
async fn rejected_write_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRoster::new(dir.path().join("roster.json"));
    store.save(&make_grid()).await.unwrap();

    let result = store.write_cell(9, STATUS, "Present").await;
    assert!(matches!(result, Err(RosterError::RowOutOfRange { row: 9, .. })));

    let sheet = store.read_all_rows(&[STATUS]).await.unwrap();
    assert!(sheet.rows.iter().all(|r| r.get(STATUS).is_empty()));
}
