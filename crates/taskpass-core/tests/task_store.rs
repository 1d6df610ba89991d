use taskpass_core::tasks::{Task, TaskStore, TaskStoreError, DATABASE_FILE};

fn task(id: i64, text: &str) -> Task {
    Task {
        id,
        text: text.to_string(),
    }
}

async fn assert_cache_matches_table(store: &TaskStore) {
    let table = store.list_tasks().await.expect("list");
    assert_eq!(store.tasks(), table.as_slice());
}

#[tokio::test]
async fn test_add_update_delete_scenario() {
    let mut store = TaskStore::open_in_memory().await.expect("open");

    store.add_task("Buy milk").await.expect("add");
    assert_eq!(store.tasks(), &[task(1, "Buy milk")]);

    store.update_task(1, "Buy oat milk").await.expect("update");
    assert_eq!(store.tasks(), &[task(1, "Buy oat milk")]);

    store.delete_task(1).await.expect("delete");
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn test_cache_matches_table_after_each_mutation() {
    let mut store = TaskStore::open_in_memory().await.expect("open");

    store.add_task("one").await.expect("add");
    assert_cache_matches_table(&store).await;
    store.add_task("two").await.expect("add");
    assert_cache_matches_table(&store).await;
    store.add_task("three").await.expect("add");
    assert_cache_matches_table(&store).await;
    store.update_task(2, "two, edited").await.expect("update");
    assert_cache_matches_table(&store).await;
    store.delete_task(1).await.expect("delete");
    assert_cache_matches_table(&store).await;
    store.add_task("four").await.expect("add");
    assert_cache_matches_table(&store).await;

    assert_eq!(
        store.tasks(),
        &[task(2, "two, edited"), task(3, "three"), task(4, "four")]
    );
}

#[tokio::test]
async fn test_missing_id_is_a_noop() {
    let mut store = TaskStore::open_in_memory().await.expect("open");
    store.add_task("keep").await.expect("add");

    store.update_task(99, "ghost").await.expect("update missing");
    store.delete_task(99).await.expect("delete missing");

    assert_eq!(store.tasks(), &[task(1, "keep")]);
    assert_cache_matches_table(&store).await;
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let mut store = TaskStore::open_in_memory().await.expect("open");
    store.add_task("a").await.expect("add");
    store.add_task("b").await.expect("add");
    store.delete_task(2).await.expect("delete");
    store.add_task("c").await.expect("add");

    assert_eq!(store.tasks(), &[task(1, "a"), task(3, "c")]);
}

#[tokio::test]
async fn test_reopen_keeps_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data").join(DATABASE_FILE);

    {
        let mut store = TaskStore::open(&path).await.expect("open");
        store.add_task("Buy milk").await.expect("add");
        store.add_task("Walk dog").await.expect("add");
    }

    let store = TaskStore::open(&path).await.expect("reopen");
    assert_eq!(store.tasks(), &[task(1, "Buy milk"), task(2, "Walk dog")]);
}

#[tokio::test]
async fn test_text_is_stored_verbatim() {
    let mut store = TaskStore::open_in_memory().await.expect("open");
    store
        .add_task("Robert'); DROP TABLE tasks;--")
        .await
        .expect("add");

    assert_eq!(store.tasks()[0].text, "Robert'); DROP TABLE tasks;--");
    assert_eq!(store.list_tasks().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_database_error_keeps_cached_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(DATABASE_FILE);

    let mut store = TaskStore::open(&path).await.expect("open");
    store.add_task("keep").await.expect("add");

    let other = rusqlite::Connection::open(&path).expect("second connection");
    other.execute_batch("DROP TABLE tasks;").expect("drop table");
    drop(other);

    let err = store.add_task("lost").await.unwrap_err();
    assert!(matches!(err, TaskStoreError::Sqlite(_)));
    assert_eq!(store.tasks(), &[task(1, "keep")]);

    assert!(store.update_task(1, "changed").await.is_err());
    assert!(store.delete_task(1).await.is_err());
    assert_eq!(store.tasks(), &[task(1, "keep")]);
}
