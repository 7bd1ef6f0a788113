//! Pipeline behaviour against the in-memory store

use landing_loader::database::{LandingStore, MemoryStore, TableTarget};
use landing_loader::formats::csv::parse_csv_str;
use landing_loader::pipeline::headers::sanitize_header_strings;
use landing_loader::pipeline::{IngestError, Pipeline, TableLoad};

fn s(v: &str) -> Option<String> {
    Some(v.to_string())
}

async fn load_csv(store: &MemoryStore, table: &str, text: &str, batch_size: usize) -> u64 {
    let csv = parse_csv_str(text).unwrap();
    let columns = sanitize_header_strings(&csv.headers);
    let mut pipeline = Pipeline::new(store, "s_test", batch_size);
    pipeline
        .load_table(TableLoad::full_refresh(table, columns), csv.rows)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_empty_cell_loads_as_null() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();

    let written = load_csv(&store, "people", "name,age\nAda,36\nBob,\n", 1000).await;
    assert_eq!(written, 2);

    let table = store.table("s_test", "people").unwrap();
    assert_eq!(table.columns, vec!["name", "age"]);
    assert_eq!(table.rows[1], vec![s("Bob"), None]);
}

#[tokio::test]
async fn test_messy_headers_become_unique_columns() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();

    load_csv(
        &store,
        "rides",
        "Pick-up Address,pick up address,,Amount (EUR)\nA,B,C,12.50\n",
        1000,
    )
    .await;

    let table = store.table("s_test", "rides").unwrap();
    assert_eq!(
        table.columns,
        vec!["pick_up_address", "pick_up_address_1", "column_2", "amount_eur"]
    );
    assert_eq!(table.value(0, "amount_eur"), Some("12.50"));
}

#[tokio::test]
async fn test_full_refresh_is_idempotent() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();
    let text = "a,b\n1,2\n3,4\n5,6\n";

    load_csv(&store, "numbers", text, 2).await;
    load_csv(&store, "numbers", text, 2).await;

    let count = store
        .row_count(&TableTarget::new("s_test", "numbers"))
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_rows_commit_per_batch() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();

    load_csv(&store, "numbers", "a\n1\n2\n3\n4\n5\n", 2).await;

    // 2 + 2 + 1
    assert_eq!(store.commit_count(), 3);
}

#[tokio::test]
async fn test_ragged_rows_are_padded_and_truncated() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();

    load_csv(&store, "ragged", "a,b,c\n1\n1,2,3,4,5\n", 1000).await;

    let table = store.table("s_test", "ragged").unwrap();
    assert_eq!(table.rows[0], vec![s("1"), None, None]);
    assert_eq!(table.rows[1], vec![s("1"), s("2"), s("3")]);
}

#[tokio::test]
async fn test_append_keeps_previous_rows_and_provenance() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();
    let mut pipeline = Pipeline::new(&store, "s_test", 100);

    for (folder, value) in [("export_a", "x"), ("export_b", "y")] {
        let load = TableLoad::append("posts", vec!["title".to_string()])
            .with_provenance("source_folder", folder);
        pipeline
            .load_table(load, vec![Ok(vec![s(value)])])
            .await
            .unwrap();
    }

    let table = store.table("s_test", "posts").unwrap();
    assert_eq!(table.columns, vec!["title", "source_folder"]);
    assert_eq!(
        table.column("source_folder"),
        vec![s("export_a"), s("export_b")]
    );
    assert_eq!(pipeline.stats().table_rows["posts"], 2);
}

#[tokio::test]
async fn test_append_with_new_column_drops_unknown_values() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();
    let mut pipeline = Pipeline::new(&store, "s_test", 100);

    pipeline
        .load_table(
            TableLoad::append("emails", vec!["email".to_string()]),
            vec![Ok(vec![s("a@example.com")])],
        )
        .await
        .unwrap();
    pipeline
        .load_table(
            TableLoad::append("emails", vec!["plan".to_string(), "email".to_string()]),
            vec![Ok(vec![s("paid"), s("b@example.com")])],
        )
        .await
        .unwrap();

    let table = store.table("s_test", "emails").unwrap();
    assert_eq!(table.columns, vec!["email"]);
    assert_eq!(
        table.column("email"),
        vec![s("a@example.com"), s("b@example.com")]
    );
}

#[tokio::test]
async fn test_load_without_columns_fails() {
    let store = MemoryStore::new();
    store.ensure_schema("s_test").await.unwrap();
    let mut pipeline = Pipeline::new(&store, "s_test", 100);

    let err = pipeline
        .load_table(TableLoad::full_refresh("empty", Vec::new()), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::NoColumns(_)));
    assert!(store.table("s_test", "empty").is_none());
}

#[tokio::test]
async fn test_load_into_missing_schema_fails() {
    let store = MemoryStore::new();
    let mut pipeline = Pipeline::new(&store, "s_absent", 100);

    let result = pipeline
        .load_table(
            TableLoad::full_refresh("t", vec!["a".to_string()]),
            vec![Ok(vec![s("1")])],
        )
        .await;
    assert!(result.is_err());
}
