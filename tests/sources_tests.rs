//! End-to-end source runs against the in-memory store

use std::fs;
use std::path::Path;

use landing_loader::database::{LandingStore, MemoryStore, TableTarget};
use landing_loader::pipeline::{IngestError, LoadOptions, run_source};
use landing_loader::sources::apple_health::AppleHealthSource;
use landing_loader::sources::bolt::BoltSource;
use landing_loader::sources::generic::ingest_file;
use landing_loader::sources::spotify::SpotifySource;
use landing_loader::sources::substack::SubstackSource;
use landing_loader::sources::telegram::TelegramSource;
use landing_loader::sources::{SourceKind, linkedin::LinkedinSource};
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn s(v: &str) -> Option<String> {
    Some(v.to_string())
}

#[tokio::test]
async fn test_bolt_loads_each_csv_into_its_table() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("rides.csv"),
        "Pick-up Address,Price\nAlexanderplatz,12.50\nKreuzberg,\n",
    );
    write(&dir.path().join("Payment Methods.csv"), "Type\nCard\n");
    write(&dir.path().join("notes.txt"), "ignored");

    let store = MemoryStore::new();
    let source = BoltSource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 0);
    assert!(store.has_schema("s_bolt"));

    let rides = store.table("s_bolt", "rides").unwrap();
    assert_eq!(rides.columns, vec!["pick_up_address", "price"]);
    assert_eq!(rides.rows[1], vec![s("Kreuzberg"), None]);
    assert!(store.table("s_bolt", "payment_methods").is_some());
}

#[tokio::test]
async fn test_rerun_replaces_instead_of_duplicating() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("rides.csv"), "id\n1\n2\n");

    let store = MemoryStore::new();
    let source = BoltSource::new(dir.path());
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();

    let count = store
        .row_count(&TableTarget::new("s_bolt", "rides"))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_broken_file_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.json"), "{not json");
    write(&dir.path().join("b.json"), r#"[{"x": 1}]"#);

    let store = MemoryStore::new();
    let source = SpotifySource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();

    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.errors_count, 1);
    assert!(store.table("s_spotify", "b").is_some());
}

#[tokio::test]
async fn test_spotify_json_columns_are_union_of_keys() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("StreamingHistory0.json"),
        r#"[{"a": 1}, {"b": 2}]"#,
    );
    write(
        &dir.path().join("Playlist1.json"),
        r#"{"playlists": [{"name": "Focus", "items": [{"track": {"trackName": "X"}}]}]}"#,
    );
    write(&dir.path().join("Empty.json"), "[]");

    let store = MemoryStore::new();
    let source = SpotifySource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    assert_eq!(stats.files_failed, 0);

    let history = store.table("s_spotify", "streaminghistory0").unwrap();
    assert_eq!(history.columns, vec!["a", "b"]);
    assert_eq!(history.rows, vec![vec![s("1"), None], vec![None, s("2")]]);

    let playlists = store.table("s_spotify", "playlist1").unwrap();
    assert_eq!(playlists.value(0, "name"), Some("Focus"));
    assert_eq!(playlists.value(0, "items_0_track_trackname"), Some("X"));

    assert!(store.table("s_spotify", "empty").is_none());
}

fn substack_export(root: &Path, folder: &str, title: &str) {
    let base = root.join(folder);
    write(&base.join("posts.csv"), &format!("post_id,title\n139,{}\n", title));
    write(
        &base.join("email_list.jimwurst.csv"),
        "email,active_subscription\nreader@example.com,true\n",
    );
    write(&base.join("posts/139.delivers.csv"), "email,timestamp\nreader@example.com,2024-01-01\n");
    write(&base.join("posts/139.opens.csv"), "email,timestamp\nreader@example.com,2024-01-02\n");
}

#[tokio::test]
async fn test_substack_appends_across_export_folders() {
    let dir = tempdir().unwrap();
    substack_export(dir.path(), "export_a", "First");
    substack_export(dir.path(), "export_b", "Second");
    write(&dir.path().join("export_b/Subscriber Stats.csv"), "day,count\nmon,3\n");

    let store = MemoryStore::new();
    let source = SubstackSource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    assert_eq!(stats.files_failed, 0);

    let posts = store.table("s_substack", "posts").unwrap();
    assert_eq!(posts.columns, vec!["post_id", "title", "source_folder"]);
    assert_eq!(posts.column("title"), vec![s("First"), s("Second")]);
    assert_eq!(
        posts.column("source_folder"),
        vec![s("export_a"), s("export_b")]
    );

    let opens = store.table("s_substack", "post_opens").unwrap();
    assert_eq!(opens.rows.len(), 2);
    assert_eq!(opens.value(0, "post_id"), Some("139"));

    let delivers = store.table("s_substack", "post_delivers").unwrap();
    assert_eq!(delivers.rows.len(), 2);
    assert_eq!(store.table("s_substack", "emails").unwrap().rows.len(), 2);
    assert!(store.table("s_substack", "subscriber_stats").is_some());
}

#[tokio::test]
async fn test_substack_rerun_appends_unless_reset() {
    let dir = tempdir().unwrap();
    substack_export(dir.path(), "export_a", "First");

    let store = MemoryStore::new();
    let source = SubstackSource::new(dir.path());
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    assert_eq!(store.table("s_substack", "posts").unwrap().rows.len(), 2);

    let reset = LoadOptions {
        reset: true,
        ..LoadOptions::assume_yes()
    };
    run_source(&source, &store, &reset).await.unwrap();
    assert_eq!(store.table("s_substack", "posts").unwrap().rows.len(), 1);
}

#[tokio::test]
async fn test_telegram_export() {
    let dir = tempdir().unwrap();
    let export = r#"{
        "personal_information": {"user_id": 42, "first_name": "Jim"},
        "contacts": {"list": [
            {"first_name": "Ada", "last_name": "", "phone_number": "+49 30 1234", "date_unixtime": "1700000000"}
        ]},
        "chats": {"list": [
            {"id": 7, "name": "Ada", "type": "personal_chat", "messages": [
                {"id": 1, "type": "message", "date": "2024-01-01T10:00:00", "from": "Ada", "from_id": "user7",
                 "text": ["see ", {"type": "link", "text": "example.com"}]},
                {"id": 2, "type": "message", "date": "2024-01-01T10:01:00", "from": "Jim", "from_id": "user42",
                 "text": "thanks", "reply_to_message_id": 1}
            ]},
            {"name": "no id", "messages": [{"id": 3, "text": "lost"}]}
        ]}
    }"#;
    write(&dir.path().join("DataExport_2024/result.json"), export);

    let store = MemoryStore::new();
    let source = TelegramSource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    assert_eq!(stats.files_processed, 1);

    let contacts = store.table("s_telegram", "contacts").unwrap();
    assert_eq!(contacts.value(0, "phone_number"), Some("+49 30 1234"));
    assert_eq!(contacts.value(0, "last_name"), Some(""));

    let chats = store.table("s_telegram", "chats").unwrap();
    assert_eq!(chats.rows.len(), 1);
    assert_eq!(chats.value(0, "id"), Some("7"));
    assert!(!chats.value(0, "raw_data").unwrap().contains("messages"));

    let messages = store.table("s_telegram", "messages").unwrap();
    assert_eq!(messages.rows.len(), 2);
    assert_eq!(messages.value(0, "chat_id"), Some("7"));
    assert_eq!(messages.value(0, "text"), Some("see example.com"));
    assert_eq!(messages.value(1, "reply_to_message_id"), Some("1"));

    let info = store.table("s_telegram", "personal_information").unwrap();
    assert_eq!(info.value(0, "user_id"), Some("42"));
}

#[tokio::test]
async fn test_linkedin_complete_csv_tables_are_prefixed() {
    let dir = tempdir().unwrap();
    write(
        &dir.path().join("complete/Connections.csv"),
        "First Name,Last Name,Connected On\nAda,Lovelace,01 Jan 2024\n",
    );

    let store = MemoryStore::new();
    let source = LinkedinSource::new(dir.path());
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();

    let connections = store.table("s_linkedin", "complete_connections").unwrap();
    assert_eq!(
        connections.columns,
        vec!["first_name", "last_name", "connected_on"]
    );
}

#[tokio::test]
async fn test_linkedin_long_names_stay_distinct() {
    let dir = tempdir().unwrap();
    for year in ["2023", "2024"] {
        write(
            &dir.path().join(format!(
                "complete/Recommendations_Received_By_Member_Including_Hidden_Ones_{}.csv",
                year
            )),
            &format!("Year\n{}\n", year),
        );
    }

    let store = MemoryStore::new();
    let source = LinkedinSource::new(dir.path());
    run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();

    let targets = store.targets();
    assert_eq!(targets.len(), 2);
    assert!(targets.iter().all(|t| t.table.len() <= 63));

    let first = store
        .table(
            "s_linkedin",
            "complete_recommendations_received_by_member_including_hidden_on",
        )
        .unwrap();
    assert_eq!(first.value(0, "year"), Some("2023"));
    let second = store
        .table(
            "s_linkedin",
            "complete_recommendations_received_by_member_including_hidden__1",
        )
        .unwrap();
    assert_eq!(second.value(0, "year"), Some("2024"));
}

#[tokio::test]
async fn test_apple_health_records() {
    let dir = tempdir().unwrap();
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_DE">
 <ExportDate value="2024-01-02 08:00:00 +0100"/>
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Phone" unit="count" creationDate="2024-01-01 10:05:00 +0100" startDate="2024-01-01 10:00:00 +0100" endDate="2024-01-01 10:05:00 +0100" value="120"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2024-01-01 11:00:00 +0100" endDate="2024-01-01 11:00:00 +0100" value="64">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
</HealthData>
"#;
    write(&dir.path().join("export.xml"), xml);

    let store = MemoryStore::new();
    let source = AppleHealthSource::new(dir.path());
    let stats = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap();
    assert_eq!(stats.records_ingested(), 2);

    let records = store.table("s_apple_health", "records").unwrap();
    assert_eq!(records.value(0, "type"), Some("HKQuantityTypeIdentifierStepCount"));
    assert_eq!(records.value(0, "start_date"), Some("2024-01-01T10:00:00+01:00"));
    assert_eq!(records.value(1, "creation_date"), None);
    assert_eq!(records.value(1, "value"), Some("64"));
    assert_eq!(records.value(1, "metadata"), Some("{}"));
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();
    let source = BoltSource::new(dir.path().join("absent"));

    let err = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::MissingInput(_)));
    assert!(!store.has_schema("s_bolt"));
}

#[tokio::test]
async fn test_empty_root_is_fatal() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("readme.md"), "nothing to load");
    let store = MemoryStore::new();
    let source = SpotifySource::new(dir.path());

    let err = run_source(&source, &store, &LoadOptions::assume_yes())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::NoInputFiles { .. }));
    assert!(store.targets().is_empty());
}

#[test]
fn test_every_source_kind_builds_its_adapter() {
    let dir = tempdir().unwrap();
    for kind in SourceKind::ALL {
        let adapter = kind.adapter(dir.path().join(kind.name()));
        assert_eq!(adapter.schema(), kind.schema());
    }
}

#[tokio::test]
async fn test_ingest_single_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Upload.json");
    write(&path, r#"[{"id": 1, "tags": ["a", "b"]}, {"id": 2, "note": null}]"#);

    let store = MemoryStore::new();
    let report = ingest_file(&path, "staging", &store, Some(1)).await.unwrap();

    assert_eq!(report.table, "upload");
    assert_eq!(report.rows, 2);
    let table = store.table("staging", "upload").unwrap();
    assert_eq!(table.columns, vec!["id", "note", "tags_0", "tags_1"]);
    assert_eq!(table.rows[1], vec![s("2"), None, None, None]);
    assert_eq!(store.commit_count(), 2);
}

#[tokio::test]
async fn test_ingest_rejects_other_formats() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    write(&path, "hello");

    let store = MemoryStore::new();
    let err = ingest_file(&path, "staging", &store, None).await.unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
}
