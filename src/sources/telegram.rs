//! Telegram Desktop JSON export (`result.json`)
//!
//! The whole export is one document: contacts, every chat with its messages,
//! and the account's personal information. It is split into fixed-shape
//! tables; the raw JSON of chats and messages is kept alongside.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::database::Row;
use crate::formats::json::{flatten, read_json, scalar_text};
use crate::pipeline::headers::sanitize_header_strings;
use crate::pipeline::{
    Estimate, IngestResult, Pipeline, SourceAdapter, SourceFile, TableLoad, Throughput,
    discover_files,
};

pub const SCHEMA: &str = "s_telegram";
pub const RESULT_FILE: &str = "result.json";

pub const CONTACT_COLUMNS: [&str; 4] = ["first_name", "last_name", "phone_number", "date_unixtime"];
pub const CHAT_COLUMNS: [&str; 4] = ["id", "name", "type", "raw_data"];
pub const MESSAGE_COLUMNS: [&str; 10] = [
    "id",
    "chat_id",
    "date",
    "date_unixtime",
    "sender",
    "sender_id",
    "text",
    "type",
    "reply_to_message_id",
    "raw_data",
];

pub struct TelegramSource {
    root: PathBuf,
}

impl TelegramSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Find `result.json`: the path itself, directly inside it, or the
/// shallowest match below it
pub fn find_result_json(path: &Path) -> IngestResult<Option<PathBuf>> {
    if path.is_file() {
        let is_result = path.file_name().is_some_and(|n| n == RESULT_FILE);
        return Ok(is_result.then(|| path.to_path_buf()));
    }
    let direct = path.join(RESULT_FILE);
    if direct.is_file() {
        return Ok(Some(direct));
    }
    if !path.is_dir() {
        return Ok(None);
    }
    let found = discover_files(path, &format!("**/{}", RESULT_FILE))?;
    Ok(found
        .into_iter()
        .min_by_key(|f| f.path.components().count())
        .map(|f| f.path))
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(scalar_text)
}

/// Contacts live under `contacts.list`; some exports have a bare array
pub fn contact_list(document: &Value) -> &[Value] {
    match document.get("contacts") {
        Some(Value::Object(contacts)) => match contacts.get("list") {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

pub fn chat_list(document: &Value) -> &[Value] {
    match document.get("chats").and_then(|c| c.get("list")) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

pub fn contact_row(contact: &Value) -> Row {
    let Some(contact) = contact.as_object() else {
        return vec![None; CONTACT_COLUMNS.len()];
    };
    CONTACT_COLUMNS.iter().map(|c| field(contact, c)).collect()
}

/// Chat row; `raw_data` omits the message array. `None` for chats without an id
pub fn chat_row(chat: &Value) -> Option<Row> {
    let chat = chat.as_object()?;
    let id = field(chat, "id")?;
    let mut raw = chat.clone();
    raw.remove("messages");
    Some(vec![
        Some(id),
        field(chat, "name"),
        field(chat, "type"),
        Some(Value::Object(raw).to_string()),
    ])
}

/// Message text: plain strings and entity `text` fields, concatenated
pub fn message_text(text: Option<&Value>) -> Option<String> {
    match text? {
        Value::Array(parts) => Some(
            parts
                .iter()
                .map(|part| match part {
                    Value::String(s) => s.as_str(),
                    Value::Object(entity) => entity.get("text").and_then(Value::as_str).unwrap_or(""),
                    _ => "",
                })
                .collect(),
        ),
        other => scalar_text(other),
    }
}

pub fn message_row(chat_id: &str, message: &Value) -> Row {
    let Some(m) = message.as_object() else {
        let mut row = vec![None; MESSAGE_COLUMNS.len()];
        row[1] = Some(chat_id.to_string());
        row[9] = Some(message.to_string());
        return row;
    };
    vec![
        field(m, "id"),
        Some(chat_id.to_string()),
        field(m, "date"),
        field(m, "date_unixtime"),
        field(m, "from"),
        field(m, "from_id"),
        message_text(m.get("text")),
        field(m, "type"),
        field(m, "reply_to_message_id"),
        Some(message.to_string()),
    ]
}

fn chat_messages(chat: &Value) -> &[Value] {
    match chat.get("messages") {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

#[async_trait(?Send)]
impl SourceAdapter for TelegramSource {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        format!("'{}' (Telegram JSON export)", RESULT_FILE)
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        match find_result_json(&self.root)? {
            Some(path) => Ok(vec![SourceFile::new(path)?]),
            None => Ok(Vec::new()),
        }
    }

    fn estimate(&self, files: &[SourceFile]) -> IngestResult<Estimate> {
        Ok(Estimate::from_files(files, Throughput::MESSAGE_EXPORT))
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        println!("Reading JSON from {}...", file.path.display());
        let document = read_json(&file.path)?;

        let contacts = contact_list(&document);
        if !contacts.is_empty() {
            let written = pipeline
                .load_table(
                    TableLoad::full_refresh("contacts", columns(&CONTACT_COLUMNS)),
                    contacts.iter().map(|c| Ok(contact_row(c))),
                )
                .await?;
            println!("Inserted {} contacts.", written);
        }

        let chats = chat_list(&document);
        if !chats.is_empty() {
            println!("Processing {} chats...", chats.len());
            let kept: Vec<(Row, &Value)> = chats
                .iter()
                .filter_map(|chat| chat_row(chat).map(|row| (row, chat)))
                .collect();
            let skipped = chats.len() - kept.len();
            if skipped > 0 {
                tracing::warn!("Skipped {} chats without an id", skipped);
            }
            let message_count: usize = kept.iter().map(|(_, chat)| chat_messages(chat).len()).sum();

            let chat_written = pipeline
                .load_table(
                    TableLoad::full_refresh("chats", columns(&CHAT_COLUMNS)),
                    kept.iter().map(|(row, _)| Ok(row.clone())),
                )
                .await?;

            let messages = kept.iter().flat_map(|(row, chat)| {
                let chat_id = row[0].clone().unwrap_or_default();
                chat_messages(chat)
                    .iter()
                    .map(move |m| Ok(message_row(&chat_id, m)))
            });
            let message_written = pipeline
                .load_table(
                    TableLoad::full_refresh("messages", columns(&MESSAGE_COLUMNS))
                        .with_expected_rows(message_count as u64),
                    messages,
                )
                .await?;
            println!(
                "Inserted {} chats and {} messages.",
                chat_written, message_written
            );
        }

        if let Some(info @ Value::Object(_)) = document.get("personal_information") {
            let pairs = flatten(info);
            if !pairs.is_empty() {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                let row: Row = pairs.iter().map(|(_, v)| v.clone()).collect();
                pipeline
                    .load_table(
                        TableLoad::full_refresh(
                            "personal_information",
                            sanitize_header_strings(&keys),
                        ),
                        std::iter::once(Ok(row)),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contact_list_shapes() {
        let nested = json!({"contacts": {"about": "x", "list": [{"first_name": "Ada"}]}});
        let bare = json!({"contacts": [{"first_name": "Ada"}, {"first_name": "Bo"}]});
        assert_eq!(contact_list(&nested).len(), 1);
        assert_eq!(contact_list(&bare).len(), 2);
        assert!(contact_list(&json!({})).is_empty());
    }

    #[test]
    fn test_chat_row_drops_messages_from_raw() {
        let chat = json!({"id": 42, "name": "Family", "type": "private_group",
                          "messages": [{"id": 1}]});
        let row = chat_row(&chat).unwrap();
        assert_eq!(row[0].as_deref(), Some("42"));
        let raw: Value = serde_json::from_str(row[3].as_deref().unwrap()).unwrap();
        assert!(raw.get("messages").is_none());
        assert_eq!(raw["name"], "Family");

        assert!(chat_row(&json!({"name": "no id"})).is_none());
    }

    #[test]
    fn test_message_text_joins_entities() {
        let text = json!(["see ", {"type": "link", "text": "https://t.me"}, "!"]);
        assert_eq!(message_text(Some(&text)).as_deref(), Some("see https://t.me!"));
        assert_eq!(message_text(Some(&json!("plain"))).as_deref(), Some("plain"));
        assert_eq!(message_text(None), None);
    }

    #[test]
    fn test_message_row_fields() {
        let message = json!({"id": 7, "type": "message", "date": "2024-02-01T10:00:00",
                             "date_unixtime": "1706778000", "from": "Jim", "from_id": "user1",
                             "text": "hi", "reply_to_message_id": 6});
        let row = message_row("42", &message);
        assert_eq!(row.len(), MESSAGE_COLUMNS.len());
        assert_eq!(row[0].as_deref(), Some("7"));
        assert_eq!(row[1].as_deref(), Some("42"));
        assert_eq!(row[4].as_deref(), Some("Jim"));
        assert_eq!(row[6].as_deref(), Some("hi"));
        assert_eq!(row[8].as_deref(), Some("6"));
    }

    #[test]
    fn test_find_result_json_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("DataExport_2024-01-01");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(RESULT_FILE), "{}").unwrap();

        let found = find_result_json(dir.path()).unwrap().unwrap();
        assert!(found.ends_with(format!("DataExport_2024-01-01/{}", RESULT_FILE)));
        assert_eq!(find_result_json(&found).unwrap(), Some(found.clone()));
    }
}
