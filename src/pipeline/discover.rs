//! Input file discovery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{IngestError, IngestResult};

/// Tabular formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
    Json,
    Xml,
}

impl FileFormat {
    /// Format from a file extension, case-insensitively
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xlsm" | "xls" => Some(FileFormat::Xlsx),
            "json" => Some(FileFormat::Json),
            "xml" => Some(FileFormat::Xml),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "CSV"),
            FileFormat::Xlsx => write!(f, "Excel"),
            FileFormat::Json => write!(f, "JSON"),
            FileFormat::Xml => write!(f, "XML"),
        }
    }
}

/// One file found under a source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path to the file
    pub path: PathBuf,
    pub format: FileFormat,
    /// File size in bytes
    pub size: u64,
    pub discovered_at: DateTime<Utc>,
}

impl SourceFile {
    /// Stat `path` and classify it by extension
    pub fn new(path: PathBuf) -> IngestResult<Self> {
        let metadata = std::fs::metadata(&path)?;
        let format = FileFormat::from_path(&path).ok_or_else(|| IngestError::UnsupportedFormat {
            path: path.clone(),
            expected: "a CSV, Excel, JSON or XML file".to_string(),
        })?;
        Ok(Self {
            path,
            format,
            size: metadata.len(),
            discovered_at: Utc::now(),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path relative to `root`, for display
    pub fn display_relative(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .display()
            .to_string()
    }
}

/// Editor lock files and macOS resource forks that share real extensions
fn is_junk(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("._") || n.starts_with("~$") || n == ".DS_Store")
        .unwrap_or(false)
}

/// Find files matching a glob `pattern` below `root`, case-insensitively
///
/// Results are sorted by path so runs are reproducible.
pub fn discover_files(root: &Path, pattern: &str) -> IngestResult<Vec<SourceFile>> {
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries =
        glob::glob_with(&full_pattern, options).map_err(|e| IngestError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && !is_junk(&path) {
                    files.push(SourceFile::new(path)?);
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing path: {}", e);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// [`discover_files`] for several patterns, de-duplicated and sorted
pub fn discover_all(root: &Path, patterns: &[&str]) -> IngestResult<Vec<SourceFile>> {
    let mut files = Vec::new();
    for pattern in patterns {
        for file in discover_files(root, pattern)? {
            if !files.iter().any(|f: &SourceFile| f.path == file.path) {
                files.push(file);
            }
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("a/Rides.CSV")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("x.xlsx")),
            Some(FileFormat::Xlsx)
        );
        assert_eq!(FileFormat::from_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_discover_recursive_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("nested/a.CSV"), "x\n1\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "x").unwrap();
        fs::write(dir.path().join("._b.csv"), "junk").unwrap();

        let files = discover_files(dir.path(), "**/*.csv").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.display_relative(dir.path()))
            .collect();
        assert_eq!(names, vec!["b.csv", "nested/a.CSV"]);
        assert_eq!(files[0].size, 4);
        assert_eq!(files[0].format, FileFormat::Csv);
    }

    #[test]
    fn test_discover_all_dedupes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("b.csv"), "x\n").unwrap();

        let files = discover_all(dir.path(), &["*.json", "**/*.json", "**/*.csv"]).unwrap();
        assert_eq!(files.len(), 2);
    }
}
