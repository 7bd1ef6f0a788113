//! Column and table name normalisation
//!
//! Every source header, JSON key and file name passes through here before it
//! becomes a Postgres identifier.

use std::collections::HashSet;
use std::path::Path;

/// Postgres truncates identifiers beyond this many bytes
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// Normalise one raw header
///
/// Trims, lowercases, removes parentheses and maps every remaining character
/// that is not alphanumeric or `_` (spaces, hyphens, periods, ...) to `_`.
/// Applying it twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use landing_loader::pipeline::headers::clean_header;
///
/// assert_eq!(clean_header(" Pick-up Address "), "pick_up_address");
/// assert_eq!(clean_header("Amount (EUR)"), "amount_eur");
/// assert_eq!(clean_header("ts.start"), "ts_start");
/// ```
pub fn clean_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Normalise a full header row into unique column names
///
/// Missing headers, and headers that clean to nothing but underscores, become
/// `column_<index>`. Later duplicates get `_1`, `_2`, ... in order of appearance.
pub fn sanitize_headers<S: AsRef<str>>(raw: &[Option<S>]) -> Vec<String> {
    let base: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let cleaned = header
                .as_ref()
                .map(|h| clean_header(h.as_ref()))
                .unwrap_or_default();
            if cleaned.chars().all(|c| c == '_') {
                format!("column_{}", idx)
            } else {
                truncate_identifier(&cleaned, MAX_IDENTIFIER_BYTES)
            }
        })
        .collect();

    dedupe(base)
}

/// Same as [`sanitize_headers`] for headers that are always present
pub fn sanitize_header_strings<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let wrapped: Vec<Option<&str>> = raw.iter().map(|h| Some(h.as_ref())).collect();
    sanitize_headers(&wrapped)
}

fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut unique = UniqueNames::new();
    names.iter().map(|name| unique.claim(name)).collect()
}

/// Identifiers handed out so far within one scope (a header row, a run)
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` cut to [`MAX_IDENTIFIER_BYTES`], suffixed `_1`, `_2`, ... when already taken
    ///
    /// Suffixes replace trailing bytes rather than extend past the limit, so
    /// two long names sharing a prefix stay distinct after Postgres sees them.
    pub fn claim(&mut self, name: &str) -> String {
        let name = truncate_identifier(name, MAX_IDENTIFIER_BYTES);
        if self.taken.insert(name.clone()) {
            return name;
        }
        let mut n = 1usize;
        loop {
            let suffix = format!("_{}", n);
            let candidate = format!(
                "{}{}",
                truncate_identifier(&name, MAX_IDENTIFIER_BYTES - suffix.len()),
                suffix
            );
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Cut `name` to at most `max_bytes`, on a character boundary
pub fn truncate_identifier(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Default table name for a file: the cleaned file stem
///
/// ```
/// use landing_loader::pipeline::headers::table_name_from_file;
///
/// assert_eq!(table_name_from_file("Rides Export.csv"), "rides_export");
/// assert_eq!(table_name_from_file("/tmp/StreamingHistory0.json"), "streaminghistory0");
/// ```
pub fn table_name_from_file(file_name: impl AsRef<Path>) -> String {
    let stem = file_name
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = clean_header(&stem);
    if cleaned.chars().all(|c| c == '_') {
        "table".to_string()
    } else {
        truncate_identifier(&cleaned, MAX_IDENTIFIER_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_header_rules() {
        assert_eq!(clean_header("  Name  "), "name");
        assert_eq!(clean_header("First Name"), "first_name");
        assert_eq!(clean_header("e-mail"), "e_mail");
        assert_eq!(clean_header("v1.2"), "v1_2");
        assert_eq!(clean_header("(total)"), "total");
        assert_eq!(clean_header("Größe"), "größe");
    }

    #[test]
    fn test_clean_header_is_idempotent() {
        for raw in ["Pick-up Address", "Amount (EUR)", "a.b-c d", "İstanbul", "%%%", ""] {
            let once = clean_header(raw);
            assert_eq!(clean_header(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_duplicate_headers_get_suffixes() {
        let headers = sanitize_header_strings(&["Pick-up Address", "Pick-up Address"]);
        assert_eq!(headers, vec!["pick_up_address", "pick_up_address_1"]);
    }

    #[test]
    fn test_triple_duplicates() {
        let headers = sanitize_header_strings(&["a", "A", " a "]);
        assert_eq!(headers, vec!["a", "a_1", "a_2"]);
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let headers = sanitize_header_strings(&["a", "a_1", "a"]);
        assert_eq!(headers, vec!["a", "a_1", "a_2"]);
    }

    #[test]
    fn test_missing_and_empty_headers() {
        let headers = sanitize_headers(&[Some("id"), None, Some("  "), Some("()")]);
        assert_eq!(headers, vec!["id", "column_1", "column_2", "column_3"]);
    }

    #[test]
    fn test_all_symbol_header_gets_placeholder() {
        let headers = sanitize_header_strings(&["---", "%"]);
        assert_eq!(headers, vec!["column_0", "column_1"]);
    }

    #[test]
    fn test_long_headers_are_truncated_uniquely() {
        let long = "x".repeat(80);
        let headers = sanitize_header_strings(&[long.as_str(), long.as_str()]);
        assert_eq!(headers[0].len(), MAX_IDENTIFIER_BYTES);
        assert_eq!(headers[1].len(), MAX_IDENTIFIER_BYTES);
        assert!(headers[1].ends_with("_1"));
        assert_ne!(headers[0], headers[1]);
    }

    #[test]
    fn test_unique_names_across_claims() {
        let mut names = UniqueNames::new();
        let long = format!("complete_{}", "recommendations_received_".repeat(3));
        let first = names.claim(&format!("{}2023", long));
        let second = names.claim(&format!("{}2024", long));
        assert_eq!(first.len(), MAX_IDENTIFIER_BYTES);
        assert!(second.len() <= MAX_IDENTIFIER_BYTES);
        assert_ne!(first, second);
        assert_eq!(names.claim("rides"), "rides");
        assert_eq!(names.claim("rides"), "rides_1");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let s = "ä".repeat(40);
        let cut = truncate_identifier(&s, 63);
        assert!(cut.len() <= 63);
        assert!(cut.chars().all(|c| c == 'ä'));
    }

    #[test]
    fn test_table_name_from_file() {
        assert_eq!(table_name_from_file("rides.csv"), "rides");
        assert_eq!(table_name_from_file("Connections.CSV"), "connections");
        assert_eq!(table_name_from_file("my-data.v2.csv"), "my_data_v2");
        assert_eq!(table_name_from_file("(().csv"), "table");
    }
}
