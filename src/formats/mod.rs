//! Readers for the file formats found in data exports
//!
//! Each reader turns one file into a header list plus rows of optional
//! strings, ready for [`crate::pipeline::Pipeline::load_table`].

pub mod csv;
pub mod json;
pub mod xlsx;
pub mod xml;

use std::path::Path;

use crate::pipeline::IngestResult;

/// Text encoding a file was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte-order mark
    Utf8Bom,
    /// Fallback for legacy exports; every byte maps to one character
    Latin1,
}

/// Decode bytes as UTF-8 (BOM stripped), falling back to Latin-1
pub fn decode_text(bytes: Vec<u8>) -> (String, TextEncoding) {
    const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
    if let Some(rest) = bytes.strip_prefix(BOM)
        && let Ok(text) = std::str::from_utf8(rest)
    {
        return (text.to_string(), TextEncoding::Utf8Bom);
    }
    match String::from_utf8(bytes) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(e) => {
            let text = e.into_bytes().iter().map(|&b| b as char).collect();
            (text, TextEncoding::Latin1)
        }
    }
}

/// Read a whole text file with [`decode_text`]
pub fn read_text(path: &Path) -> IngestResult<(String, TextEncoding)> {
    let bytes = std::fs::read(path)?;
    let (text, encoding) = decode_text(bytes);
    if encoding == TextEncoding::Latin1 {
        tracing::warn!("{} is not valid UTF-8, decoded as Latin-1", path.display());
    }
    Ok((text, encoding))
}
