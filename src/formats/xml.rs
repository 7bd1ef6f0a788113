//! Streaming XML element reader
//!
//! Exports such as the health archive are too large to hold in memory, so
//! elements are read one at a time and only their attributes are kept.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::pipeline::{IngestError, IngestResult};

/// Attributes of one element, by local name
pub type Attributes = BTreeMap<String, String>;

/// Iterator over the attributes of every element with a given local name
pub struct ElementAttributes<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    tag: Vec<u8>,
    path: PathBuf,
    done: bool,
}

impl ElementAttributes<BufReader<File>> {
    /// Stream `<tag ...>` elements from a file
    pub fn open(path: &Path, tag: &str) -> IngestResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), path, tag))
    }
}

impl<R: BufRead> ElementAttributes<R> {
    pub fn from_reader(reader: R, path: &Path, tag: &str) -> Self {
        Self {
            reader: Reader::from_reader(reader),
            buf: Vec::new(),
            tag: tag.as_bytes().to_vec(),
            path: path.to_path_buf(),
            done: false,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> IngestError {
        IngestError::Xml {
            path: self.path.clone(),
            message: format!(
                "{} (at byte {})",
                message,
                self.reader.buffer_position()
            ),
        }
    }
}

fn collect_attributes(element: &BytesStart<'_>) -> Result<Attributes, String> {
    let mut out = Attributes::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        out.insert(key, value.into_owned());
    }
    Ok(out)
}

impl<R: BufRead> Iterator for ElementAttributes<R> {
    type Item = IngestResult<Attributes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.local_name().as_ref() == self.tag.as_slice() =>
                {
                    let attrs = collect_attributes(&e);
                    return Some(attrs.map_err(|msg| self.error(msg)));
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(self.error(e)));
                }
            }
        }
    }
}

/// Count `<tag>` elements without keeping them
pub fn count_elements(path: &Path, tag: &str) -> IngestResult<u64> {
    let file = File::open(path)?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut buf = Vec::new();
    let mut count = 0u64;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                count += 1;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(IngestError::Xml {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
        buf.clear();
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData [
<!ELEMENT HealthData (Record*)>
]>
<HealthData locale="en_DE">
 <Record type="HKQuantityTypeIdentifierStepCount" sourceName="Jim&apos;s iPhone" unit="count" value="42"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" unit="count/min" value="61">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
 <Workout workoutActivityType="HKWorkoutActivityTypeWalking"/>
</HealthData>
"#;

    #[test]
    fn test_reads_record_attributes() {
        let records: Vec<Attributes> =
            ElementAttributes::from_reader(SAMPLE.as_bytes(), Path::new("export.xml"), "Record")
                .collect::<IngestResult<_>>()
                .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["sourceName"], "Jim's iPhone");
        assert_eq!(records[1]["value"], "61");
        assert!(!records[1].contains_key("key"));
    }

    #[test]
    fn test_count_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(count_elements(&path, "Record").unwrap(), 2);
        assert_eq!(count_elements(&path, "Workout").unwrap(), 1);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let broken = "<HealthData><Record type=\"x\"></HealthData>";
        let results: Vec<IngestResult<Attributes>> =
            ElementAttributes::from_reader(broken.as_bytes(), Path::new("bad.xml"), "Record")
                .collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}
