//! Pre-flight estimate and confirmation
//!
//! Before touching the database a run prints what it found and how long it
//! expects to take, then asks for confirmation. Non-interactive sessions
//! proceed without asking. The prompt installs no signal handler: Ctrl-C is
//! left to the caller, which [`super::run_source`] watches for the whole run.

use std::collections::BTreeMap;
use std::io::{BufRead, IsTerminal, Write};

use super::discover::{FileFormat, SourceFile};
use super::error::{IngestError, IngestResult};

const MB: f64 = 1024.0 * 1024.0;

/// Processing-rate heuristic behind an estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    BytesPerSecond(f64),
    RecordsPerSecond(f64),
}

impl Throughput {
    /// Collections of CSV, Excel and JSON files
    pub const FILE_COLLECTION: Throughput = Throughput::BytesPerSecond(5.0 * MB);
    /// One large messaging export
    pub const MESSAGE_EXPORT: Throughput = Throughput::BytesPerSecond(7.0 * MB);
    /// Streaming XML health records
    pub const HEALTH_RECORDS: Throughput = Throughput::RecordsPerSecond(50_000.0);
}

/// Work a run is about to do
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub files: usize,
    pub bytes: u64,
    /// Record count, when a pre-scan produced one
    pub records: Option<u64>,
    pub throughput: Throughput,
    /// File count and bytes per format
    pub by_format: BTreeMap<FileFormat, (usize, u64)>,
}

impl Estimate {
    pub fn from_files(files: &[SourceFile], throughput: Throughput) -> Self {
        let mut by_format: BTreeMap<FileFormat, (usize, u64)> = BTreeMap::new();
        for file in files {
            let entry = by_format.entry(file.format).or_default();
            entry.0 += 1;
            entry.1 += file.size;
        }
        Self {
            files: files.len(),
            bytes: files.iter().map(|f| f.size).sum(),
            records: None,
            throughput,
            by_format,
        }
    }

    pub fn with_records(mut self, records: u64) -> Self {
        self.records = Some(records);
        self
    }

    /// Expected wall-clock seconds
    pub fn seconds(&self) -> f64 {
        match self.throughput {
            Throughput::BytesPerSecond(rate) => self.bytes as f64 / rate,
            Throughput::RecordsPerSecond(rate) => self.records.unwrap_or(0) as f64 / rate,
        }
    }

    /// Multi-line summary printed before the prompt
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (format, (count, bytes)) in &self.by_format {
            out.push_str(&format!(
                "  {:<6} {:>5} file(s)  {}\n",
                format.to_string(),
                count,
                format_size(*bytes)
            ));
        }
        out.push_str(&format!("Total Size: {}\n", format_size(self.bytes)));
        if let Some(records) = self.records {
            out.push_str(&format!("Total Records: {}\n", group_thousands(records)));
        }
        let rate = match self.throughput {
            Throughput::BytesPerSecond(r) => format!("~{:.0} MB/s", r / MB),
            Throughput::RecordsPerSecond(r) => format!("~{} rec/s", group_thousands(r as u64)),
        };
        out.push_str(&format!(
            "Estimated Processing Time: ~{:.1} seconds ({})",
            self.seconds(),
            rate
        ));
        out
    }
}

/// `12.34 MB`
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MB)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Outcome of the confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Proceed,
    Abort,
}

/// Interpret a typed answer; an empty answer takes the default
pub fn parse_answer(input: &str, default_yes: bool) -> Answer {
    match input.trim().to_lowercase().as_str() {
        "" if default_yes => Answer::Proceed,
        "y" | "yes" => Answer::Proceed,
        _ => Answer::Abort,
    }
}

/// The `(y/N)` / `[Y/n]` hint for a prompt
pub fn prompt_hint(default_yes: bool) -> &'static str {
    if default_yes { "[Y/n]" } else { "(y/N)" }
}

/// Ask `question` on the terminal
///
/// Returns `Ok(())` to proceed and [`IngestError::Aborted`] on refusal.
/// Skips the prompt when `assume_yes` is set or stdin is not a terminal, and
/// proceeds when stdin is closed before an answer arrives.
pub async fn confirm(question: &str, default_yes: bool, assume_yes: bool) -> IngestResult<()> {
    if assume_yes {
        return Ok(());
    }
    if !std::io::stdin().is_terminal() {
        println!("Non-interactive session detected, proceeding...");
        return Ok(());
    }

    print!("\n{} {}: ", question, prompt_hint(default_yes));
    std::io::stdout().flush()?;

    // Blocking read on a detached thread; a dropped prompt never holds up shutdown
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let result = std::io::stdin().lock().read_line(&mut line).map(|n| (n, line));
        let _ = tx.send(result);
    });

    match rx.await {
        Ok(Ok((0, _))) | Err(_) => {
            println!("\nNon-interactive session detected, proceeding...");
            Ok(())
        }
        Ok(Ok((_, line))) => match parse_answer(&line, default_yes) {
            Answer::Proceed => Ok(()),
            Answer::Abort => {
                println!("Operation cancelled.");
                Err(IngestError::Aborted)
            }
        },
        Ok(Err(e)) => Err(IngestError::Io(e)),
    }
}
