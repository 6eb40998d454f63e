//! Tabular output and link-file input.
//!
//! Two fixed CSV schemas: the full match schema written by the harvest
//! phase, and the link-only schema written by the enumeration phase and read
//! back by `harvest`. Absent values are empty cells.

use std::io::{self, Write};
use std::mem::take;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::{FederationId, LinkTask, MatchRecord};
use crate::infrastructure::harvest_error::{HarvestError, HarvestResult};

pub const FULL_HEADERS: [&str; 10] = [
    "Datum",
    "Tid",
    "Serie",
    "Hemmalag",
    "Bortalag",
    "Arena",
    "Matchnummer",
    "Domare1",
    "Domare2",
    "url",
];

pub const LINK_HEADERS: [&str; 3] = ["date", "federationId", "match_link"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Minimal CSV parser (quotes and CRLF tolerant); blank lines are skipped
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() == 1 && row[0].trim().is_empty() {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

fn cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Full-schema row for one record
pub fn record_row(record: &MatchRecord) -> Vec<String> {
    vec![
        record.date_iso().unwrap_or_default(),
        cell(record.time.as_deref()),
        cell(record.competition.as_deref()),
        cell(record.home_team.as_deref()),
        cell(record.away_team.as_deref()),
        cell(record.venue.as_deref()),
        cell(record.match_number.as_deref()),
        cell(record.referee1.as_deref()),
        cell(record.referee2.as_deref()),
        record.source_url.clone(),
    ]
}

/// Link-only row for one task
pub fn link_row(task: &LinkTask) -> Vec<String> {
    vec![
        task.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        task.federation_id.map(|f| f.to_string()).unwrap_or_default(),
        task.detail_url.clone(),
    ]
}

pub fn records_to_csv(records: &[MatchRecord]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_row(&mut buf, &FULL_HEADERS);
    for record in records {
        let _ = write_row(&mut buf, &record_row(record));
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn links_to_csv(tasks: &[LinkTask]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let _ = write_row(&mut buf, &LINK_HEADERS);
    for task in tasks {
        let _ = write_row(&mut buf, &link_row(task));
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parse a links file: either the link-only CSV or one URL per line
pub fn parse_link_tasks(text: &str) -> Vec<LinkTask> {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    let is_csv = first_line
        .split(',')
        .any(|h| h.trim().eq_ignore_ascii_case("match_link"));

    if !is_csv {
        return text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(LinkTask::from_url)
            .collect();
    }

    let mut rows = parse_rows(text).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let column = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (date_col, fed_col, link_col) = (column("date"), column("federationId"), column("match_link"));

    rows.filter_map(|row| {
        let url = row.get(link_col?)?.trim();
        if url.is_empty() {
            return None;
        }
        let date = date_col
            .and_then(|i| row.get(i))
            .and_then(|d| chrono::NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
        let federation_id = fed_col
            .and_then(|i| row.get(i))
            .and_then(|f| f.parse::<FederationId>().ok());
        Some(LinkTask {
            date,
            federation_id,
            detail_url: url.to_string(),
        })
    })
    .collect()
}

fn io_error(path: &Path, e: &io::Error) -> HarvestError {
    HarvestError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Writes finished batches to CSV files
#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    path: PathBuf,
}

impl CsvRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, contents: String) -> HarvestResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| io_error(&self.path, &e))
    }

    /// Write the full schema, records in the given order
    pub async fn write_records(&self, records: &[MatchRecord]) -> HarvestResult<()> {
        self.write(records_to_csv(records)).await?;
        info!("💾 Wrote {} records to {:?}", records.len(), self.path);
        Ok(())
    }

    /// Write the link-only schema
    pub async fn write_links(&self, tasks: &[LinkTask]) -> HarvestResult<()> {
        self.write(links_to_csv(tasks)).await?;
        info!("💾 Wrote {} links to {:?}", tasks.len(), self.path);
        Ok(())
    }
}

/// Read link tasks from a links file or link-only CSV
pub async fn read_link_tasks(path: &Path) -> HarvestResult<Vec<LinkTask>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path, &e))?;
    Ok(parse_link_tasks(&text))
}
