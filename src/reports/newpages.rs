//! Static HTML list of new pages built from the recent-changes log.
//!
//! Each log line reads `number;datetime;type;title;target`, type `A` for a
//! new article and `R` for a new redirect to `target`.

use std::path::Path;

use chrono::NaiveDateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::error::{BotError, Result};
use crate::pipeline::{Ordering, Publisher, Rank, Record, Report, RunStats, Target, Truncation};

const TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

const HEADER: &str = r#"<!DOCTYPE html>
<html lang="pl">
<head><meta charset="utf-8"><title>Nowe strony</title></head>
<body>
<p>Stron: {count}</p>
<table>
<tr><th>Czas</th><th>Typ</th><th>Strona</th></tr>"#;

const FOOTER: &str = "</table>\n</body>\n</html>\n";

/// One raw line of the log file; keyed by its position so every line is
/// considered exactly once.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub number: usize,
    pub text: String,
}

impl Record for LogLine {
    fn key(&self) -> String {
        self.number.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub number: u64,
    pub time: NaiveDateTime,
    pub kind: String,
    pub title: String,
    pub target: Option<String>,
}

const LINE_BITS: u32 = 24;

/// Newest first under `Ordering::CountDesc`. Lines within the same minute
/// are ordered by their number in the log.
impl Rank for LogEntry {
    fn rank(&self) -> u64 {
        let seconds = (self.time.and_utc().timestamp().max(0) as u64).min(u64::MAX >> LINE_BITS);
        let line = self.number.min((1 << LINE_BITS) - 1);
        seconds << LINE_BITS | line
    }
}

/// `None` for anything that is not a complete log line.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(';').collect();
    let [number, time, kind, title, target] = fields.as_slice() else {
        return None;
    };
    let number = number.trim().parse().ok()?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(time.trim(), f).ok())?;
    let (kind, title) = (kind.trim(), title.trim());
    if kind.is_empty() || title.is_empty() {
        return None;
    }
    let target = Some(target.trim()).filter(|t| !t.is_empty()).map(str::to_string);
    Some(LogEntry {
        number,
        time,
        kind: kind.to_string(),
        title: title.to_string(),
        target,
    })
}

fn link(base: &str, title: &str) -> String {
    let href = format!("{}{}", base, title.replace(' ', "_"));
    format!(
        "<a href=\"{}\">{}</a>",
        encode_double_quoted_attribute(&href),
        encode_text(title)
    )
}

pub fn row(base: &str, entry: &LogEntry) -> String {
    let page = match (&entry.target, entry.kind.as_str()) {
        (Some(target), "R") => format!("{} → {}", link(base, &entry.title), link(base, target)),
        _ => link(base, &entry.title),
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
        entry.time.format("%Y-%m-%d %H:%M"),
        encode_text(&entry.kind),
        page
    )
}

pub fn read_log(path: &Path) -> Result<Vec<Result<LogLine>>> {
    let raw = std::fs::read_to_string(path).map_err(|source| BotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .enumerate()
        .map(|(number, text)| {
            Ok(LogLine {
                number,
                text: text.to_string(),
            })
        })
        .collect())
}

pub fn run(publisher: &Publisher, base: &str, maxlines: usize, log: &Path, out: &Path) -> Result<RunStats> {
    let report = Report::builder("newpages")
        .header(HEADER)
        .footer(FOOTER)
        .maxlines(maxlines)
        .truncation(Truncation::TopK)
        .ordering(Ordering::CountDesc)
        .build();

    report.run(
        read_log(log)?,
        |line: &LogLine| Ok(parse_line(&line.text)),
        |_, entry| row(base, entry),
        &Target::File(out.to_path_buf()),
        publisher,
    )
}
