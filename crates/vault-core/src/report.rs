//! Text and JSON rendering of record collections.
//!
//! Everything here is a pure function of its inputs so both front ends print
//! identical lines for the same data.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::Record;

/// Title line at the top of every export file.
pub const EXPORT_TITLE: &str = "SECURE DATA VAULT EXPORT";

/// Shown instead of aggregate fields when the vault is empty.
pub const NO_RECORDS_MESSAGE: &str = "No records found.";

/// One line per record, 1-based.
pub fn render_line(index: usize, record: &Record) -> String {
    format!(
        "{}. ID: {} | Name: {} | Created: {}",
        index + 1,
        record.id,
        record.name,
        record.created
    )
}

/// Render a record list, one line each, newline terminated.
pub fn render_list(records: &[Record]) -> String {
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        let _ = writeln!(out, "{}", render_line(i, record));
    }
    out
}

/// Render the full export document.
pub fn render_export(records: &[Record], exported_at: DateTime<Utc>, file_label: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", EXPORT_TITLE);
    let _ = writeln!(
        out,
        "Export Date: {}",
        exported_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(out, "Total Records: {}", records.len());
    let _ = writeln!(out, "File: {}", file_label);
    out.push('\n');
    out.push_str(&render_list(records));
    out
}

// =============================================================================
// Statistics
// =============================================================================

/// Aggregates that only exist for a non-empty vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub longest_name: String,
    pub longest_name_length: usize,
    pub earliest_record: NaiveDate,
    pub latest_record: NaiveDate,
    pub average_name_length: f64,
    /// Whole days between the earliest and latest record.
    pub day_span: i64,
}

/// Vault statistics as reported by both front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_records: usize,
    pub last_modified: DateTime<Utc>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub summary: Option<StatsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Statistics {
    /// Compute statistics over `records`.
    ///
    /// Name lengths count characters, not bytes. On equal length the record
    /// seen first keeps the title.
    pub fn compute(records: &[Record], last_modified: DateTime<Utc>) -> Self {
        let Some(first) = records.first() else {
            return Self {
                total_records: 0,
                last_modified,
                summary: None,
                message: Some(NO_RECORDS_MESSAGE.to_string()),
            };
        };

        let name_len = |r: &Record| r.name.chars().count();

        let longest = records.iter().fold(first, |longest, current| {
            if name_len(current) > name_len(longest) {
                current
            } else {
                longest
            }
        });

        let mut earliest = first.created;
        let mut latest = first.created;
        let mut total_len = 0usize;
        for record in records {
            earliest = earliest.min(record.created);
            latest = latest.max(record.created);
            total_len += name_len(record);
        }

        Self {
            total_records: records.len(),
            last_modified,
            summary: Some(StatsSummary {
                longest_name: longest.name.clone(),
                longest_name_length: name_len(longest),
                earliest_record: earliest,
                latest_record: latest,
                average_name_length: total_len as f64 / records.len() as f64,
                day_span: (latest - earliest).num_days(),
            }),
            message: None,
        }
    }
}

/// Render statistics as console text.
pub fn render_statistics(stats: &Statistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Records: {}", stats.total_records);
    let _ = writeln!(
        out,
        "Last Modified: {}",
        stats
            .last_modified
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    match &stats.summary {
        Some(summary) => {
            let _ = writeln!(
                out,
                "Longest Name: {} ({} characters)",
                summary.longest_name, summary.longest_name_length
            );
            let _ = writeln!(out, "Earliest Record: {}", summary.earliest_record);
            let _ = writeln!(out, "Latest Record: {}", summary.latest_record);
            let _ = writeln!(
                out,
                "Average Name Length: {:.2} characters",
                summary.average_name_length
            );
            let _ = writeln!(out, "Date Span: {} days", summary.day_span);
        }
        None => {
            let _ = writeln!(out, "{}", NO_RECORDS_MESSAGE);
        }
    }
    out
}
