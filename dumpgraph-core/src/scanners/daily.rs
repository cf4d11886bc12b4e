//! Built-in daily-count scanner
//!
//! Dump files are JSONL: one activity record per line. A record carries the
//! content kind it belongs to, the (guild, user) pair it is attributed to,
//! and a UTC timestamp. One [`DailyCountScanner`] instance per content type
//! counts the matching records per UTC day.
//!
//! Malformed lines are skipped with a warning; a file that yields nothing
//! for the member is simply not represented in the series.

use crate::corpus::CorpusHandle;
use crate::error::Result;
use crate::series::TimeSeries;
use crate::types::ContentType;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One activity record as stored in the dump files.
#[derive(Debug, Deserialize)]
struct DumpRecord {
    /// Content kind identifier, matching `ContentType::as_str()`
    kind: String,
    guild_id: u64,
    user_id: u64,
    timestamp: DateTime<Utc>,
}

/// Counts per-day dump records of one content kind for a member.
pub struct DailyCountScanner {
    content: ContentType,
}

impl DailyCountScanner {
    pub fn new(content: ContentType) -> Self {
        Self { content }
    }
}

impl super::ContentScanner for DailyCountScanner {
    fn content_type(&self) -> ContentType {
        self.content
    }

    fn search(&self, guild_id: u64, user_id: u64, corpus: &CorpusHandle) -> Result<TimeSeries> {
        let kind = self.content.as_str();
        let mut counts: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();
        let mut skipped_lines = 0usize;

        for path in &corpus.files {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    // A single unreadable dump must not sink the search.
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable dump file"
                    );
                    continue;
                }
            };

            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: DumpRecord = match serde_json::from_str(line) {
                    Ok(record) => record,
                    Err(_) => {
                        skipped_lines += 1;
                        continue;
                    }
                };

                if record.kind == kind
                    && record.guild_id == guild_id
                    && record.user_id == user_id
                {
                    *counts.entry(record.timestamp.date_naive()).or_insert(0) += 1;
                }
            }
        }

        if skipped_lines > 0 {
            tracing::warn!(
                content = %self.content,
                skipped_lines,
                "Skipped malformed dump lines during search"
            );
        }

        Ok(TimeSeries::from_counts(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusScanner;
    use crate::scanners::ContentScanner;
    use chrono::NaiveDate;

    fn write_dump(dir: &std::path::Path, name: &str, lines: &[&str]) {
        std::fs::write(dir.join(name), lines.join("\n")).unwrap();
    }

    fn record(kind: &str, guild: u64, user: u64, ts: &str) -> String {
        format!(
            r#"{{"kind":"{}","guild_id":{},"user_id":{},"timestamp":"{}"}}"#,
            kind, guild, user, ts
        )
    }

    #[test]
    fn test_counts_matching_records_per_day() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "a.jsonl",
            &[
                &record("messages", 1, 10, "2024-03-01T08:00:00Z"),
                &record("messages", 1, 10, "2024-03-01T21:30:00Z"),
                &record("messages", 1, 10, "2024-03-02T10:00:00Z"),
                // Different member, guild, and kind: all excluded
                &record("messages", 1, 11, "2024-03-01T09:00:00Z"),
                &record("messages", 2, 10, "2024-03-01T09:00:00Z"),
                &record("reactions", 1, 10, "2024-03-01T09:00:00Z"),
            ],
        );

        let corpus = CorpusScanner::scan(dir.path()).unwrap();
        let scanner = DailyCountScanner::new(ContentType::Messages);
        let series = scanner.search(1, 10, &corpus).unwrap();

        let expected: Vec<(NaiveDate, u64)> = vec![
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 2),
            (NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), 1),
        ];
        assert_eq!(series.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_zero_activity_is_empty_series_not_error() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "a.jsonl",
            &[&record("messages", 1, 10, "2024-03-01T08:00:00Z")],
        );

        let corpus = CorpusScanner::scan(dir.path()).unwrap();
        let scanner = DailyCountScanner::new(ContentType::Reactions);
        let series = scanner.search(1, 10, &corpus).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "a.jsonl",
            &[
                "{ this is not json",
                &record("messages", 1, 10, "2024-03-01T08:00:00Z"),
                "",
                r#"{"kind":"messages"}"#,
            ],
        );

        let corpus = CorpusScanner::scan(dir.path()).unwrap();
        let scanner = DailyCountScanner::new(ContentType::Messages);
        let series = scanner.search(1, 10, &corpus).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.values(), vec![1]);
    }

    #[test]
    fn test_deterministic_for_fixed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(
            dir.path(),
            "a.jsonl",
            &[
                &record("mentions", 7, 42, "2024-06-05T12:00:00Z"),
                &record("mentions", 7, 42, "2024-06-07T12:00:00Z"),
            ],
        );

        let corpus = CorpusScanner::scan(dir.path()).unwrap();
        let scanner = DailyCountScanner::new(ContentType::Mentions);
        let first = scanner.search(7, 42, &corpus).unwrap();
        let second = scanner.search(7, 42, &corpus).unwrap();
        assert_eq!(first, second);
    }
}
