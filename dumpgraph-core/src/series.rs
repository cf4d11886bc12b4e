//! Time series and the tabular artifact format
//!
//! A [`TimeSeries`] is an ordered mapping from a UTC day to an activity
//! count, produced fresh per request by a scanner. Empty series are valid:
//! "no recorded activity" is a legitimate result, never an error.
//!
//! [`CsvTable`] serializes a series to the two-column `date,count` table the
//! pipeline leaves on disk as its tabular artifact. The format is lossless:
//! reading a dumped table reproduces the bucket keys and values exactly.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Ordered day-bucketed activity counts for one (content type, member) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    // Sorted by date, no duplicate dates. Construction goes through a
    // BTreeMap so the invariant holds by build.
    points: Vec<(NaiveDate, u64)>,
}

impl TimeSeries {
    /// Empty series (valid: a member with zero recorded activity).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from per-day counts.
    pub fn from_counts(counts: BTreeMap<NaiveDate, u64>) -> Self {
        Self {
            points: counts.into_iter().collect(),
        }
    }

    /// Bucket keys in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    /// Values in bucket order.
    pub fn values(&self) -> Vec<u64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Iterate over `(date, count)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Count recorded for `date`; zero if the series has no such bucket.
    pub fn value_on(&self, date: NaiveDate) -> u64 {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .map(|i| self.points[i].1)
            .unwrap_or(0)
    }

    /// Values re-keyed onto `grid`, zero-filled where this series has no
    /// bucket for a grid date.
    pub fn sample(&self, grid: &[NaiveDate]) -> Vec<u64> {
        grid.iter().map(|d| self.value_on(*d)).collect()
    }

    /// First and last bucket dates, if the series has any.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.points.first(), self.points.last()) {
            (Some((first, _)), Some((last, _))) => Some((*first, *last)),
            _ => None,
        }
    }
}

impl FromIterator<(NaiveDate, u64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u64)>>(iter: I) -> Self {
        Self::from_counts(iter.into_iter().collect())
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const HEADER: &str = "date,count";

/// Two-column tabular artifact: `date,count` per bucket.
pub struct CsvTable;

impl CsvTable {
    /// Write `series` to `path`, overwriting any previous artifact.
    pub fn dump(series: &TimeSeries, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(series.len() * 16 + HEADER.len() + 1);
        writeln!(out, "{}", HEADER)?;
        for (date, count) in series.iter() {
            writeln!(out, "{},{}", date.format(DATE_FORMAT), count)?;
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    /// Read a previously dumped table back into a series.
    pub fn load(path: &Path) -> Result<TimeSeries> {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines();

        match lines.next() {
            Some(HEADER) => {}
            other => {
                return Err(Error::Table {
                    path: path.to_path_buf(),
                    message: format!("missing {:?} header, found {:?}", HEADER, other),
                })
            }
        }

        let mut counts = BTreeMap::new();
        for (lineno, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let (date_str, count_str) = line.split_once(',').ok_or_else(|| Error::Table {
                path: path.to_path_buf(),
                message: format!("line {}: expected date,count", lineno + 2),
            })?;
            let date =
                NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| Error::Table {
                    path: path.to_path_buf(),
                    message: format!("line {}: bad date {:?}: {}", lineno + 2, date_str, e),
                })?;
            let count: u64 = count_str.parse().map_err(|e| Error::Table {
                path: path.to_path_buf(),
                message: format!("line {}: bad count {:?}: {}", lineno + 2, count_str, e),
            })?;
            counts.insert(date, count);
        }

        Ok(TimeSeries::from_counts(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> TimeSeries {
        TimeSeries::from_iter([
            (date(2024, 1, 3), 7),
            (date(2024, 1, 1), 12),
            (date(2024, 2, 10), 0),
        ])
    }

    #[test]
    fn test_series_is_ordered_regardless_of_insertion_order() {
        let series = sample_series();
        let dates: Vec<_> = series.dates().collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 2, 10)]
        );
        assert_eq!(series.values(), vec![12, 7, 0]);
    }

    #[test]
    fn test_span() {
        assert_eq!(
            sample_series().span(),
            Some((date(2024, 1, 1), date(2024, 2, 10)))
        );
        assert_eq!(TimeSeries::empty().span(), None);
    }

    #[test]
    fn test_sample_zero_fills_missing_grid_dates() {
        let series = sample_series();
        assert_eq!(series.value_on(date(2024, 1, 3)), 7);
        assert_eq!(series.value_on(date(2024, 1, 2)), 0);

        let grid = [
            date(2024, 1, 1),
            date(2024, 1, 2),
            date(2024, 1, 3),
            date(2024, 3, 1),
        ];
        assert_eq!(series.sample(&grid), vec![12, 0, 7, 0]);
        assert_eq!(TimeSeries::empty().sample(&grid), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_csv_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");

        let series = sample_series();
        CsvTable::dump(&series, &path).unwrap();
        let loaded = CsvTable::load(&path).unwrap();

        assert_eq!(loaded, series);
    }

    #[test]
    fn test_csv_round_trip_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        CsvTable::dump(&TimeSeries::empty(), &path).unwrap();
        let loaded = CsvTable::load(&path).unwrap();

        assert!(loaded.is_empty());
    }

    #[test]
    fn test_csv_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");

        std::fs::write(&path, "not,a,table\n").unwrap();
        assert!(matches!(
            CsvTable::load(&path),
            Err(Error::Table { .. })
        ));

        std::fs::write(&path, "date,count\n2024-13-40,5\n").unwrap();
        assert!(matches!(
            CsvTable::load(&path),
            Err(Error::Table { .. })
        ));
    }
}
