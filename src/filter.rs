//! Facet extraction, row filtering, and the month-bucketed trend over an
//! uploaded QA dataset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::RowRecord;

pub const SECTION_COLUMN: &str = "Section Name";
pub const USER_COLUMN: &str = "QA User Name";
pub const DATE_COLUMN: &str = "Date";
pub const ERROR_COLUMN: &str = "TOTAL Error Count";

/// Sentinel facet value meaning "no filter applied"; always sorts first.
pub const ALL_FACET: &str = "all";

const UNKNOWN_MONTH: &str = "Unknown";

/// First 7 characters of the row's date column, the `YYYY-MM` prefix of an
/// ISO date. None when the date is absent or shorter than 7 characters.
pub fn month_prefix(row: &RowRecord) -> Option<&str> {
    let date = row.get(DATE_COLUMN)?;
    let mut indices = date.char_indices();
    if indices.by_ref().take(7).count() < 7 {
        return None;
    }
    let end = indices.next().map_or(date.len(), |(index, _)| index);
    Some(&date[..end])
}

/// Distinct non-empty values of the named column in first-seen order,
/// prefixed with the "all" sentinel.
pub fn extract_facets(rows: &[RowRecord], column: &str) -> Vec<String> {
    let mut values = vec![ALL_FACET.to_string()];
    for row in rows {
        let Some(value) = row.get(column) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if !values.iter().any(|seen| seen == value) {
            values.push(value.clone());
        }
    }
    values
}

/// Distinct 7-character date prefixes, sorted ascending after the "all"
/// sentinel. Rows whose date is absent or shorter than 7 characters are
/// excluded; any other prefix is kept as-is.
pub fn extract_months(rows: &[RowRecord]) -> Vec<String> {
    let mut months: Vec<String> = Vec::new();
    for row in rows {
        let Some(prefix) = month_prefix(row) else {
            continue;
        };
        if !months.iter().any(|seen| seen == prefix) {
            months.push(prefix.to_string());
        }
    }
    months.sort();

    let mut values = vec![ALL_FACET.to_string()];
    values.extend(months);
    values
}

/// Retains rows matching every selector; each selector is either the "all"
/// sentinel or an exact string match. The source slice is never mutated.
pub fn filter_rows(rows: &[RowRecord], section: &str, user: &str, month: &str) -> Vec<RowRecord> {
    rows.iter()
        .filter(|row| {
            facet_matches(row.get(SECTION_COLUMN), section)
                && facet_matches(row.get(USER_COLUMN), user)
                && month_matches(row, month)
        })
        .cloned()
        .collect()
}

fn facet_matches(value: Option<&String>, selector: &str) -> bool {
    selector == ALL_FACET || value.map(String::as_str) == Some(selector)
}

fn month_matches(row: &RowRecord, selector: &str) -> bool {
    selector == ALL_FACET || month_prefix(row) == Some(selector)
}

/// Numeric value of the named column; unparseable or missing reads as 0.
pub fn numeric_field(row: &RowRecord, column: &str) -> f64 {
    row.get(column)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub fn error_count(row: &RowRecord) -> f64 {
    numeric_field(row, ERROR_COLUMN)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_files: usize,
    pub total_errors: f64,
    pub pass_count: usize,
    pub pass_rate: f64,
}

pub fn summarize(rows: &[RowRecord]) -> Summary {
    let total_files = rows.len();
    let total_errors = rows.iter().map(error_count).sum();
    let pass_count = rows.iter().filter(|row| error_count(row) == 0.0).count();
    let pass_rate = if total_files == 0 {
        0.0
    } else {
        pass_count as f64 / total_files as f64 * 100.0
    };

    Summary {
        total_files,
        total_errors,
        pass_count,
        pass_rate,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub files: usize,
    pub errors: f64,
}

/// Buckets rows by date prefix (literal "Unknown" when absent), ordered by
/// ascending label; lexicographic order is chronological for `YYYY-MM`.
pub fn trend_by_month(rows: &[RowRecord]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, TrendPoint> = BTreeMap::new();
    for row in rows {
        let label = month_prefix(row).unwrap_or(UNKNOWN_MONTH).to_string();
        let point = buckets.entry(label.clone()).or_insert(TrendPoint {
            month: label,
            files: 0,
            errors: 0.0,
        });
        point.files += 1;
        point.errors += error_count(row);
    }
    buckets.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(section: &str, user: &str, date: &str, errors: &str) -> RowRecord {
        [
            (SECTION_COLUMN, section),
            (USER_COLUMN, user),
            (DATE_COLUMN, date),
            (ERROR_COLUMN, errors),
        ]
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    #[test]
    fn facets_keep_first_seen_order_behind_sentinel() {
        let rows = vec![
            row("S-2", "ana", "2024-01-05", "0"),
            row("S-1", "ben", "2024-01-06", "1"),
            row("S-2", "ana", "2024-02-01", "0"),
            row("", "ana", "2024-02-02", "0"),
        ];
        assert_eq!(extract_facets(&rows, SECTION_COLUMN), vec!["all", "S-2", "S-1"]);
        assert_eq!(extract_facets(&rows, USER_COLUMN), vec!["all", "ana", "ben"]);
    }

    #[test]
    fn months_are_sorted_and_short_dates_excluded() {
        let rows = vec![
            row("S", "u", "2024-02-01", "0"),
            row("S", "u", "2024-01-15", "0"),
            row("S", "u", "short", "0"),
        ];
        assert_eq!(extract_months(&rows), vec!["all", "2024-01", "2024-02"]);
    }

    #[test]
    fn months_keep_any_seven_char_prefix() {
        // Unconventional date formats still contribute a facet value.
        let rows = vec![
            row("S", "u", "20240105", "0"),
            row("S", "u", "2024-01-05", "0"),
        ];
        assert_eq!(extract_months(&rows), vec!["all", "2024-01", "2024010"]);
    }

    #[test]
    fn month_prefix_counts_characters_not_bytes() {
        let record = row("S", "u", "2024-0é-05", "0");
        assert_eq!(month_prefix(&record), Some("2024-0é"));
        assert_eq!(month_prefix(&row("S", "u", "2024-0é", "0")), Some("2024-0é"));
        assert_eq!(month_prefix(&row("S", "u", "2024-0", "0")), None);
    }

    #[test]
    fn filter_with_all_selectors_is_identity() {
        let rows = vec![
            row("S-1", "ana", "2024-01-05", "0"),
            row("S-2", "ben", "2024-02-01", "2"),
        ];
        let filtered = filter_rows(&rows, ALL_FACET, ALL_FACET, ALL_FACET);
        assert_eq!(filtered, rows);
    }

    #[test]
    fn filter_matches_each_selector_exactly() {
        let rows = vec![
            row("S-1", "ana", "2024-01-05", "0"),
            row("S-1", "ben", "2024-01-06", "1"),
            row("S-1", "ana", "2024-02-01", "0"),
        ];
        let filtered = filter_rows(&rows, "S-1", "ana", "2024-01");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get(DATE_COLUMN).map(String::as_str), Some("2024-01-05"));
    }

    #[test]
    fn summarize_empty_rows_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.total_errors, 0.0);
        assert_eq!(summary.pass_count, 0);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn summarize_counts_errors_and_pass_rate() {
        let rows = vec![
            row("S", "u", "2024-01-05", "0"),
            row("S", "u", "2024-01-06", "3"),
            row("S", "u", "2024-01-07", "not-a-number"),
            row("S", "u", "2024-01-08", "1"),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.total_errors, 4.0);
        assert_eq!(summary.pass_count, 2);
        assert_eq!(summary.pass_rate, 50.0);
    }

    #[test]
    fn trend_buckets_sort_by_label_with_unknown_last() {
        let rows = vec![
            row("S", "u", "2024-01-05", "1"),
            row("S", "u", "2024-01-20", "2"),
            row("S", "u", "", "1"),
        ];
        let trend = trend_by_month(&rows);
        assert_eq!(
            trend,
            vec![
                TrendPoint { month: "2024-01".to_string(), files: 2, errors: 3.0 },
                TrendPoint { month: "Unknown".to_string(), files: 1, errors: 1.0 },
            ]
        );
    }
}
