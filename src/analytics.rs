//! Dashboard analytics over the QA-entry and employee collections. Distinct
//! from the upload-driven report: these operate on typed records loaded from
//! the database, not on dynamic CSV rows.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub date: String,
    pub score: f64,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub score: f64,
    pub submissions: i64,
}

/// Score threshold at or above which an entry counts as compliant.
const COMPLIANCE_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Averages {
    pub average_score: String,
    pub total_submissions: usize,
    pub compliance_rate: String,
}

/// Mean score and compliance rate, one decimal place each. Empty input
/// short-circuits to zero values before any division.
pub fn averages(entries: &[QaEntry]) -> Averages {
    let total_submissions = entries.len();
    if total_submissions == 0 {
        return Averages {
            average_score: "0".to_string(),
            total_submissions: 0,
            compliance_rate: "0".to_string(),
        };
    }

    let average = entries.iter().map(|entry| entry.score).sum::<f64>() / total_submissions as f64;
    let compliant = entries
        .iter()
        .filter(|entry| entry.score >= COMPLIANCE_THRESHOLD)
        .count();
    let compliance = compliant as f64 / total_submissions as f64 * 100.0;

    Averages {
        average_score: format!("{average:.1}"),
        total_submissions,
        compliance_rate: format!("{compliance:.1}"),
    }
}

/// Top `n` employees by score descending; ties keep their original relative
/// order (stable sort).
pub fn top_performers(employees: &[Employee], n: usize) -> Vec<Employee> {
    let mut ranked = employees.to_vec();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSample {
    pub label: String,
    pub score: f64,
}

/// One sample per entry in original order, labelled short-month + day.
/// Unparseable dates keep the raw string as the label.
pub fn trend_series(entries: &[QaEntry]) -> Vec<TrendSample> {
    entries
        .iter()
        .map(|entry| TrendSample {
            label: short_date_label(&entry.date),
            score: entry.score,
        })
        .collect()
}

fn short_date_label(date: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return parsed.format("%b %-d").to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return parsed.format("%b %-d").to_string();
    }
    date.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, score: f64) -> QaEntry {
        QaEntry {
            date: date.to_string(),
            score,
            agent: "agent".to_string(),
        }
    }

    fn employee(name: &str, score: f64) -> Employee {
        Employee {
            name: name.to_string(),
            score,
            submissions: 10,
        }
    }

    #[test]
    fn averages_on_empty_entries_default_to_zero() {
        let result = averages(&[]);
        assert_eq!(result.average_score, "0");
        assert_eq!(result.total_submissions, 0);
        assert_eq!(result.compliance_rate, "0");
    }

    #[test]
    fn averages_round_to_one_decimal() {
        let entries = vec![
            entry("2024-01-05", 95.0),
            entry("2024-01-06", 85.0),
            entry("2024-01-07", 92.5),
        ];
        let result = averages(&entries);
        assert_eq!(result.average_score, "90.8");
        assert_eq!(result.total_submissions, 3);
        // 95 and 92.5 are at or above 90.
        assert_eq!(result.compliance_rate, "66.7");
    }

    #[test]
    fn top_performers_sorts_descending_with_stable_ties() {
        let employees = vec![employee("A", 80.0), employee("B", 95.0), employee("C", 95.0)];
        let top = top_performers(&employees, 5);
        let names: Vec<&str> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn top_performers_truncates_to_n() {
        let employees = vec![
            employee("A", 1.0),
            employee("B", 2.0),
            employee("C", 3.0),
        ];
        assert_eq!(top_performers(&employees, 2).len(), 2);
    }

    #[test]
    fn trend_series_labels_dates_and_keeps_order() {
        let entries = vec![
            entry("2024-01-05", 92.0),
            entry("2024-03-20", 88.0),
            entry("not a date", 90.0),
        ];
        let series = trend_series(&entries);
        assert_eq!(series[0].label, "Jan 5");
        assert_eq!(series[1].label, "Mar 20");
        assert_eq!(series[2].label, "not a date");
        assert_eq!(series[1].score, 88.0);
    }
}
