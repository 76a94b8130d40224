//! The fixed benchmark checklist and its evaluation against uploaded rows.
//!
//! The checklist is static reference data: an ordered mix of section headers,
//! sub-headers, and scorable criteria. Evaluation maps each criterion onto an
//! uploaded column by trimmed-name equality and derives an error count, a
//! quality percentage, and an acceptance verdict.

use serde::Serialize;

use crate::filter;
use crate::model::RowRecord;

#[derive(Debug, Clone)]
pub struct CriterionSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub criticality: &'static str,
    pub customer_required: &'static str,
    pub magnasoft_quality: &'static str,
    pub remarks: &'static str,
}

#[derive(Debug, Clone)]
pub enum BenchmarkItem {
    Header(&'static str),
    SubHeader(&'static str),
    Criterion(CriterionSpec),
}

const fn header(name: &'static str) -> BenchmarkItem {
    BenchmarkItem::Header(name)
}

const fn sub_header(name: &'static str) -> BenchmarkItem {
    BenchmarkItem::SubHeader(name)
}

const fn criterion(
    id: &'static str,
    name: &'static str,
    criticality: &'static str,
    customer_required: &'static str,
    magnasoft_quality: &'static str,
) -> BenchmarkItem {
    BenchmarkItem::Criterion(CriterionSpec {
        id,
        name,
        criticality,
        customer_required,
        magnasoft_quality,
        remarks: "",
    })
}

const fn entrance_check(
    id: &'static str,
    name: &'static str,
    criticality: &'static str,
    customer_required: &'static str,
    magnasoft_quality: &'static str,
) -> BenchmarkItem {
    BenchmarkItem::Criterion(CriterionSpec {
        id,
        name,
        criticality,
        customer_required,
        magnasoft_quality,
        remarks: "Entrance Check",
    })
}

pub const BENCHMARK_TEMPLATE: &[BenchmarkItem] = &[
    header("(3.3). Completeness and correctness"),
    sub_header(
        "1.a. 100% of the lines, symbols, indications and texts that are related to measurements are vectorized and categorized using cadastral classifications. If applicable one or more measurements can be disabled.",
    ),
    criterion("1.a.1", "Lines: all relevant point and lines correctly vectorized", "Non Critical", "100%", "96%"),
    criterion("1.a.2", "Text detect: all relevant textboxes marked", "Critical", "100%", "98%"),
    criterion("1.a.3", "Text read: all relevant texts are correctly classified and vectorized", "Non Critical", "100%", "96%"),
    criterion("1.a.4", "Cadastral: all measurement lines and parallelisms have been correctly identified", "Critical", "100%", "98%"),
    criterion("1.a.5", "Buildings: all buildings and semantic lines (like boundaries) correctly vectorized", "Critical", "100%", "98%"),
    criterion("1.a.6", "Symbols: all symbols correctly vectorized", "Non Critical", "100%", "96%"),
    criterion("1.a.7", "GEN2 only: Coordinate list complete and correct", "Critical", "100%", "98%"),
    criterion("1.a.8", "GEN3 only: TR-project correctly coupled", "Critical", "100%", "98%"),
    sub_header(
        "1.b. At least 95% of all possible links between field sketches and map information (BGT) has been made correctly.",
    ),
    criterion("1.b.1", "Point - point links between field sketches and BGT", "Critical", "95%", "95%"),
    sub_header(
        "1.c. 100% of all the cadastral boundaries as depicted on the field sketch have been linked to the cadastral borders or the borders on the auxiliary map. Exceptions to this are cadastral borders for which, in the data delivered to the contractor, lines and points to either the cadastral map (BRK) or the auxiliary map are missing.",
    ),
    criterion("1.c.1", "Point - point links between field sketches and BRK", "Critical", "100%", "98%"),
    criterion("1.c.2", "Point - line links between field sketches and BRK", "Critical", "100%", "98%"),
    criterion("1.c.3", "Line - line links between field sketches and BRK", "Critical", "100%", "98%"),
    criterion("1.c.4", "Point - point links between field sketches and TR", "Critical", "100%", "98%"),
    sub_header(
        "1.d. 100% of all links on numbered cadastral stones, iron poles and pickets between field sketches have been made.",
    ),
    criterion("1.d.1", "Kad Obj and Kad number correctly vectorized (Piket, Iron Pillar,Stone)", "Critical", "", "98%"),
    sub_header(
        "1.e.1. At least 90% of all other links between field sketches within a section have been made correctly.",
    ),
    criterion("1.e.1.1", "All relevant neighbour sketches found", "Non Critical", "90%", "92%"),
    criterion("1.e.1.2", "Point - point links between field sketches and neighbouring field sketches", "Non Critical", "90%", "92%"),
    sub_header(
        "1.e.2. At least 90% of all other links between field sketches between sections have been made correctly.",
    ),
    criterion("1.e.2.1", "All relevant neighbour sketches found (Stiching)", "Non Critical", "90%", "92%"),
    criterion("1.e.2.2", "Point - point links between field sketches and neighbouring field sketches (Stiching)", "Non Critical", "90%", "92%"),
    header("2 Adjustment checks"),
    sub_header("2.a. Are disabled observations disabled correctly"),
    criterion("2.a.1", "Disabled measurements are rightfully disabled", "Non Critical", "100%", "96%"),
    header("(3.5). Methodology"),
    entrance_check("3.5.a", "Are adjustments delivered for each field sketch individually?", "Critical", "100%", "100%"),
    entrance_check("3.5.b", "Is an adjustment delivered for each flower", "Critical", "100%", "100%"),
    entrance_check("3.5.c", "Is each field sketch present in at least two cluster adjustments or are all field sketches of one section adjusted together in one adjustment", "Critical", "100%", "100%"),
    criterion("3.5.d", "Are exceptions to a, b or c validly explained?", "Critical", "100%", "100%"),
    header("(3.1). SA-profiles"),
    criterion("3.1.a", "Has adjustment profile B only been used as few times as possible?", "Non Critical", "100%", "96%"),
    criterion("3.1.c", "Was any use of the B-profile sufficiently and acceptably explained?", "Non Critical", "100%", "96%"),
    header("(3.2). Adjustment and Testing"),
    entrance_check("3.2.a", "F-tests < 1", "Critical", "100%", "100%"),
    sub_header("3.2.b. W-tests: Are criteria met for individual field sketches?"),
    entrance_check("3.2.b.1", "Adjustment of field sketch vectorization accepted", "Critical", "100%", "100%"),
    sub_header("3.2.c. W-tests: Are criteria met for all flowers?"),
    entrance_check("3.2.c.1", "Adjustment of linked sketches correct and accepted", "Critical", "100%", "100%"),
    sub_header("3.2.d. W-tests: Are criteria met for all clusters?"),
    criterion("3.2.e", "Are exceptions to a, b, c or d. sufficiently and acceptably explained?", "Critical", "100%", "96%"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluatedItem {
    Header { name: String },
    SubHeader { name: String },
    Criterion(EvaluatedCriterion),
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedCriterion {
    pub id: String,
    pub name: String,
    pub criticality: String,
    pub customer_required: String,
    pub magnasoft_quality: String,
    pub remarks: String,
    pub errors: f64,
    pub quality: String,
    pub accepted: String,
}

/// Evaluates the checklist against the filtered rows. Header and sub-header
/// items pass through; criteria are recomputed in full on every call.
pub fn compute(
    template: &[BenchmarkItem],
    filtered_rows: &[RowRecord],
    headers: &[String],
) -> Vec<EvaluatedItem> {
    template
        .iter()
        .map(|item| match item {
            BenchmarkItem::Header(name) => EvaluatedItem::Header {
                name: (*name).to_string(),
            },
            BenchmarkItem::SubHeader(name) => EvaluatedItem::SubHeader {
                name: (*name).to_string(),
            },
            BenchmarkItem::Criterion(spec) => {
                EvaluatedItem::Criterion(evaluate_criterion(spec, filtered_rows, headers))
            }
        })
        .collect()
}

fn evaluate_criterion(
    spec: &CriterionSpec,
    rows: &[RowRecord],
    headers: &[String],
) -> EvaluatedCriterion {
    let mut evaluated = EvaluatedCriterion {
        id: spec.id.to_string(),
        name: spec.name.to_string(),
        criticality: spec.criticality.to_string(),
        customer_required: spec.customer_required.to_string(),
        magnasoft_quality: spec.magnasoft_quality.to_string(),
        remarks: spec.remarks.to_string(),
        errors: 0.0,
        quality: "-".to_string(),
        accepted: "-".to_string(),
    };

    // No data at all is a distinct rendering state, not a vacuous pass.
    if rows.is_empty() {
        return evaluated;
    }

    let total = rows.len() as f64;
    let matched_column = headers
        .iter()
        .find(|candidate| candidate.trim() == spec.name.trim());
    let errors = matched_column
        .map(|column| {
            rows.iter()
                .map(|row| filter::numeric_field(row, column))
                .sum()
        })
        .unwrap_or(0.0);
    let quality = 100.0 * (1.0 - errors / total);

    evaluated.errors = errors;
    evaluated.quality = format!("{quality:.0}%");
    evaluated.accepted = if spec.customer_required.is_empty() {
        "Yes".to_string()
    } else {
        match parse_leading_int(spec.customer_required) {
            Some(required) if quality >= required as f64 => "Yes".to_string(),
            Some(_) => "No".to_string(),
            None => "N/A".to_string(),
        }
    };

    evaluated
}

/// Leading-integer parse in the style of `parseInt`: optional sign, then
/// digits, trailing text ignored. None when no digits are present.
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|parsed| sign * parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_column(column: &str, values: &[&str]) -> Vec<RowRecord> {
        values
            .iter()
            .map(|value| {
                [(column.to_string(), value.to_string())]
                    .into_iter()
                    .collect()
            })
            .collect()
    }

    fn find_criterion<'a>(items: &'a [EvaluatedItem], id: &str) -> &'a EvaluatedCriterion {
        items
            .iter()
            .find_map(|item| match item {
                EvaluatedItem::Criterion(criterion) if criterion.id == id => Some(criterion),
                _ => None,
            })
            .unwrap_or_else(|| panic!("criterion {id} missing from evaluated checklist"))
    }

    #[test]
    fn template_preserves_checklist_order() {
        assert!(matches!(BENCHMARK_TEMPLATE[0], BenchmarkItem::Header(_)));
        assert!(matches!(BENCHMARK_TEMPLATE[1], BenchmarkItem::SubHeader(_)));
        let criteria = BENCHMARK_TEMPLATE
            .iter()
            .filter(|item| matches!(item, BenchmarkItem::Criterion(_)))
            .count();
        assert_eq!(criteria, 29);
        assert_eq!(BENCHMARK_TEMPLATE.len(), 44);
    }

    #[test]
    fn criterion_errors_quality_and_acceptance() {
        let template = [criterion("1.a.1", "Lines", "Non Critical", "100%", "96%")];
        let rows = rows_with_column("Lines", &["0", "1"]);
        let headers = vec!["Lines".to_string()];

        let evaluated = compute(&template, &rows, &headers);
        let lines = find_criterion(&evaluated, "1.a.1");
        assert_eq!(lines.errors, 1.0);
        assert_eq!(lines.quality, "50%");
        assert_eq!(lines.accepted, "No");
    }

    #[test]
    fn criterion_accepts_when_quality_meets_threshold() {
        let template = [criterion("x", "Lines", "Critical", "50%", "96%")];
        let rows = rows_with_column("Lines", &["0", "1"]);
        let headers = vec!["Lines".to_string()];

        let lines = match &compute(&template, &rows, &headers)[0] {
            EvaluatedItem::Criterion(criterion) => criterion.clone(),
            other => panic!("expected criterion, got {other:?}"),
        };
        assert_eq!(lines.accepted, "Yes");
    }

    #[test]
    fn empty_filtered_set_reports_placeholders() {
        let headers = vec!["Lines".to_string()];
        let evaluated = compute(BENCHMARK_TEMPLATE, &[], &headers);
        let first = find_criterion(&evaluated, "1.a.1");
        assert_eq!(first.errors, 0.0);
        assert_eq!(first.quality, "-");
        assert_eq!(first.accepted, "-");
    }

    #[test]
    fn missing_column_counts_zero_errors() {
        let template = [criterion("x", "Nowhere", "Critical", "100%", "98%")];
        let rows = rows_with_column("Lines", &["1", "1"]);
        let headers = vec!["Lines".to_string()];

        let evaluated = compute(&template, &rows, &headers);
        let item = find_criterion(&evaluated, "x");
        assert_eq!(item.errors, 0.0);
        assert_eq!(item.quality, "100%");
        assert_eq!(item.accepted, "Yes");
    }

    #[test]
    fn column_match_trims_names() {
        let template = [criterion("x", "Lines", "Critical", "100%", "98%")];
        let rows = rows_with_column("  Lines  ", &["1"]);
        let headers = vec!["  Lines  ".to_string()];

        let evaluated = compute(&template, &rows, &headers);
        assert_eq!(find_criterion(&evaluated, "x").errors, 1.0);
    }

    #[test]
    fn missing_threshold_is_unconditionally_accepted() {
        let template = [criterion("1.d.1", "Kad", "Critical", "", "98%")];
        let rows = rows_with_column("Kad", &["1"]);
        let headers = vec!["Kad".to_string()];

        let evaluated = compute(&template, &rows, &headers);
        assert_eq!(find_criterion(&evaluated, "1.d.1").accepted, "Yes");
    }

    #[test]
    fn unparseable_threshold_reports_not_applicable() {
        let template = [criterion("x", "Lines", "Critical", "high", "98%")];
        let rows = rows_with_column("Lines", &["0"]);
        let headers = vec!["Lines".to_string()];

        let evaluated = compute(&template, &rows, &headers);
        assert_eq!(find_criterion(&evaluated, "x").accepted, "N/A");
    }

    #[test]
    fn parse_leading_int_mirrors_parse_int() {
        assert_eq!(parse_leading_int("100%"), Some(100));
        assert_eq!(parse_leading_int(" 95 "), Some(95));
        assert_eq!(parse_leading_int("-5x"), Some(-5));
        assert_eq!(parse_leading_int("high"), None);
        assert_eq!(parse_leading_int(""), None);
    }
}
