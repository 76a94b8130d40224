use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::benchmark::{self, BENCHMARK_TEMPLATE, EvaluatedItem};
use crate::cli::ReportArgs;
use crate::csv_codec;
use crate::db::{self, open_database, resolve_db_path};
use crate::filter::{self, SECTION_COLUMN, Summary, TrendPoint, USER_COLUMN};
use crate::model::RowRecord;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FacetLists {
    pub sections: Vec<String>,
    pub users: Vec<String>,
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SelectedFilters {
    pub section: String,
    pub user: String,
    pub month: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub source: String,
    pub filters: SelectedFilters,
    pub facets: FacetLists,
    pub summary: Summary,
    pub trend: Vec<TrendPoint>,
    pub checklist: Vec<EvaluatedItem>,
    #[serde(skip)]
    pub filtered_rows: Vec<RowRecord>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let (rows, columns, source) = load_input(&args)?;
    let report = build_report(&rows, &columns, source, &args.section, &args.user, &args.month);

    if let Some(export_path) = &args.export {
        if report.filtered_rows.is_empty() {
            warn!("nothing to export: filtered row set is empty");
        } else {
            let encoded = csv_codec::encode(&report.filtered_rows);
            fs::write(export_path, encoded)
                .with_context(|| format!("failed to write {}", export_path.display()))?;
            info!(
                path = %export_path.display(),
                rows = report.filtered_rows.len(),
                "wrote filtered csv"
            );
        }
    }

    if args.json {
        write_json_response(&report)
    } else {
        write_text_response(&report)
    }
}

pub(crate) fn build_report(
    rows: &[RowRecord],
    columns: &[String],
    source: String,
    section: &str,
    user: &str,
    month: &str,
) -> ReportResponse {
    let facets = FacetLists {
        sections: filter::extract_facets(rows, SECTION_COLUMN),
        users: filter::extract_facets(rows, USER_COLUMN),
        months: filter::extract_months(rows),
    };

    let filtered_rows = filter::filter_rows(rows, section, user, month);
    let summary = filter::summarize(&filtered_rows);
    let trend = filter::trend_by_month(&filtered_rows);
    let checklist = benchmark::compute(BENCHMARK_TEMPLATE, &filtered_rows, columns);

    ReportResponse {
        source,
        filters: SelectedFilters {
            section: section.to_string(),
            user: user.to_string(),
            month: month.to_string(),
        },
        facets,
        summary,
        trend,
        checklist,
        filtered_rows,
    }
}

fn load_input(args: &ReportArgs) -> Result<(Vec<RowRecord>, Vec<String>, String)> {
    if let Some(csv_path) = &args.csv {
        let text = fs::read_to_string(csv_path)
            .with_context(|| format!("failed to read {}", csv_path.display()))?;
        let rows = csv_codec::decode(&text);
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        return Ok((rows, columns, csv_path.display().to_string()));
    }

    let db_path = resolve_db_path(&args.cache_root, args.db_path.clone());
    let connection = open_database(&db_path)?;
    let dataset = db::latest_dataset(&connection)?
        .context("no dataset ingested; run `qabench ingest --csv <file>` first")?;
    let rows = db::load_rows(&connection, &dataset.dataset_id)?;
    let source = format!("{} ({})", dataset.filename, dataset.dataset_id);

    Ok((rows, dataset.columns, source))
}

fn write_json_response(report: &ReportResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize report json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(report: &ReportResponse) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Source: {}", report.source)?;
    writeln!(
        output,
        "Filters: section={} user={} month={}",
        report.filters.section, report.filters.user, report.filters.month
    )?;
    writeln!(
        output,
        "Facets: sections={} users={} months={}",
        report.facets.sections.len() - 1,
        report.facets.users.len() - 1,
        report.facets.months.len() - 1
    )?;
    writeln!(
        output,
        "Summary: files={} errors={} pass={} pass_rate={:.2}%",
        report.summary.total_files,
        report.summary.total_errors,
        report.summary.pass_count,
        report.summary.pass_rate
    )?;

    writeln!(output, "Trend:")?;
    for point in &report.trend {
        writeln!(
            output,
            "  {}\tfiles={}\terrors={}",
            point.month, point.files, point.errors
        )?;
    }

    writeln!(output, "Checklist:")?;
    for item in &report.checklist {
        match item {
            EvaluatedItem::Header { name } => writeln!(output, "== {name}")?,
            EvaluatedItem::SubHeader { name } => writeln!(output, " - {name}")?,
            EvaluatedItem::Criterion(criterion) => {
                writeln!(
                    output,
                    "  [{}] {}\t{}\treq={}\tref={}\terrors={}\tquality={}\taccepted={}{}",
                    criterion.id,
                    criterion.name,
                    criterion.criticality,
                    criterion.customer_required,
                    criterion.magnasoft_quality,
                    criterion.errors,
                    criterion.quality,
                    criterion.accepted,
                    if criterion.remarks.is_empty() {
                        String::new()
                    } else {
                        format!("\t({})", criterion.remarks)
                    }
                )?;
            }
        }
    }

    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::filter::ALL_FACET;

    fn sample_rows() -> (Vec<RowRecord>, Vec<String>) {
        let text = "Section Name,QA User Name,Date,TOTAL Error Count,Lines: all relevant point and lines correctly vectorized\n\
                    S-1,ana,2024-01-05,0,0\n\
                    S-1,ben,2024-01-20,1,1\n\
                    S-2,ana,2024-02-01,2,0\n";
        let rows = csv_codec::decode(text);
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        (rows, columns)
    }

    #[test]
    fn unfiltered_report_covers_all_rows() {
        let (rows, columns) = sample_rows();
        let report = build_report(&rows, &columns, "test".to_string(), ALL_FACET, ALL_FACET, ALL_FACET);

        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.summary.total_errors, 3.0);
        assert_eq!(report.facets.sections, vec!["all", "S-1", "S-2"]);
        assert_eq!(report.facets.months, vec!["all", "2024-01", "2024-02"]);
        assert_eq!(report.trend.len(), 2);
        assert_eq!(report.filtered_rows.len(), 3);

        let lines = report
            .checklist
            .iter()
            .find_map(|item| match item {
                EvaluatedItem::Criterion(criterion) if criterion.id == "1.a.1" => Some(criterion),
                _ => None,
            })
            .expect("criterion 1.a.1");
        assert_eq!(lines.errors, 1.0);
        // 100 * (1 - 1/3) rounds to 67%.
        assert_eq!(lines.quality, "67%");
        assert_eq!(lines.accepted, "No");
    }

    #[test]
    fn section_filter_narrows_summary_and_checklist() {
        let (rows, columns) = sample_rows();
        let report = build_report(&rows, &columns, "test".to_string(), "S-1", ALL_FACET, ALL_FACET);

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.pass_count, 1);
        assert_eq!(report.summary.pass_rate, 50.0);
        assert_eq!(report.trend.len(), 1);
        assert_eq!(report.trend[0].month, "2024-01");
    }

    fn report_args(dir: &Path, csv: PathBuf, section: &str, export: PathBuf) -> ReportArgs {
        ReportArgs {
            cache_root: dir.to_path_buf(),
            db_path: None,
            csv: Some(csv),
            section: section.to_string(),
            user: ALL_FACET.to_string(),
            month: ALL_FACET.to_string(),
            export: Some(export),
            json: false,
        }
    }

    fn write_sample_csv(dir: &Path) -> PathBuf {
        let path = dir.join("export.csv");
        let (rows, _) = sample_rows();
        fs::write(&path, csv_codec::encode(&rows)).expect("write csv");
        path
    }

    #[test]
    fn export_writes_filtered_rows_as_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = write_sample_csv(dir.path());
        let export_path = dir.path().join("filtered_qa_data.csv");

        run(report_args(dir.path(), csv_path, "S-1", export_path.clone())).expect("report");

        let written = fs::read_to_string(&export_path).expect("exported file");
        let exported = csv_codec::decode(&written);
        assert_eq!(exported.len(), 2);
        assert!(
            exported
                .iter()
                .all(|row| row.get("Section Name").map(String::as_str) == Some("S-1"))
        );
    }

    #[test]
    fn export_is_skipped_when_filtered_set_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = write_sample_csv(dir.path());
        let export_path = dir.path().join("filtered_qa_data.csv");

        run(report_args(dir.path(), csv_path, "S-404", export_path.clone())).expect("report");

        assert!(!export_path.exists());
    }

    #[test]
    fn filtering_everything_out_yields_placeholder_checklist() {
        let (rows, columns) = sample_rows();
        let report = build_report(
            &rows,
            &columns,
            "test".to_string(),
            "S-404",
            ALL_FACET,
            ALL_FACET,
        );

        assert_eq!(report.summary.total_files, 0);
        assert_eq!(report.summary.pass_rate, 0.0);
        for item in &report.checklist {
            if let EvaluatedItem::Criterion(criterion) = item {
                assert_eq!(criterion.quality, "-");
                assert_eq!(criterion.accepted, "-");
            }
        }
    }
}
