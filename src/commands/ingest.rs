use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::csv_codec;
use crate::db::{DB_SCHEMA_VERSION, open_database, resolve_db_path};
use crate::filter::{self, DATE_COLUMN, SECTION_COLUMN, USER_COLUMN};
use crate::model::{
    DatasetRecord, IngestCounts, IngestPaths, IngestRunManifest, RowRecord, SourceFile,
};
use crate::session::establish_optional;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    if args.csv.is_none() && args.entries_csv.is_none() && args.employees_csv.is_none() {
        bail!("nothing to ingest: pass --csv, --entries-csv, or --employees-csv");
    }

    let started_at = now_utc_string();
    let db_path = resolve_db_path(&args.cache_root, args.db_path.clone());
    let mut connection = open_database(&db_path)?;

    if let Some(session) = establish_optional(&connection, args.as_user.as_deref())? {
        session.require_writer()?;
    }

    let mut counts = IngestCounts::default();
    let mut warnings = Vec::new();
    let mut source = None;

    if let Some(csv_path) = &args.csv {
        let dataset = ingest_qa_csv(&mut connection, csv_path, &mut counts, &mut warnings)?;
        info!(
            dataset_id = %dataset.dataset_id,
            rows = counts.rows_inserted,
            columns = counts.column_count,
            "qa dataset ingested"
        );
        source = Some(SourceFile {
            filename: dataset.filename,
            sha256: dataset.sha256,
        });
    }

    if let Some(path) = &args.entries_csv {
        counts.entries_inserted = ingest_entries(&mut connection, path, &mut warnings)?;
        info!(entries = counts.entries_inserted, "qa entries replaced");
    }

    if let Some(path) = &args.employees_csv {
        counts.employees_inserted = ingest_employees(&mut connection, path, &mut warnings)?;
        info!(employees = counts.employees_inserted, "employees replaced");
    }

    let manifest_dir = args.cache_root.join("manifests");
    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: format!("ingest-{}", utc_compact_string(Utc::now())),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        started_at,
        completed_at: now_utc_string(),
        paths: IngestPaths {
            cache_root: args.cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        source,
        counts,
        warnings,
    };

    write_json_pretty(&manifest_dir.join(format!("{}.json", manifest.run_id)), &manifest)?;
    write_json_pretty(&manifest_dir.join("ingest_latest.json"), &manifest)?;
    info!(run_id = %manifest.run_id, "ingest completed");

    Ok(())
}

fn ingest_qa_csv(
    connection: &mut Connection,
    path: &Path,
    counts: &mut IngestCounts,
    warnings: &mut Vec<String>,
) -> Result<DatasetRecord> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let sha256 = sha256_file(path)?;

    let rows = csv_codec::decode(&text);
    if rows.is_empty() {
        let message = format!("no data rows decoded from {}", path.display());
        warn!("{message}");
        warnings.push(message);
    }

    let columns: Vec<String> = rows
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    let dataset = DatasetRecord {
        dataset_id: format!("ds-{}-{}", utc_compact_string(Utc::now()), &sha256[..8]),
        filename,
        sha256,
        row_count: rows.len(),
        columns,
        ingested_at: now_utc_string(),
    };

    let tx = connection.transaction()?;
    tx.execute(
        "INSERT INTO datasets(dataset_id, filename, sha256, row_count, column_names, ingested_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            dataset.dataset_id,
            dataset.filename,
            dataset.sha256,
            dataset.row_count as i64,
            serde_json::to_string(&dataset.columns).context("failed to serialize column names")?,
            dataset.ingested_at
        ],
    )?;
    {
        let mut statement = tx.prepare(
            "INSERT INTO qa_rows(dataset_id, row_index, section_name, qa_user_name, date,
                                 total_error_count, fields_json)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (index, row) in rows.iter().enumerate() {
            statement.execute(params![
                dataset.dataset_id,
                index as i64,
                row.get(SECTION_COLUMN),
                row.get(USER_COLUMN),
                row.get(DATE_COLUMN),
                filter::error_count(row),
                serde_json::to_string(row).context("failed to serialize row fields")?
            ])?;
        }
    }
    tx.commit()?;

    counts.rows_inserted = dataset.row_count;
    counts.column_count = dataset.columns.len();

    Ok(dataset)
}

fn ingest_entries(
    connection: &mut Connection,
    path: &Path,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let rows = decode_collection(path, &["date", "score", "agent"], warnings)?;

    let tx = connection.transaction()?;
    tx.execute("DELETE FROM qa_entries", [])?;
    let mut inserted = 0;
    {
        let mut statement =
            tx.prepare("INSERT INTO qa_entries(date, score, agent) VALUES(?1, ?2, ?3)")?;
        for row in &rows {
            statement.execute(params![
                field(row, "date"),
                filter::numeric_field(row, "score"),
                field(row, "agent")
            ])?;
            inserted += 1;
        }
    }
    tx.commit()?;

    Ok(inserted)
}

fn ingest_employees(
    connection: &mut Connection,
    path: &Path,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    let rows = decode_collection(path, &["name", "score", "submissions"], warnings)?;

    let tx = connection.transaction()?;
    tx.execute("DELETE FROM employees", [])?;
    let mut inserted = 0;
    {
        let mut statement =
            tx.prepare("INSERT INTO employees(name, score, submissions) VALUES(?1, ?2, ?3)")?;
        for row in &rows {
            let submissions = row
                .get("submissions")
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(0);
            statement.execute(params![
                field(row, "name"),
                filter::numeric_field(row, "score"),
                submissions
            ])?;
            inserted += 1;
        }
    }
    tx.commit()?;

    Ok(inserted)
}

fn decode_collection(
    path: &Path,
    expected_columns: &[&str],
    warnings: &mut Vec<String>,
) -> Result<Vec<RowRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let rows = csv_codec::decode(&text);

    if let Some(first) = rows.first() {
        for column in expected_columns {
            if !first.contains_key(*column) {
                let message = format!("{} is missing column {column}", path.display());
                warn!("{message}");
                warnings.push(message);
            }
        }
    } else {
        let message = format!("no data rows decoded from {}", path.display());
        warn!("{message}");
        warnings.push(message);
    }

    Ok(rows)
}

fn field<'a>(row: &'a RowRecord, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}
