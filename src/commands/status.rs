use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::db::{latest_dataset, open_database_read_only, resolve_db_path, table_count};
use crate::model::IngestRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_path = args.cache_root.join("manifests").join("ingest_latest.json");
    let db_path = resolve_db_path(&args.cache_root, args.db_path);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if manifest_path.exists() {
        let raw = fs::read(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: IngestRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            completed_at = %manifest.completed_at,
            rows = manifest.counts.rows_inserted,
            entries = manifest.counts.entries_inserted,
            employees = manifest.counts.employees_inserted,
            warnings = manifest.warnings.len(),
            "loaded ingest manifest"
        );
    } else {
        warn!(path = %manifest_path.display(), "ingest manifest missing");
    }

    if db_path.exists() {
        let connection = open_database_read_only(&db_path)?;
        let datasets = table_count(&connection, "datasets").unwrap_or(0);
        let rows = table_count(&connection, "qa_rows").unwrap_or(0);
        let entries = table_count(&connection, "qa_entries").unwrap_or(0);
        let employees = table_count(&connection, "employees").unwrap_or(0);
        let profiles = table_count(&connection, "profiles").unwrap_or(0);

        info!(
            path = %db_path.display(),
            datasets,
            rows,
            entries,
            employees,
            profiles,
            "database status"
        );

        if let Some(dataset) = latest_dataset(&connection)? {
            info!(
                dataset_id = %dataset.dataset_id,
                filename = %dataset.filename,
                rows = dataset.row_count,
                ingested_at = %dataset.ingested_at,
                "active dataset"
            );
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}
