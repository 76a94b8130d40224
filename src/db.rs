use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::analytics::{Employee, QaEntry};
use crate::model::{DatasetRecord, RowRecord};
use crate::util::{ensure_directory, now_utc_string};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";
pub const DB_FILENAME: &str = "qabench.sqlite";

pub fn resolve_db_path(cache_root: &Path, db_path: Option<PathBuf>) -> PathBuf {
    db_path.unwrap_or_else(|| cache_root.join(DB_FILENAME))
}

pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let connection =
        Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    Ok(connection)
}

pub fn open_database_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {} read-only", path.display()))
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS datasets (
          dataset_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          row_count INTEGER NOT NULL,
          column_names TEXT NOT NULL,
          ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS qa_rows (
          dataset_id TEXT NOT NULL,
          row_index INTEGER NOT NULL,
          section_name TEXT,
          qa_user_name TEXT,
          date TEXT,
          total_error_count REAL,
          fields_json TEXT NOT NULL,
          PRIMARY KEY (dataset_id, row_index),
          FOREIGN KEY (dataset_id) REFERENCES datasets(dataset_id)
        );

        CREATE TABLE IF NOT EXISTS qa_entries (
          entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
          date TEXT NOT NULL,
          score REAL NOT NULL,
          agent TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS employees (
          name TEXT NOT NULL,
          score REAL NOT NULL,
          submissions INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
          user_id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          email TEXT NOT NULL UNIQUE,
          role TEXT NOT NULL,
          created_at TEXT NOT NULL,
          photo_url TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_qa_rows_dataset ON qa_rows(dataset_id, row_index);
        CREATE INDEX IF NOT EXISTS idx_qa_rows_facets ON qa_rows(dataset_id, section_name, qa_user_name);
        CREATE INDEX IF NOT EXISTS idx_qa_entries_date ON qa_entries(date);
        ",
    )?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

/// The most recently ingested dataset; report reads operate on this one.
pub fn latest_dataset(connection: &Connection) -> Result<Option<DatasetRecord>> {
    let mut statement = connection.prepare(
        "SELECT dataset_id, filename, sha256, row_count, column_names, ingested_at
         FROM datasets ORDER BY ingested_at DESC, rowid DESC LIMIT 1",
    )?;

    let raw = statement
        .query_row([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .optional()?;

    let Some((dataset_id, filename, sha256, row_count, columns_json, ingested_at)) = raw else {
        return Ok(None);
    };
    let columns: Vec<String> = serde_json::from_str(&columns_json)
        .with_context(|| format!("failed to parse column names for dataset {dataset_id}"))?;

    Ok(Some(DatasetRecord {
        dataset_id,
        filename,
        sha256,
        row_count: row_count as usize,
        columns,
        ingested_at,
    }))
}

pub fn load_rows(connection: &Connection, dataset_id: &str) -> Result<Vec<RowRecord>> {
    let mut statement = connection
        .prepare("SELECT fields_json FROM qa_rows WHERE dataset_id = ?1 ORDER BY row_index")?;
    let mut rows = statement.query([dataset_id])?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let fields_json: String = row.get(0)?;
        let record: RowRecord = serde_json::from_str(&fields_json)
            .with_context(|| format!("failed to parse stored row for dataset {dataset_id}"))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_entries(connection: &Connection) -> Result<Vec<QaEntry>> {
    let mut statement =
        connection.prepare("SELECT date, score, agent FROM qa_entries ORDER BY entry_id")?;
    let entries = statement
        .query_map([], |row| {
            Ok(QaEntry {
                date: row.get(0)?,
                score: row.get(1)?,
                agent: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

pub fn load_employees(connection: &Connection) -> Result<Vec<Employee>> {
    let mut statement =
        connection.prepare("SELECT name, score, submissions FROM employees ORDER BY rowid")?;
    let employees = statement
        .query_map([], |row| {
            Ok(Employee {
                name: row.get(0)?,
                score: row.get(1)?,
                submissions: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(employees)
}

pub fn table_count(connection: &Connection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let count = connection.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}
