use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::QueryArgs;
use crate::db::{open_database_read_only, resolve_db_path};

#[derive(Debug, Serialize)]
struct QueryResponse {
    query: String,
    returned: usize,
    rows: Vec<Map<String, Value>>,
}

pub fn run(args: QueryArgs) -> Result<()> {
    validate_select(&args.sql)?;

    let db_path = resolve_db_path(&args.cache_root, args.db_path);
    let connection = open_database_read_only(&db_path)?;
    let (columns, rows) = execute_select(&connection, &args.sql)?;
    info!(returned = rows.len(), "query executed");

    if args.json {
        let response = QueryResponse {
            query: args.sql,
            returned: rows.len(),
            rows,
        };
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize query json output")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    write_text_response(&columns, &rows)
}

/// Read-only contract: the statement must begin with SELECT. The read-only
/// connection flags are the second line of defense.
pub(crate) fn validate_select(sql: &str) -> Result<()> {
    let first_token = sql.trim().split_whitespace().next().unwrap_or_default();
    if !first_token.eq_ignore_ascii_case("select") {
        bail!("only SELECT statements are allowed");
    }
    Ok(())
}

fn execute_select(
    connection: &Connection,
    sql: &str,
) -> Result<(Vec<String>, Vec<Map<String, Value>>)> {
    let mut statement = connection
        .prepare(sql)
        .context("failed to prepare query")?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();

    let mut rows = statement.query([]).context("failed to execute query")?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Map::new();
        for (index, name) in columns.iter().enumerate() {
            record.insert(name.clone(), value_to_json(row.get_ref(index)?));
        }
        records.push(record);
    }

    Ok((columns, records))
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Value::from(real),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(
            blob.iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<String>(),
        ),
    }
}

fn write_text_response(columns: &[String], rows: &[Map<String, Value>]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "{}", columns.join("\t"))?;
    for row in rows {
        let line = columns
            .iter()
            .map(|column| render_cell(row.get(column)))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(output, "{line}")?;
    }
    writeln!(output, "Rows: {}", rows.len())?;

    output.flush()?;
    Ok(())
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
