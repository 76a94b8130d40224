//! Decode and encode for the comma-separated QA exports.
//!
//! Decoding is deliberately forgiving: the header line defines the columns,
//! short rows pad with empty strings, and malformed input degrades to an
//! empty row set instead of an error.

use tracing::warn;

use crate::model::RowRecord;

pub fn decode(text: &str) -> Vec<RowRecord> {
    let normalized = text.trim().replace('\r', "");
    let mut lines = normalized.split('\n');

    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header_line
        .split(',')
        .map(|name| name.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        let values = split_fields(line);
        let mut record = RowRecord::new();
        for (index, key) in header.iter().enumerate() {
            let value = values
                .get(index)
                .map(|raw| clean_value(raw))
                .unwrap_or_default();
            record.insert(key.clone(), value);
        }
        rows.push(record);
    }

    if rows.is_empty() {
        warn!("csv input has no data rows");
    }

    rows
}

pub fn encode(rows: &[RowRecord]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));

    for row in rows {
        let line = headers
            .iter()
            .map(|header| escape_field(row.get(*header).map(String::as_str).unwrap_or("")))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }

    lines.join("\n")
}

/// Splits one data line on commas, honoring double-quoted fields.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
}

fn clean_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
