use anyhow::{Result, bail};
use clap::ValueEnum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One uploaded data line: column name to raw string value, in header order.
/// Columns are dynamic; the header line of the uploaded file defines them.
pub type RowRecord = IndexMap<String, String>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
pub enum Role {
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "QA")]
    Qa,
    #[serde(rename = "Read-only")]
    ReadOnly,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Qa => "QA",
            Self::ReadOnly => "Read-only",
        }
    }

    pub fn from_db(value: &str) -> Result<Self> {
        match value {
            "Admin" => Ok(Self::Admin),
            "QA" => Ok(Self::Qa),
            "Read-only" => Ok(Self::ReadOnly),
            other => bail!("unknown role stored in profile: {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dataset_id: String,
    pub filename: String,
    pub sha256: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub ingested_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestCounts {
    pub rows_inserted: usize,
    pub column_count: usize,
    pub entries_inserted: usize,
    pub employees_inserted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub started_at: String,
    pub completed_at: String,
    pub paths: IngestPaths,
    pub source: Option<SourceFile>,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}
