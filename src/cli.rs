use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::Role;

#[derive(Parser, Debug)]
#[command(
    name = "qabench",
    version,
    about = "Local QA analytics and benchmark reporting for vectorization workflows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Report(ReportArgs),
    Overview(OverviewArgs),
    Query(QueryArgs),
    Feedback(FeedbackArgs),
    Status(StatusArgs),
    Profile(ProfileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// QA-check CSV export; becomes the active dataset for `report`.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// CSV with columns date, score, agent; replaces the qa_entries table.
    #[arg(long)]
    pub entries_csv: Option<PathBuf>,

    /// CSV with columns name, score, submissions; replaces the employees table.
    #[arg(long)]
    pub employees_csv: Option<PathBuf>,

    /// Act as this profile; Read-only profiles cannot ingest.
    #[arg(long = "as")]
    pub as_user: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Analyze this CSV file directly instead of the latest ingested dataset.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[arg(long, default_value = "all")]
    pub section: String,

    #[arg(long, default_value = "all")]
    pub user: String,

    #[arg(long, default_value = "all")]
    pub month: String,

    /// Write the filtered rows back out as CSV.
    #[arg(long, num_args = 0..=1, default_missing_value = "filtered_qa_data.csv")]
    pub export: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OverviewArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub top: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// A single read-only SELECT statement.
    #[arg(long)]
    pub sql: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FeedbackArgs {
    /// QA case summary, inline.
    #[arg(long)]
    pub case: Option<String>,

    /// QA case summary, read from a file.
    #[arg(long)]
    pub case_file: Option<PathBuf>,

    #[arg(long, default_value = "gemini-2.5-flash")]
    pub model: String,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long, default_value = ".cache/qabench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub action: ProfileAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileAction {
    Show(ProfileShowArgs),
    Create(ProfileCreateArgs),
    Update(ProfileUpdateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProfileShowArgs {
    #[arg(long)]
    pub email: String,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileCreateArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, value_enum, default_value = "read-only")]
    pub role: Role,

    /// Act as this profile; elevated roles require an Admin session.
    #[arg(long = "as")]
    pub as_user: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub name: Option<String>,

    /// Role changes require an Admin session via --as.
    #[arg(long, value_enum)]
    pub role: Option<Role>,

    #[arg(long)]
    pub photo_url: Option<String>,

    #[arg(long = "as")]
    pub as_user: Option<String>,
}
