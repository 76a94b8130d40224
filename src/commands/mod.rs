pub mod feedback;
pub mod ingest;
pub mod overview;
pub mod profile;
pub mod query;
pub mod report;
pub mod status;
