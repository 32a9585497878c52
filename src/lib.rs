pub mod config;
pub mod dashboard;
pub mod errors;
pub mod ingest;
pub mod query;
