//! SQLite persistence for files, summaries, versions and share attempts

mod db;
mod migrations;
mod models;
mod repo;

pub use models::{
    EmailRecord, EmailStatus, FileRecord, NewEmailRecord, NewFile, NewSummary, SummaryRecord,
    SummaryVersionRecord,
};
pub use repo::Store;
