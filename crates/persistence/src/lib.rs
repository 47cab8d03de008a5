//! Habitforge Persistence - SQLite storage layer

pub mod sqlite;

pub use sqlite::Database;
