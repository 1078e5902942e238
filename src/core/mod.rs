//! Core of the migration engine: the document store seam, the pure
//! classification and transformation steps, loading, indexing and the
//! ambient pieces (config, errors, journal, console output).

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod indexes;
pub mod journal;
pub mod loader;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
pub mod transform;
