//! # SREP Common Library
//!
//! Shared code for the survey report crates including:
//! - Error type used by configuration and table loading
//! - Configuration loading (connection settings, TOML config file)
//! - Boolean coercion for reference-table cells
//! - Delimited-text tables (reference data and response exports)

pub mod bool_like;
pub mod config;
pub mod error;
pub mod table;

pub use bool_like::{parse_bool_like, BoolLike};
pub use error::{Error, Result};
pub use table::Table;
