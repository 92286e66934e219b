//! # srep
//!
//! Command-line front end over `srep-lime` (survey API session client) and
//! `srep-meta` (report template and plot resolution).

pub mod cli;
pub mod commands;

pub use cli::{Cli, Command};
pub use commands::{load_config, load_metadata, run, ReportSummary};
