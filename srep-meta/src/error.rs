//! Error types for srep-meta

use crate::resolver::TemplateQuery;
use thiserror::Error;

/// Metadata loading and resolution errors
#[derive(Debug, Error)]
pub enum MetaError {
    /// A reference table lacks required columns
    #[error("Metadata not available: {table} is missing columns: {}", missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("More than 1 report template found ({query}): {}", candidates.join(", "))]
    AmbiguousTemplate {
        query: TemplateQuery,
        candidates: Vec<String>,
    },

    #[error("No report template found ({0})")]
    TemplateNotFound(TemplateQuery),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Plot(s) not found in meta data for report '{0}'")]
    NoPlotsFound(String),

    #[error("More than one school name found for school number {school_number} ({count} entries)")]
    AmbiguousSchool { school_number: String, count: usize },

    /// Table reading or parsing error
    #[error(transparent)]
    Common(#[from] srep_common::Error),
}

/// Result type for metadata operations
pub type Result<T> = std::result::Result<T, MetaError>;
