//! # SREP Metadata
//!
//! Read-only reference tables and the lookups that pick a report template,
//! its ordered plot list, and a school's display name.
//!
//! - [`store`]: loads and validates the three reference tables
//! - [`resolver`]: template, plot and school-name resolution

pub mod error;
pub mod resolver;
pub mod store;

pub use error::{MetaError, Result};
pub use resolver::{ReportMetadata, TemplateQuery, SCHOOL_NAME_NOT_AVAILABLE};
pub use store::{MetadataStore, ReportEntry, SchoolEntry, TemplateRule};
