//! Report template, plot and school-name resolution
//!
//! Template and plot lookups fail hard on zero or ambiguous matches. The
//! school-name lookup is softer: an unknown school number yields
//! [`SCHOOL_NAME_NOT_AVAILABLE`] instead of an error, while a duplicated
//! school number is still an error.

use std::fmt;

use serde::Serialize;
use srep_common::BoolLike;
use tracing::debug;

use crate::store::MetadataStore;
use crate::{MetaError, Result};

/// Returned by [`MetadataStore::resolve_school_name`] for unknown schools
pub const SCHOOL_NAME_NOT_AVAILABLE: &str = "School name not available.";

/// Audience value whose plots depend on which data is available
pub const AUDIENCE_ALL: &str = "all";

/// The attribute tuple a template is selected by
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateQuery {
    pub school_type: String,
    pub audience: String,
    pub is_ubb: bool,
    pub is_fullday: bool,
}

impl fmt::Display for TemplateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "school={}, audience={}, ubb={}, ganztag={}",
            self.school_type, self.audience, self.is_ubb, self.is_fullday
        )
    }
}

/// A resolved template together with its plots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetadata {
    pub report_template_id: String,
    pub plots: Vec<String>,
}

impl MetadataStore {
    /// Select the single report template for a school type, audience and
    /// the two flags
    ///
    /// Flags may be native booleans or text (`"1"`, `"0"`, `"true"`, ...).
    ///
    /// # Errors
    /// - [`MetaError::TemplateNotFound`] if no rule matches
    /// - [`MetaError::AmbiguousTemplate`] if matching rules name more than
    ///   one distinct template
    pub fn resolve_report_template(
        &self,
        school_type: &str,
        audience: &str,
        is_ubb: impl BoolLike,
        is_fullday: impl BoolLike,
    ) -> Result<String> {
        let query = TemplateQuery {
            school_type: school_type.to_string(),
            audience: audience.to_string(),
            is_ubb: is_ubb.to_bool(),
            is_fullday: is_fullday.to_bool(),
        };

        let mut candidates: Vec<String> = Vec::new();
        for rule in self.templates().iter().filter(|rule| {
            rule.school_type == query.school_type
                && rule.audience == query.audience
                && rule.is_ubb == query.is_ubb
                && rule.is_fullday == query.is_fullday
        }) {
            if !candidates.contains(&rule.report_template_id) {
                candidates.push(rule.report_template_id.clone());
            }
        }

        match candidates.len() {
            0 => Err(MetaError::TemplateNotFound(query)),
            1 => {
                let template = candidates.remove(0);
                debug!(%query, template = %template, "Resolved report template");
                Ok(template)
            }
            _ => Err(MetaError::AmbiguousTemplate { query, candidates }),
        }
    }

    /// Sorted, de-duplicated plot names of a report template
    ///
    /// For audience `"all"` only plots whose data type is listed in
    /// `data_avail` are kept, and `data_avail` is mandatory.
    ///
    /// # Errors
    /// - [`MetaError::MissingParameter`] for audience `"all"` without `data_avail`
    /// - [`MetaError::NoPlotsFound`] if nothing remains after filtering
    pub fn resolve_plots(
        &self,
        report_template_id: &str,
        audience: &str,
        data_avail: Option<&[&str]>,
    ) -> Result<Vec<String>> {
        let type_filter = if audience == AUDIENCE_ALL {
            match data_avail {
                Some(types) => Some(types),
                None => {
                    return Err(MetaError::MissingParameter(
                        "data_avail must be provided for audience='all'".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let mut plots: Vec<String> = self
            .reports()
            .iter()
            .filter(|entry| entry.report_template_id == report_template_id)
            .filter(|entry| match type_filter {
                Some(types) => types.contains(&entry.data_type.as_str()),
                None => true,
            })
            .filter_map(|entry| entry.plot_name.clone())
            .collect();

        plots.sort();
        plots.dedup();

        if plots.is_empty() {
            return Err(MetaError::NoPlotsFound(report_template_id.to_string()));
        }

        debug!(
            template = %report_template_id,
            count = plots.len(),
            "Resolved plots"
        );
        Ok(plots)
    }

    /// Template and plots in one step
    pub fn resolve_metadata(
        &self,
        school_type: &str,
        audience: &str,
        is_ubb: impl BoolLike,
        is_fullday: impl BoolLike,
        data_avail: Option<&[&str]>,
    ) -> Result<ReportMetadata> {
        let report_template_id =
            self.resolve_report_template(school_type, audience, is_ubb, is_fullday)?;
        let plots = self.resolve_plots(&report_template_id, audience, data_avail)?;

        Ok(ReportMetadata {
            report_template_id,
            plots,
        })
    }

    /// Display name of a school, or [`SCHOOL_NAME_NOT_AVAILABLE`]
    ///
    /// # Errors
    /// - [`MetaError::AmbiguousSchool`] if the number appears more than once
    pub fn resolve_school_name(&self, school_number: &str) -> Result<String> {
        let matches: Vec<&str> = self
            .schools()
            .iter()
            .filter(|entry| entry.school_number == school_number)
            .map(|entry| entry.school_name.as_str())
            .collect();

        match matches.as_slice() {
            [] => {
                debug!(school_number = %school_number, "School number not in directory");
                Ok(SCHOOL_NAME_NOT_AVAILABLE.to_string())
            }
            [name] => Ok(name.to_string()),
            _ => Err(MetaError::AmbiguousSchool {
                school_number: school_number.to_string(),
                count: matches.len(),
            }),
        }
    }
}
