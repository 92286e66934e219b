//! Reference table loading
//!
//! Three flat files make up the metadata:
//!
//! | file                 | columns                                   |
//! |----------------------|-------------------------------------------|
//! | `meta_templates.csv` | `stype, type, ubb, ganztag, report_tmpl`  |
//! | `meta_reports.csv`   | `report, plot, type`                      |
//! | `meta_snames.csv`    | `SNR, SNAME`                              |
//!
//! Only column presence is validated. Cell contents are kept as text except
//! the two flag columns, which are coerced with [`parse_bool_like`].

use std::path::Path;

use serde::Serialize;
use srep_common::table::{Table, TableOptions};
use srep_common::parse_bool_like;
use tracing::info;

use crate::{MetaError, Result};

pub const TEMPLATES_FILE: &str = "meta_templates.csv";
pub const REPORTS_FILE: &str = "meta_reports.csv";
pub const SCHOOLS_FILE: &str = "meta_snames.csv";

pub const TEMPLATE_COLUMNS: [&str; 5] = ["stype", "type", "ubb", "ganztag", "report_tmpl"];
pub const REPORT_COLUMNS: [&str; 3] = ["report", "plot", "type"];
pub const SCHOOL_COLUMNS: [&str; 2] = ["SNR", "SNAME"];

const BUNDLED_TEMPLATES: &str = include_str!("../data/meta_templates.csv");
const BUNDLED_REPORTS: &str = include_str!("../data/meta_reports.csv");
const BUNDLED_SCHOOLS: &str = include_str!("../data/meta_snames.csv");

/// One row of the template table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRule {
    pub school_type: String,
    pub audience: String,
    pub is_ubb: bool,
    pub is_fullday: bool,
    pub report_template_id: String,
}

/// One row of the report/plot catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub report_template_id: String,
    /// `None` when the cell is empty
    pub plot_name: Option<String>,
    pub data_type: String,
}

/// One row of the school directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolEntry {
    /// Kept as text so leading zeros survive (`"0001"`)
    pub school_number: String,
    pub school_name: String,
}

/// The three reference tables, read-only after load
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    templates: Vec<TemplateRule>,
    reports: Vec<ReportEntry>,
    schools: Vec<SchoolEntry>,
}

impl MetadataStore {
    /// Build a store from already-typed rows
    pub fn new(
        templates: Vec<TemplateRule>,
        reports: Vec<ReportEntry>,
        schools: Vec<SchoolEntry>,
    ) -> Self {
        Self {
            templates,
            reports,
            schools,
        }
    }

    /// Load the tables compiled into this crate
    pub fn bundled() -> Result<Self> {
        let store = Self::parse(BUNDLED_TEMPLATES, BUNDLED_REPORTS, BUNDLED_SCHOOLS)?;
        store.log_loaded("bundled");
        Ok(store)
    }

    /// Load `meta_templates.csv`, `meta_reports.csv` and `meta_snames.csv`
    /// from a directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let options = TableOptions::default();
        let templates = Table::read_file(dir.join(TEMPLATES_FILE), &options)?;
        let reports = Table::read_file(dir.join(REPORTS_FILE), &options)?;
        let schools = Table::read_file(dir.join(SCHOOLS_FILE), &options)?;

        let store = Self::from_tables(&templates, &reports, &schools)?;
        store.log_loaded(&dir.display().to_string());
        Ok(store)
    }

    /// Parse the three tables from comma-separated text
    pub fn parse(templates: &str, reports: &str, schools: &str) -> Result<Self> {
        let options = TableOptions::default();
        Self::from_tables(
            &Table::parse(templates, &options)?,
            &Table::parse(reports, &options)?,
            &Table::parse(schools, &options)?,
        )
    }

    /// Validate columns and convert generic tables into typed rows
    pub fn from_tables(templates: &Table, reports: &Table, schools: &Table) -> Result<Self> {
        require_columns(TEMPLATES_FILE, templates, &TEMPLATE_COLUMNS)?;
        require_columns(REPORTS_FILE, reports, &REPORT_COLUMNS)?;
        require_columns(SCHOOLS_FILE, schools, &SCHOOL_COLUMNS)?;

        let templates = (0..templates.len())
            .map(|i| TemplateRule {
                school_type: cell(templates, i, "stype"),
                audience: cell(templates, i, "type"),
                is_ubb: parse_bool_like(&cell(templates, i, "ubb")),
                is_fullday: parse_bool_like(&cell(templates, i, "ganztag")),
                report_template_id: cell(templates, i, "report_tmpl"),
            })
            .collect();

        let reports = (0..reports.len())
            .map(|i| ReportEntry {
                report_template_id: cell(reports, i, "report"),
                plot_name: Some(cell(reports, i, "plot")).filter(|p| !p.trim().is_empty()),
                data_type: cell(reports, i, "type"),
            })
            .collect();

        let schools = (0..schools.len())
            .map(|i| SchoolEntry {
                school_number: cell(schools, i, "SNR"),
                school_name: cell(schools, i, "SNAME"),
            })
            .collect();

        Ok(Self::new(templates, reports, schools))
    }

    pub fn templates(&self) -> &[TemplateRule] {
        &self.templates
    }

    pub fn reports(&self) -> &[ReportEntry] {
        &self.reports
    }

    pub fn schools(&self) -> &[SchoolEntry] {
        &self.schools
    }

    fn log_loaded(&self, source: &str) {
        info!(
            source = %source,
            templates = self.templates.len(),
            reports = self.reports.len(),
            schools = self.schools.len(),
            "Loaded reference metadata"
        );
    }
}

fn require_columns(table_name: &str, table: &Table, required: &[&str]) -> Result<()> {
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MetaError::SchemaMismatch {
            table: table_name.to_string(),
            missing,
        })
    }
}

/// Cell text; columns were validated before this is called
fn cell(table: &Table, row: usize, column: &str) -> String {
    table.get(row, column).unwrap_or_default().to_string()
}
