//! Command handlers
//!
//! Every handler that talks to the API goes through
//! [`LimeSession::scoped`], so the session key is released whatever the
//! outcome. Output is written to the supplied writer; logs go to stderr.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use srep_common::config::{ConnectionSettings, TomlConfig};
use srep_common::table::{Table, TableOptions};
use srep_lime::{ExportOptions, LimeSession, ResponseCount, SurveyMatch};
use srep_meta::{MetadataStore, ReportMetadata};
use tracing::info;

use crate::cli::{Cli, Command, ReportArgs, ResponsesArgs, SchoolArgs, TemplateArgs};

/// Result of the `report` command
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub school_number: String,
    pub school_name: String,
    pub is_ubb: bool,
    pub survey_id: u64,
    pub survey_title: String,
    pub completed_responses: u64,
    pub response_rows: usize,
    pub response_columns: usize,
    #[serde(flatten)]
    pub metadata: ReportMetadata,
}

/// Run the selected command
pub fn run(cli: &Cli, config: &TomlConfig, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Command::Surveys => surveys(cli, config, out),
        Command::Responses(args) => responses(cli, config, args, out),
        Command::Count { survey_id } => count(cli, config, *survey_id, out),
        Command::Find(args) => find(cli, config, args, out),
        Command::Template(args) => template(cli, config, args, out),
        Command::Plots {
            template,
            audience,
            data_avail,
        } => plots(cli, config, template, audience, data_avail.as_deref(), out),
        Command::SchoolName { school_number } => school_name(cli, config, school_number, out),
        Command::Report(args) => report(cli, config, args, out),
    }
}

fn open_session(cli: &Cli, config: &TomlConfig) -> Result<LimeSession> {
    let settings = ConnectionSettings::resolve(&cli.connection(), config);
    LimeSession::new(settings).context("Failed to create LimeSurvey client")
}

/// Metadata from `--meta-dir`, the config file, or the bundled tables
pub fn load_metadata(cli: &Cli, config: &TomlConfig) -> Result<MetadataStore> {
    match cli.meta_dir.as_ref().or(config.metadata_dir.as_ref()) {
        Some(dir) => MetadataStore::load_dir(dir)
            .with_context(|| format!("Failed to load metadata from {}", dir.display())),
        None => MetadataStore::bundled().context("Failed to load bundled metadata"),
    }
}

fn print_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Rows as objects keyed by column name
pub fn table_records(table: &Table) -> Vec<Map<String, Value>> {
    table
        .rows()
        .iter()
        .map(|row| {
            table
                .headers()
                .iter()
                .cloned()
                .zip(row.iter().map(|cell| Value::String(cell.clone())))
                .collect()
        })
        .collect()
}

fn borrowed(values: Option<&[String]>) -> Option<Vec<&str>> {
    values.map(|v| v.iter().map(String::as_str).collect())
}

fn surveys(cli: &Cli, config: &TomlConfig, out: &mut dyn Write) -> Result<()> {
    let mut session = open_session(cli, config)?;
    let surveys = session
        .scoped(|s| s.list_surveys())
        .context("Failed to list surveys")?;

    if cli.json {
        return print_json(out, &surveys);
    }
    for survey in &surveys {
        writeln!(out, "{}\t{}", survey.sid, survey.title)?;
    }
    Ok(())
}

fn responses(cli: &Cli, config: &TomlConfig, args: &ResponsesArgs, out: &mut dyn Write) -> Result<()> {
    let options = ExportOptions {
        language_code: args.language.clone(),
        completion_status: args.completion_status.clone(),
        heading_type: args.heading_type.clone(),
        response_type: args.response_type.clone(),
        ..ExportOptions::default()
    };

    let mut session = open_session(cli, config)?;
    let table = session
        .scoped(|s| s.export_responses(args.survey_id, &options))
        .with_context(|| format!("Failed to export responses of survey {}", args.survey_id))?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_table(cli.json, &table, &mut writer)?;
            writer.flush()?;
            info!(rows = table.len(), "Wrote responses to {}", path.display());
            Ok(())
        }
        None => write_table(cli.json, &table, out),
    }
}

fn write_table(json: bool, table: &Table, out: &mut dyn Write) -> Result<()> {
    if json {
        print_json(out, &table_records(table))
    } else {
        table.write_to(out, &TableOptions::semicolon())?;
        Ok(())
    }
}

fn count(cli: &Cli, config: &TomlConfig, survey_id: u64, out: &mut dyn Write) -> Result<()> {
    let mut session = open_session(cli, config)?;
    let count: ResponseCount = session
        .scoped(|s| s.get_response_count(survey_id))
        .with_context(|| format!("Failed to get response count of survey {}", survey_id))?;

    if cli.json {
        return print_json(out, &count);
    }
    match count.completed_responses {
        Some(n) => writeln!(out, "{}\t{}", count.survey_id, n)?,
        None => writeln!(out, "{}\tn/a", count.survey_id)?,
    }
    Ok(())
}

fn find(cli: &Cli, config: &TomlConfig, args: &SchoolArgs, out: &mut dyn Write) -> Result<()> {
    let mut session = open_session(cli, config)?;
    let matches: Vec<SurveyMatch> = session
        .scoped(|s| s.find_survey_ids(&args.school_number, args.ubb))
        .with_context(|| format!("Failed to find surveys of school {}", args.school_number))?;

    if cli.json {
        return print_json(out, &matches);
    }
    for m in &matches {
        writeln!(out, "{}\t{}\t{}", m.survey.sid, m.completed_responses, m.survey.title)?;
    }
    Ok(())
}

fn template(cli: &Cli, config: &TomlConfig, args: &TemplateArgs, out: &mut dyn Write) -> Result<()> {
    let store = load_metadata(cli, config)?;
    let template =
        store.resolve_report_template(&args.school_type, &args.audience, args.ubb, args.fullday)?;

    if cli.json {
        return print_json(out, &serde_json::json!({ "report_template_id": template }));
    }
    writeln!(out, "{}", template)?;
    Ok(())
}

fn plots(
    cli: &Cli,
    config: &TomlConfig,
    template: &str,
    audience: &str,
    data_avail: Option<&[String]>,
    out: &mut dyn Write,
) -> Result<()> {
    let store = load_metadata(cli, config)?;
    let data_avail = borrowed(data_avail);
    let plots = store.resolve_plots(template, audience, data_avail.as_deref())?;

    if cli.json {
        return print_json(out, &plots);
    }
    for plot in &plots {
        writeln!(out, "{}", plot)?;
    }
    Ok(())
}

fn school_name(cli: &Cli, config: &TomlConfig, school_number: &str, out: &mut dyn Write) -> Result<()> {
    let store = load_metadata(cli, config)?;
    let name = store.resolve_school_name(school_number)?;

    if cli.json {
        return print_json(
            out,
            &serde_json::json!({ "school_number": school_number, "school_name": name }),
        );
    }
    writeln!(out, "{}", name)?;
    Ok(())
}

fn report(cli: &Cli, config: &TomlConfig, args: &ReportArgs, out: &mut dyn Write) -> Result<()> {
    // Resolve metadata first so a bad template query fails before any network traffic
    let store = load_metadata(cli, config)?;
    let data_avail = borrowed(args.data_avail.as_deref());
    let metadata = store.resolve_metadata(
        &args.school_type,
        &args.audience,
        args.school.ubb,
        args.fullday,
        data_avail.as_deref(),
    )?;
    let school_name = store.resolve_school_name(&args.school.school_number)?;

    let mut session = open_session(cli, config)?;
    let (survey, table) = session
        .scoped(|s| -> Result<(SurveyMatch, Table)> {
            let mut matches = s.find_survey_ids(&args.school.school_number, args.school.ubb)?;
            let survey = matches.remove(0);
            let table = s.export_responses(survey.survey.sid, &ExportOptions::default())?;
            Ok((survey, table))
        })
        .with_context(|| format!("Failed to fetch responses of school {}", args.school.school_number))?;

    let summary = ReportSummary {
        school_number: args.school.school_number.clone(),
        school_name,
        is_ubb: args.school.ubb,
        survey_id: survey.survey.sid,
        survey_title: survey.survey.title,
        completed_responses: survey.completed_responses,
        response_rows: table.len(),
        response_columns: table.headers().len(),
        metadata,
    };
    info!(
        school_number = %summary.school_number,
        survey_id = summary.survey_id,
        template = %summary.metadata.report_template_id,
        "Report inputs ready"
    );

    if cli.json {
        return print_json(out, &summary);
    }
    write_summary(&summary, out)
}

fn write_summary(summary: &ReportSummary, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "School:      {} {}", summary.school_number, summary.school_name)?;
    writeln!(out, "Survey:      {} {}", summary.survey_id, summary.survey_title)?;
    writeln!(out, "Completed:   {}", summary.completed_responses)?;
    writeln!(
        out,
        "Responses:   {} rows x {} columns",
        summary.response_rows, summary.response_columns
    )?;
    writeln!(out, "Template:    {}", summary.metadata.report_template_id)?;
    writeln!(out, "Plots:       {}", summary.metadata.plots.join(", "))?;
    Ok(())
}

/// Resolve the config file path and load it
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match srep_common::config::default_config_path() {
            Some(path) => path,
            None => return Ok(TomlConfig::default()),
        },
    };
    srep_common::config::load_toml_config(&path)
        .with_context(|| format!("Failed to load config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("srep").chain(args.iter().copied())).unwrap()
    }

    fn run_offline(args: &[&str]) -> Result<String> {
        let cli = parse(args);
        let mut out = Vec::new();
        run(&cli, &TomlConfig::default(), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_template_command() {
        let out = run_offline(&["template", "--school-type", "gy", "--audience", "sus"]).unwrap();
        assert_eq!(out, "gy_sus\n");
    }

    #[test]
    fn test_template_command_ubb_json() {
        let out = run_offline(&[
            "template",
            "--school-type",
            "gy",
            "--audience",
            "sus",
            "--ubb",
            "--json",
        ])
        .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["report_template_id"], "ubb_sus");
    }

    #[test]
    fn test_plots_command() {
        let out = run_offline(&["plots", "--template", "gy_sus", "--audience", "sus"]).unwrap();
        assert_eq!(out, "A11\nA12\nA13\nA21\nA22\n");
    }

    #[test]
    fn test_plots_all_requires_data_avail() {
        let err = run_offline(&["plots", "--template", "gy_all_gt", "--audience", "all"]).unwrap_err();
        assert!(err.to_string().contains("data_avail"));
    }

    #[test]
    fn test_school_name_command() {
        assert_eq!(
            run_offline(&["school-name", "--school-number", "0001"]).unwrap(),
            "Gymnasium am Stadtpark\n"
        );
        assert_eq!(
            run_offline(&["school-name", "--school-number", "9999"]).unwrap(),
            "School name not available.\n"
        );
    }

    #[test]
    fn test_table_records() {
        let table = Table::parse("id;q1\n1;007\n", &TableOptions::semicolon()).unwrap();
        let records = table_records(&table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["q1"], Value::String("007".into()));
    }

    #[test]
    fn test_load_config_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_meta_dir_overrides_bundled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("meta_templates.csv"),
            "stype,type,ubb,ganztag,report_tmpl\nxx,sus,0,0,xx_custom\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("meta_reports.csv"), "report,plot,type\nxx_custom,P1,sus\n").unwrap();
        std::fs::write(dir.path().join("meta_snames.csv"), "SNR,SNAME\n0001,Custom\n").unwrap();

        let meta_dir = dir.path().to_string_lossy().to_string();
        let out = run_offline(&[
            "template",
            "--school-type",
            "xx",
            "--audience",
            "sus",
            "--meta-dir",
            &meta_dir,
        ])
        .unwrap();
        assert_eq!(out, "xx_custom\n");
    }
}
