//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use srep_common::config::{ConnectionSettings, ENV_API_URL, ENV_PASSWORD, ENV_USERNAME};

/// School survey reports from LimeSurvey exports and reference tables
#[derive(Parser, Debug)]
#[command(name = "srep")]
#[command(about = "School survey reports: LimeSurvey exports and report metadata")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config_dir>/srep/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// RemoteControl endpoint URL
    #[arg(long, global = true, env = ENV_API_URL, value_name = "URL")]
    pub api_url: Option<String>,

    #[arg(long, global = true, env = ENV_USERNAME)]
    pub username: Option<String>,

    #[arg(long, global = true, env = ENV_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,

    /// Directory holding meta_templates.csv, meta_reports.csv and meta_snames.csv
    #[arg(long, global = true, value_name = "DIR")]
    pub meta_dir: Option<PathBuf>,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Connection settings given on the command line (or via clap's env lookup)
    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            api_url: self.api_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List surveys visible to the API user
    Surveys,

    /// Export the responses of one survey as ;-separated text
    Responses(ResponsesArgs),

    /// Completed-response count of one survey
    Count {
        #[arg(long)]
        survey_id: u64,
    },

    /// Surveys of a school that have completed responses
    Find(SchoolArgs),

    /// Report template for a school type and audience
    Template(TemplateArgs),

    /// Plots of a report template
    Plots {
        #[arg(long)]
        template: String,

        #[arg(long)]
        audience: String,

        /// Data types available, comma-separated (required for audience "all")
        #[arg(long, value_delimiter = ',')]
        data_avail: Option<Vec<String>>,
    },

    /// Display name of a school
    SchoolName {
        #[arg(long)]
        school_number: String,
    },

    /// Find a school's survey, export it and resolve its report metadata
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ResponsesArgs {
    #[arg(long)]
    pub survey_id: u64,

    #[arg(long, default_value = "complete")]
    pub completion_status: String,

    #[arg(long, default_value = "code")]
    pub heading_type: String,

    #[arg(long, default_value = "long")]
    pub response_type: String,

    #[arg(long, default_value = "")]
    pub language: String,

    /// Write to FILE instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SchoolArgs {
    /// Four-digit school number
    #[arg(long)]
    pub school_number: String,

    /// Look for the UBB survey of the school
    #[arg(long)]
    pub ubb: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TemplateArgs {
    #[arg(long)]
    pub school_type: String,

    #[arg(long)]
    pub audience: String,

    #[arg(long)]
    pub ubb: bool,

    /// All-day school
    #[arg(long)]
    pub fullday: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ReportArgs {
    #[command(flatten)]
    pub school: SchoolArgs,

    #[arg(long)]
    pub school_type: String,

    #[arg(long)]
    pub audience: String,

    #[arg(long)]
    pub fullday: bool,

    #[arg(long, value_delimiter = ',')]
    pub data_avail: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plots_data_avail() {
        let cli = Cli::try_parse_from([
            "srep",
            "plots",
            "--template",
            "gy_all",
            "--audience",
            "all",
            "--data-avail",
            "sus,elt",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Plots {
                template: "gy_all".into(),
                audience: "all".into(),
                data_avail: Some(vec!["sus".into(), "elt".into()]),
            }
        );
    }

    #[test]
    fn test_parse_responses_defaults() {
        let cli = Cli::try_parse_from(["srep", "responses", "--survey-id", "42"]).unwrap();
        match cli.command {
            Command::Responses(args) => {
                assert_eq!(args.survey_id, 42);
                assert_eq!(args.completion_status, "complete");
                assert_eq!(args.heading_type, "code");
                assert_eq!(args.response_type, "long");
                assert_eq!(args.language, "");
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "srep",
            "find",
            "--school-number",
            "0001",
            "--ubb",
            "--json",
            "--api-url",
            "http://localhost/rc",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.connection().api_url.as_deref(), Some("http://localhost/rc"));
        assert_eq!(
            cli.command,
            Command::Find(SchoolArgs {
                school_number: "0001".into(),
                ubb: true
            })
        );
    }

    #[test]
    fn test_report_requires_school_type() {
        let result = Cli::try_parse_from([
            "srep",
            "report",
            "--school-number",
            "0001",
            "--audience",
            "sus",
        ]);
        assert!(result.is_err());
    }
}
