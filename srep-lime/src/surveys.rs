//! Typed helpers over the raw RPC calls
//!
//! Survey listing, response export, completed-response counts, and the
//! school-number lookup that combines the last two.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use srep_common::table::{Table, TableOptions};
use tracing::{debug, info, warn};

use crate::session::LimeSession;
use crate::transport::Transport;
use crate::{LimeError, LimeResult};

/// Title substring marking a UBB survey (case-sensitive)
pub const UBB_MARKER: &str = "ubb";

/// `list_surveys` reply when the account has no surveys
pub const NO_SURVEYS_STATUS: &str = "No surveys found";

const SCHOOL_NUMBER_LEN: usize = 4;

/// One entry of `list_surveys`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    #[serde(deserialize_with = "survey_id_from_text_or_number")]
    pub sid: u64,
    #[serde(rename = "surveyls_title", default)]
    pub title: String,
    /// Remaining fields as sent by the server
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SurveyIdRepr {
    Number(u64),
    Text(String),
}

fn survey_id_from_text_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SurveyIdRepr::deserialize(deserializer)? {
        SurveyIdRepr::Number(id) => Ok(id),
        SurveyIdRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid survey id '{}'", text))),
    }
}

/// Completed-response count of one survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseCount {
    pub survey_id: u64,
    /// `None` when the server sent no count or a non-numeric one
    pub completed_responses: Option<u64>,
}

/// A survey matched by school number, with responses available
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyMatch {
    #[serde(flatten)]
    pub survey: SurveyRecord,
    pub school_number: String,
    pub completed_responses: u64,
}

/// Parameters of `export_responses` besides the survey id
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub document_type: String,
    pub language_code: String,
    pub completion_status: String,
    pub heading_type: String,
    pub response_type: String,
    /// Additional parameters; these may replace the named ones above
    pub extra: Map<String, Value>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            document_type: "csv".to_string(),
            language_code: String::new(),
            completion_status: "complete".to_string(),
            heading_type: "code".to_string(),
            response_type: "long".to_string(),
            extra: Map::new(),
        }
    }
}

impl ExportOptions {
    /// Request parameters in wire order
    pub fn to_params(&self, survey_id: u64) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("iSurveyID".to_string(), Value::from(survey_id));
        params.insert("sDocumentType".to_string(), Value::from(self.document_type.as_str()));
        params.insert("sLanguageCode".to_string(), Value::from(self.language_code.as_str()));
        params.insert(
            "sCompletionStatus".to_string(),
            Value::from(self.completion_status.as_str()),
        );
        params.insert("sHeadingType".to_string(), Value::from(self.heading_type.as_str()));
        params.insert("sResponseType".to_string(), Value::from(self.response_type.as_str()));

        for (name, value) in &self.extra {
            params.insert(name.clone(), value.clone());
        }
        params
    }
}

/// Shape of an `export_responses` result
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Mapping(Map<String, Value>),
    List(Vec<Value>),
    Scalar(Value),
}

impl From<Value> for ExportPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ExportPayload::Mapping(map),
            Value::Array(items) => ExportPayload::List(items),
            other => ExportPayload::Scalar(other),
        }
    }
}

impl ExportPayload {
    /// The single encoded string the payload wraps
    ///
    /// A mapping must hold exactly one value and a list exactly one element.
    pub fn into_encoded(self) -> LimeResult<String> {
        let inner = match self {
            ExportPayload::Mapping(map) => {
                if map.len() != 1 {
                    return Err(LimeError::UnexpectedFormat(format!(
                        "export mapping has {} values, expected 1",
                        map.len()
                    )));
                }
                map.into_iter().next().map(|(_, value)| value)
            }
            ExportPayload::List(items) => {
                if items.len() != 1 {
                    return Err(LimeError::UnexpectedFormat(format!(
                        "export list has {} elements, expected 1",
                        items.len()
                    )));
                }
                items.into_iter().next()
            }
            ExportPayload::Scalar(value) => Some(value),
        };

        match inner {
            Some(Value::String(encoded)) => Ok(encoded),
            Some(other) => Err(LimeError::UnexpectedFormat(format!(
                "export payload is not a string: {}",
                crate::rpc::excerpt(&other.to_string())
            ))),
            None => Err(LimeError::UnexpectedFormat("empty export payload".to_string())),
        }
    }
}

/// Decode a base64 `;`-separated export into a table of text cells
pub fn decode_export(encoded: &str) -> LimeResult<Table> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| LimeError::Decoding(format!("invalid base64 export: {}", e)))?;

    let text = String::from_utf8_lossy(&bytes);
    Table::parse(&text, &TableOptions::semicolon())
        .map_err(|e| LimeError::UnexpectedFormat(format!("malformed export table: {}", e)))
}

/// School number encoded in a survey title
///
/// The title must start with exactly four ASCII digits; anything else yields
/// `None`.
pub fn school_number_from_title(title: &str) -> Option<&str> {
    let prefix = title.get(..SCHOOL_NUMBER_LEN)?;
    if prefix.bytes().all(|b| b.is_ascii_digit()) {
        Some(prefix)
    } else {
        None
    }
}

pub fn is_ubb_title(title: &str) -> bool {
    title.contains(UBB_MARKER)
}

/// Numeric count from a number or numeric text such as `"12"` or `"5.0"`
///
/// Non-positive values count as zero; any positive fraction rounds up so it
/// still counts as having responses.
fn completed_count(value: Option<&Value>) -> Option<u64> {
    let count = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())?;

    if count > 0.0 {
        Some(count.ceil() as u64)
    } else {
        Some(0)
    }
}

impl<T: Transport> LimeSession<T> {
    /// All surveys visible to the logged-in user
    pub fn list_surveys(&self) -> LimeResult<Vec<SurveyRecord>> {
        match self.call("list_surveys", Map::new())? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).map_err(|e| {
                        LimeError::UnexpectedFormat(format!("invalid survey record: {}", e))
                    })
                })
                .collect(),
            Value::Object(map) => match map.get("status").and_then(Value::as_str) {
                Some(NO_SURVEYS_STATUS) => Ok(Vec::new()),
                Some(status) => Err(LimeError::Protocol(format!(
                    "'list_surveys' failed remotely: {}",
                    status
                ))),
                None => Err(LimeError::UnexpectedFormat(
                    "list_surveys returned an object without status".to_string(),
                )),
            },
            other => Err(LimeError::UnexpectedFormat(format!(
                "list_surveys returned {}",
                crate::rpc::excerpt(&other.to_string())
            ))),
        }
    }

    /// Export responses of one survey as a table of text cells
    ///
    /// # Errors
    /// - [`LimeError::UnexpectedFormat`] if the payload is not a single string
    /// - [`LimeError::Decoding`] if the string is not valid base64
    pub fn export_responses(&self, survey_id: u64, options: &ExportOptions) -> LimeResult<Table> {
        let result = self.call("export_responses", options.to_params(survey_id))?;
        let encoded = ExportPayload::from(result).into_encoded()?;
        let table = decode_export(&encoded)?;

        info!(
            survey_id = survey_id,
            rows = table.len(),
            columns = table.headers().len(),
            "Exported survey responses"
        );
        Ok(table)
    }

    /// Completed-response count from `get_summary`
    ///
    /// A missing or non-numeric count is `None`, not an error.
    pub fn get_response_count(&self, survey_id: u64) -> LimeResult<ResponseCount> {
        let mut params = Map::new();
        params.insert("iSurveyID".to_string(), Value::from(survey_id));

        let summary = match self.call("get_summary", params)? {
            Value::Object(map) => map,
            other => {
                return Err(LimeError::UnexpectedFormat(format!(
                    "get_summary returned {}",
                    crate::rpc::excerpt(&other.to_string())
                )))
            }
        };

        let raw = summary.get("completed_responses");
        if raw.is_none() {
            if let Some(status) = summary.get("status").and_then(Value::as_str) {
                return Err(LimeError::Protocol(format!(
                    "'get_summary' failed remotely: {}",
                    status
                )));
            }
        }

        let completed_responses = completed_count(raw);
        if completed_responses.is_none() {
            warn!(
                survey_id = survey_id,
                value = ?raw,
                "Completed response count missing or not numeric"
            );
        }

        Ok(ResponseCount {
            survey_id,
            completed_responses,
        })
    }

    /// Surveys of one school that have completed responses
    ///
    /// Matches titles starting with `school_number` whose UBB marker equals
    /// `is_ubb`, then drops surveys without completed responses. Issues one
    /// `get_summary` call per matched survey.
    ///
    /// # Errors
    /// - [`LimeError::NoSurveys`] if the account has no surveys at all
    /// - [`LimeError::SurveyNotFound`] if no title matches
    /// - [`LimeError::NoCompletedResponses`] if no match has responses
    pub fn find_survey_ids(&self, school_number: &str, is_ubb: bool) -> LimeResult<Vec<SurveyMatch>> {
        let surveys = self.list_surveys()?;
        if surveys.is_empty() {
            return Err(LimeError::NoSurveys);
        }

        let candidates: Vec<SurveyRecord> = surveys
            .into_iter()
            .filter(|s| {
                school_number_from_title(&s.title) == Some(school_number)
                    && is_ubb_title(&s.title) == is_ubb
            })
            .collect();

        if candidates.is_empty() {
            return Err(LimeError::SurveyNotFound {
                school_number: school_number.to_string(),
                is_ubb,
            });
        }
        debug!(
            school_number = %school_number,
            is_ubb = is_ubb,
            candidates = candidates.len(),
            "Matched surveys by title"
        );

        let mut matches = Vec::with_capacity(candidates.len());
        for survey in candidates {
            let count = self.get_response_count(survey.sid)?;
            match count.completed_responses {
                Some(completed) if completed > 0 => matches.push(SurveyMatch {
                    survey,
                    school_number: school_number.to_string(),
                    completed_responses: completed,
                }),
                _ => debug!(survey_id = survey.sid, "Skipping survey without completed responses"),
            }
        }

        if matches.is_empty() {
            return Err(LimeError::NoCompletedResponses {
                school_number: school_number.to_string(),
                is_ubb,
            });
        }
        Ok(matches)
    }
}
