//! # SREP Lime
//!
//! Session-based client for the LimeSurvey RemoteControl JSON-RPC API.
//!
//! A [`LimeSession`] logs in once, issues any number of calls carrying the
//! cached session key, and releases the key again. [`LimeSession::scoped`]
//! wraps that lifecycle so the key is released on every exit path.
//!
//! ```no_run
//! use srep_lime::{LimeSession, LimeError};
//!
//! let mut session = LimeSession::from_env()?;
//! let surveys = session.scoped(|s| s.find_survey_ids("0001", false))?;
//! for m in &surveys {
//!     println!("{} {} ({} completed)", m.survey.sid, m.survey.title, m.completed_responses);
//! }
//! # Ok::<(), LimeError>(())
//! ```

pub mod error;
pub mod rpc;
pub mod session;
pub mod surveys;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{LimeError, LimeResult};
pub use session::LimeSession;
pub use surveys::{ExportOptions, ExportPayload, ResponseCount, SurveyMatch, SurveyRecord};
pub use transport::{HttpTransport, Transport, TransportResponse};
