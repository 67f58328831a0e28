//! Domain types shared by the docquery client and reconciler.
//!
//! Nothing in this crate performs I/O. It describes the analytics job as
//! the remote job service reports it, and decodes the JSON-encoded fields
//! (`result`, `agent_messages`) that ride inside those reports.

pub mod agent_messages;
pub mod error;
pub mod job;
pub mod result;
pub mod types;

pub use agent_messages::AgentMessage;
pub use error::CoreError;
pub use job::{JobRecord, JobStatus, SubmittedJob};
pub use result::AnalyticsResult;
