//! Intermediate messages produced by the analytics agent while a job runs.
//!
//! The service appends each message to a JSON array and stores the array
//! as a string, so the list can grow at any status, including before the
//! job is terminal.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One agent progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Local ISO-8601 time as written by the agent (no zone suffix).
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Tool names, sequence numbers and anything else the agent adds.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AgentMessage {
    /// Decode the JSON-encoded message list carried by a job record.
    ///
    /// Order is preserved. Anything other than a JSON array of objects is
    /// a [`CoreError::Decode`].
    pub fn decode_list(raw: &str) -> Result<Vec<AgentMessage>, CoreError> {
        serde_json::from_str::<Vec<AgentMessage>>(raw).map_err(|e| CoreError::Decode {
            field: "agent_messages",
            message: e.to_string(),
        })
    }
}
