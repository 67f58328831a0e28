//! GraphQL-over-WebSocket frame types and parser.
//!
//! The subscription endpoint speaks the `graphql-ws` sub-protocol: JSON
//! frames shaped `{"type": "<kind>", "id": "...", "payload": {...}}`.
//! Outgoing frames are [`ClientFrame`]; incoming ones parse into
//! [`ServerFrame`].

use serde::{Deserialize, Serialize};

use crate::api::GraphQlError;

/// WebSocket sub-protocol negotiated during the handshake.
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// First frame after the socket opens; carries authorization.
    #[serde(rename = "connection_init")]
    ConnectionInit { payload: serde_json::Value },

    /// Start a subscription operation under `id`.
    #[serde(rename = "start")]
    Start { id: String, payload: StartPayload },

    /// Stop the operation `id`.
    #[serde(rename = "stop")]
    Stop { id: String },
}

/// Operation carried by a `start` frame.
#[derive(Debug, Clone, Serialize)]
pub struct StartPayload {
    pub query: String,
    pub variables: serde_json::Value,
}

/// Frames sent by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// The server accepted `connection_init`.
    #[serde(rename = "connection_ack")]
    ConnectionAck {
        #[serde(default)]
        payload: serde_json::Value,
    },

    /// The server rejected the connection.
    #[serde(rename = "connection_error")]
    ConnectionError {
        #[serde(default)]
        payload: serde_json::Value,
    },

    /// Keep-alive.
    #[serde(rename = "ka")]
    KeepAlive {},

    /// The operation is registered (sent by some servers only).
    #[serde(rename = "start_ack")]
    StartAck { id: String },

    /// A subscription result.
    #[serde(rename = "data")]
    Data { id: String, payload: DataPayload },

    /// The operation failed.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: serde_json::Value,
    },

    /// The server finished the operation.
    #[serde(rename = "complete")]
    Complete { id: String },
}

/// Payload of a `data` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPayload {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl DataPayload {
    /// Boolean value of `data.<field>`; `null`, missing or non-boolean
    /// values read as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.data
            .as_ref()
            .and_then(|d| d.get(field))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Parse a text frame into a typed enum.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
/// Callers should log and continue.
pub fn parse_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    serde_json::from_str(text)
}

/// Best-effort human-readable text from an error payload.
///
/// Accepts `{"message": ..}`, `{"errors": [{"message": ..}]}`, a bare
/// array of either, or a string.
pub fn error_text(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => {
            if let Some(msg) = map.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
            if let Some(errors) = map.get("errors") {
                return error_text(errors);
            }
            payload.to_string()
        }
        serde_json::Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(error_text)
            .collect::<Vec<_>>()
            .join("; "),
        _ => "Unknown error".to_string(),
    }
}
