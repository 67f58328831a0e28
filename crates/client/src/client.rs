//! WebSocket client for the real-time subscription endpoint.
//!
//! [`RealtimeClient`] holds the connection configuration. Call
//! [`RealtimeClient::connect`] to open a socket and complete the
//! `connection_init` / `connection_ack` handshake, yielding a
//! [`RealtimeConnection`] ready for `start` frames.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use crate::messages::{error_text, parse_frame, ClientFrame, ServerFrame, GRAPHQL_WS_PROTOCOL};
use crate::subscription::SubscriptionError;

/// The raw socket type used by the subscription task.
pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the real-time endpoint.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    ws_url: String,
    auth_token: Option<String>,
}

/// A live, acknowledged connection.
pub struct RealtimeConnection {
    /// Keep-alive interval or timeout advertised in the ack, if any.
    pub ack_payload: serde_json::Value,
    pub ws_stream: WsStream,
}

impl RealtimeClient {
    /// * `ws_url`     - WebSocket endpoint, e.g. `wss://host/graphql/realtime`.
    /// * `auth_token` - forwarded in the `connection_init` payload.
    pub fn new(ws_url: String, auth_token: Option<String>) -> Self {
        Self { ws_url, auth_token }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect and complete the protocol handshake.
    pub async fn connect(&self) -> Result<RealtimeConnection, SubscriptionError> {
        let mut request = self
            .ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| SubscriptionError::Setup(format!("Invalid URL {}: {e}", self.ws_url)))?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(GRAPHQL_WS_PROTOCOL),
        );

        let (mut ws_stream, _response) = connect_async(request).await.map_err(|e| {
            SubscriptionError::Setup(format!("Failed to connect to {}: {e}", self.ws_url))
        })?;

        let init = ClientFrame::ConnectionInit {
            payload: self.init_payload(),
        };
        send_frame(&mut ws_stream, &init).await?;

        let ack_payload = wait_for_ack(&mut ws_stream).await?;

        tracing::info!(ws_url = %self.ws_url, "Connected to real-time endpoint");

        Ok(RealtimeConnection {
            ack_payload,
            ws_stream,
        })
    }

    fn init_payload(&self) -> serde_json::Value {
        match &self.auth_token {
            Some(token) => serde_json::json!({ "Authorization": token }),
            None => serde_json::json!({}),
        }
    }
}

/// Serialize and send one client frame.
pub async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> Result<(), SubscriptionError>
where
    S: SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = serde_json::to_string(frame)
        .map_err(|e| SubscriptionError::Protocol(format!("Failed to encode frame: {e}")))?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| SubscriptionError::Protocol(format!("Failed to send frame: {e}")))
}

/// Read frames until `connection_ack`, skipping keep-alives.
async fn wait_for_ack(ws_stream: &mut WsStream) -> Result<serde_json::Value, SubscriptionError> {
    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match parse_frame(&text) {
                Ok(ServerFrame::ConnectionAck { payload }) => return Ok(payload),
                Ok(ServerFrame::ConnectionError { payload }) => {
                    return Err(SubscriptionError::Setup(error_text(&payload)));
                }
                Ok(ServerFrame::KeepAlive {}) => {}
                Ok(other) => {
                    tracing::debug!(frame = ?other, "Ignoring frame before connection_ack");
                }
                Err(e) => {
                    tracing::warn!(error = %e, raw_message = %text, "Failed to parse handshake frame");
                }
            },
            Ok(Message::Close(frame)) => {
                return Err(SubscriptionError::Setup(format!(
                    "Connection closed during handshake: {frame:?}"
                )));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(SubscriptionError::Setup(format!("Handshake failed: {e}")));
            }
        }
    }

    Err(SubscriptionError::Setup(
        "Connection ended before connection_ack".into(),
    ))
}
