//! Subscription frame processing loop.
//!
//! Reads frames from an acknowledged real-time connection, parses them
//! into [`ServerFrame`] variants, and forwards the ones that matter to the
//! reconciler as [`ChannelEvent`]s. Runs until the operation completes, the
//! connection drops, or the subscription is released.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use docquery_core::types::JobId;

use crate::client::{send_frame, WsStream};
use crate::documents::COMPLETE_FIELD;
use crate::events::ChannelEvent;
use crate::messages::{error_text, parse_frame, ClientFrame, ServerFrame};

/// What the loop should do after handling one frame.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drive one subscription operation until it ends.
///
/// On cancellation a `stop` frame is sent and the socket is closed; no
/// event is emitted. Any other ending that the server did not announce
/// with `complete` is reported as [`ChannelEvent::Error`].
pub async fn process_frames(
    ws_stream: WsStream,
    operation_id: String,
    job_id: JobId,
    events: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
) {
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(job_id = %job_id, "Releasing subscription");
                let stop = ClientFrame::Stop { id: operation_id.clone() };
                if let Err(e) = send_frame(&mut sink, &stop).await {
                    tracing::debug!(job_id = %job_id, error = %e, "Failed to send stop frame");
                }
                let _ = sink.close().await;
                return;
            }
            msg = stream.next() => {
                let flow = match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&text, &operation_id, &job_id, &events).await
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                        Flow::Continue
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(job_id = %job_id, ?frame, "Real-time endpoint closed the connection");
                        emit_error(&events, &job_id, "Connection closed by server".into()).await;
                        Flow::Stop
                    }
                    Some(Ok(_)) => Flow::Continue,
                    Some(Err(e)) => {
                        tracing::error!(job_id = %job_id, error = %e, "WebSocket receive error");
                        emit_error(&events, &job_id, e.to_string()).await;
                        Flow::Stop
                    }
                    None => {
                        tracing::info!(job_id = %job_id, "WebSocket stream exhausted");
                        emit_error(&events, &job_id, "Connection ended unexpectedly".into()).await;
                        Flow::Stop
                    }
                };

                if flow == Flow::Stop {
                    return;
                }
            }
        }
    }
}

/// Dispatch a single text frame.
async fn handle_text_frame(
    text: &str,
    operation_id: &str,
    job_id: &str,
    events: &mpsc::Sender<ChannelEvent>,
) -> Flow {
    let frame = match parse_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                job_id = %job_id,
                error = %e,
                raw_message = %text,
                "Failed to parse subscription frame",
            );
            return Flow::Continue;
        }
    };

    match frame {
        ServerFrame::Data { id, payload } if id == operation_id => {
            if !payload.errors.is_empty() {
                let message = payload
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                return forward(events, ChannelEvent::Error { job_id: job_id.to_string(), message }).await;
            }
            let confirmed = payload.flag(COMPLETE_FIELD);
            tracing::debug!(job_id = %job_id, confirmed, "Completion notification received");
            forward(
                events,
                ChannelEvent::Notified {
                    job_id: job_id.to_string(),
                    confirmed,
                },
            )
            .await
        }
        ServerFrame::Error { id, payload } if id.as_deref().map_or(true, |id| id == operation_id) => {
            forward_error(events, job_id, &payload).await
        }
        ServerFrame::ConnectionError { payload } => forward_error(events, job_id, &payload).await,
        ServerFrame::Complete { id } if id == operation_id => {
            tracing::debug!(job_id = %job_id, "Subscription completed by server");
            Flow::Stop
        }
        ServerFrame::StartAck { .. } => {
            tracing::debug!(job_id = %job_id, "Subscription registered");
            Flow::Continue
        }
        ServerFrame::KeepAlive {} => {
            tracing::trace!(job_id = %job_id, "Keep-alive");
            Flow::Continue
        }
        other => {
            tracing::debug!(job_id = %job_id, frame = ?other, "Ignoring frame for another operation");
            Flow::Continue
        }
    }
}

async fn forward_error(
    events: &mpsc::Sender<ChannelEvent>,
    job_id: &str,
    payload: &serde_json::Value,
) -> Flow {
    let message = error_text(payload);
    tracing::error!(job_id = %job_id, error = %message, "Subscription error");
    forward(events, ChannelEvent::Error { job_id: job_id.to_string(), message }).await
}

/// Send an event; stop when nobody is listening any more.
async fn forward(events: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) -> Flow {
    match events.send(event).await {
        Ok(()) => Flow::Continue,
        Err(_) => {
            tracing::debug!("Event receiver dropped, ending subscription task");
            Flow::Stop
        }
    }
}

async fn emit_error(events: &mpsc::Sender<ChannelEvent>, job_id: &str, message: String) {
    let _ = events
        .send(ChannelEvent::Error {
            job_id: job_id.to_string(),
            message,
        })
        .await;
}
