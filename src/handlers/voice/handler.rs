//! Voice WebSocket handler.
//!
//! One long-lived connection per client. Inbound text frames carry
//! transcripts; outbound frames carry tagged responses and binary audio.
//! The connection owns a [`Session`]; closing it cancels any in-flight
//! pipeline run. Connections never share state, so one session's failure
//! cannot take down another.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::core::orchestrator::SessionEvent;
use crate::core::session::Session;
use crate::state::AppState;

use super::messages::{IncomingMessage, MessageRoute, OutgoingMessage, encode_audio_frame};

/// Channel buffer size; bounds how far a pipeline can run ahead of the
/// socket before backpressure kicks in.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum inbound WebSocket message size (64 KB; transcripts only)
const MAX_WS_MESSAGE_SIZE: usize = 64 * 1024;

/// How often the receive loop checks for a stale connection
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum idle time before closing the connection
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Voice WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for the streaming
/// voice-response pipeline.
pub async fn voice_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_voice_socket(socket, state))
}

/// Handle the voice WebSocket connection
async fn handle_voice_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session = Arc::new(Session::new());
    info!(session_id = %session.id(), "Voice WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, MessageRoute::Close);

            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                MessageRoute::Audio(frame) => sender.send(Message::Binary(frame)).await,
                MessageRoute::Close => sender.send(Message::Close(None)).await,
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
            if should_close {
                break;
            }
        }
    });

    // Forwarder: pipeline events become wire frames. Event order is
    // emission order, which the sender task preserves.
    let forward_tx = message_tx.clone();
    let forwarder_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let route = match event {
                SessionEvent::Response { generation, result } => {
                    MessageRoute::Outgoing(OutgoingMessage::Response { generation, result })
                }
                SessionEvent::AudioChunk {
                    generation,
                    sequence,
                    bytes,
                } => MessageRoute::Audio(encode_audio_frame(generation, sequence, &bytes)),
            };
            if forward_tx.send(route).await.is_err() {
                break;
            }
        }
    });

    // Track last activity time for idle connection detection
    let mut last_activity = Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        let continue_processing = process_voice_message(
                            msg,
                            &session,
                            &app_state,
                            &event_tx,
                            &message_tx,
                        ).await;
                        if !continue_processing {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session.id(), "Voice WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(session_id = %session.id(), "Voice WebSocket closed by client");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        session_id = %session.id(),
                        "Voice WebSocket idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    let _ = message_tx.send(MessageRoute::Close).await;
                    break;
                }
            }
        }
    }

    // Disconnect cancels any in-flight run tied to this session; the run
    // observes the flag at its next emission check and stops.
    session.cancel();
    sender_task.abort();
    forwarder_task.abort();

    info!(session_id = %session.id(), "Voice WebSocket connection terminated");
}

/// Process one incoming WebSocket message.
///
/// Returns `false` to terminate the connection.
async fn process_voice_message(
    msg: Message,
    session: &Arc<Session>,
    app_state: &Arc<AppState>,
    event_tx: &mpsc::Sender<SessionEvent>,
    message_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    match msg {
        Message::Text(text) => {
            let incoming: IncomingMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(session_id = %session.id(), "Failed to parse voice message: {}", e);
                    let _ = message_tx
                        .send(MessageRoute::Outgoing(OutgoingMessage::Error {
                            message: format!("Invalid message format: {e}"),
                        }))
                        .await;
                    return true;
                }
            };

            if let Err(e) = incoming.validate_size() {
                warn!(session_id = %session.id(), "Message validation failed: {}", e);
                let _ = message_tx
                    .send(MessageRoute::Outgoing(OutgoingMessage::Error { message: e }))
                    .await;
                return true;
            }

            match incoming {
                IncomingMessage::Message { text } => {
                    app_state
                        .orchestrator
                        .handle_transcript(session, text, event_tx.clone());
                    true
                }
            }
        }
        Message::Binary(_) => {
            debug!(session_id = %session.id(), "Ignoring unexpected binary frame");
            true
        }
        Message::Close(_) => false,
        // Ping/Pong are handled by the socket layer
        _ => true,
    }
}
