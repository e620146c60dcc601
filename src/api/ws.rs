// =============================================================================
// WebSocket Handler: Push-based state updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate full StateSnapshot on connect.
//   2. A fresh snapshot every 500 ms whenever the state_version has changed
//      since the last push, so a finished refresh reaches the page without
//      a reload.
//
// Ping frames are answered with Pong; any text frame is ignored.
// =============================================================================

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

/// Push loop period.
const PUSH_INTERVAL: Duration = Duration::from_millis(500);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted, upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// =============================================================================
// Connection handler
// =============================================================================

/// Manages a single WebSocket connection lifecycle.
///
/// Multiplexes the push tick and incoming frames with `tokio::select!`.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    state.ws_clients.fetch_add(1, Ordering::Relaxed);

    let (mut sender, mut receiver) = socket.split();
    let mut sequence: u64 = 0;

    let mut last_sent_version = match send_snapshot(&mut sender, &state, &mut sequence).await {
        Ok(version) => version,
        Err(e) => {
            warn!(error = %e, "failed to send initial WebSocket snapshot");
            cleanup(&state);
            return;
        }
    };

    let mut push_interval = interval(PUSH_INTERVAL);

    loop {
        tokio::select! {
            // ── Push: check for version changes ─────────────────────────
            _ = push_interval.tick() => {
                let current_version = state.current_state_version();
                if current_version != last_sent_version {
                    match send_snapshot(&mut sender, &state, &mut sequence).await {
                        Ok(version) => last_sent_version = version,
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed, disconnecting");
                            break;
                        }
                    }
                }
            }

            // ── Incoming frames ─────────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "failed to send Pong, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    cleanup(&state);
}

// =============================================================================
// Helpers
// =============================================================================

/// Serialize and send the current StateSnapshot over the WebSocket.
///
/// Returns the state version the snapshot was built from. A change that
/// lands while the frame is in flight therefore still differs from it and
/// is pushed on the next tick.
async fn send_snapshot<S>(
    sender: &mut S,
    state: &AppState,
    sequence: &mut u64,
) -> Result<u64, axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    state.ws_sequence_number.fetch_add(1, Ordering::Relaxed);
    *sequence += 1;

    let snapshot = state.build_snapshot();

    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(
                version = snapshot.state_version,
                seq = *sequence,
                "WebSocket snapshot sent"
            );
            Ok(snapshot.state_version)
        }
        Err(e) => {
            // Not a transport error; keep the connection.
            warn!(error = %e, "failed to serialize snapshot");
            Ok(snapshot.state_version)
        }
    }
}

fn cleanup(state: &AppState) {
    state.ws_clients.fetch_sub(1, Ordering::Relaxed);
    info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::CycleObserver;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::RefreshPhase;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::new(
            "AAPL",
            "2024-01-01".parse().unwrap(),
            "2024-12-31".parse().unwrap(),
        )))
    }

    #[tokio::test]
    async fn sent_version_is_the_one_serialized() {
        let state = state();
        let mut sink = futures_util::sink::drain()
            .sink_map_err(|e: std::convert::Infallible| -> axum::Error { match e {} });
        let mut sequence = 0;

        let before = state.current_state_version();
        let sent = send_snapshot(&mut sink, &state, &mut sequence).await.unwrap();

        assert_eq!(sent, before);
        assert_eq!(sequence, 1);
        assert_eq!(state.ws_sequence_number.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn change_during_send_is_still_pending() {
        let state = state();
        let racer = state.clone();
        // Publishes a phase change while the frame is being written.
        let mut sink = Box::pin(futures_util::sink::unfold((), move |(), _msg: Message| {
            let racer = racer.clone();
            async move {
                racer.on_phase(RefreshPhase::Fetching);
                Ok::<(), axum::Error>(())
            }
        }));
        let mut sequence = 0;

        let sent = send_snapshot(&mut sink, &state, &mut sequence).await.unwrap();

        assert_ne!(state.current_state_version(), sent);
        assert_eq!(state.current_state_version(), sent + 1);
    }
}
