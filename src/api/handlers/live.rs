use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::AppState;

/// Live channel: pushes `fileUploaded` / `fileDeleted` events to the viewer.
/// Route: GET /ws
pub async fn live_updates(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| forward_events(socket, state))
}

async fn forward_events(socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = state.service.subscribe();
    let viewer = subscription.id();
    tracing::info!(%viewer, "Viewer connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(%viewer, error = %e, "Failed to encode file event");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(%viewer, error = %e, "Delivery failed, dropping viewer");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                // Viewers only listen; anything they send is ignored.
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%viewer, error = %e, "Viewer connection error");
                    break;
                }
            },
        }
    }

    subscription.unsubscribe();
    tracing::info!(%viewer, "Viewer disconnected");
}
