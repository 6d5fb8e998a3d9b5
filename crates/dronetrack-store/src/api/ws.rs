//! WebSocket stream of order status changes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::state::StoreState;
use dronetrack_core::models::{StatusChange, STATUS_CHANGED_EVENT};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    order_id: Option<String>,
}

/// Frame pushed to stream subscribers.
#[derive(Debug, Serialize)]
pub struct StreamFrame<'a> {
    pub event: &'static str,
    pub data: &'a StatusChange,
}

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<StoreState>>,
    Query(params): Query<StreamQuery>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.order_id))
        .into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<StoreState>, order_filter: Option<String>) {
    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(change) => {
                        if let Some(order_id) = order_filter.as_deref() {
                            if change.id != order_id {
                                continue;
                            }
                        }
                        let frame = StreamFrame { event: STATUS_CHANGED_EVENT, data: &change };
                        let Ok(text) = serde_json::to_string(&frame) else {
                            continue;
                        };
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "status stream subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
