//! HTTP and WebSocket transport
//!
//! - `POST /spring/simulate` validates parameters and supersedes the active run
//! - `GET /spring/limits` returns the configured limits
//! - `GET /spring/status` reports the active run, if any
//! - `GET /ws` subscribes to every init and data frame

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use springsim_core::sink::{DeliveryError, Frame, Subscriber};
use springsim_core::{Broadcaster, Limits, RunManager, SimulationParameters};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared state for all handlers. Clones share the same manager and
/// broadcaster.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RunManager>,
    pub broadcaster: Arc<Broadcaster>,
    pub limits: Limits,
    /// Frames buffered per WebSocket subscriber
    pub queue_depth: usize,
}

impl AppState {
    pub fn new(manager: RunManager, limits: Limits, queue_depth: usize) -> Self {
        Self {
            manager: Arc::new(manager),
            broadcaster: Arc::new(Broadcaster::new()),
            limits,
            queue_depth: queue_depth.max(1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RejectionResponse {
    pub detail: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct ActiveRun {
    pub run: u64,
    pub params: SimulationParameters,
    pub regime: String,
}

#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    pub active: Option<ActiveRun>,
    pub subscribers: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/spring/simulate", post(simulate_handler))
        .route("/spring/limits", get(limits_handler))
        .route("/spring/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C, then stop the active run
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("springsim listening on http://{}", listener.local_addr()?);

    let manager = Arc::clone(&state.manager);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::task::spawn_blocking(move || manager.cancel()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
}

/// POST `/spring/simulate`
///
/// Responds 422 with every violated rule, or 200 once the new run has
/// replaced the previous one.
pub async fn simulate_handler(
    State(state): State<AppState>,
    Json(params): Json<SimulationParameters>,
) -> impl IntoResponse {
    if let Err(rejection) = params.validate(&state.limits) {
        info!("rejected simulation request: {rejection}");
        let detail = rejection
            .errors()
            .iter()
            .map(|err| FieldError {
                field: err.field(),
                message: err.to_string(),
            })
            .collect();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RejectionResponse { detail }),
        )
            .into_response();
    }

    // Superseding joins the previous loop, which blocks for up to one tick
    let manager = Arc::clone(&state.manager);
    let broadcaster = Arc::clone(&state.broadcaster);
    let limits = state.limits;
    let result = tokio::task::spawn_blocking(move || {
        manager.request_simulation(params, limits, broadcaster)
    })
    .await;

    match result {
        Ok(Ok(run)) => {
            debug!(run = %run, "simulation request accepted");
            Json(StatusResponse {
                status: "new simulation started".to_string(),
            })
            .into_response()
        }
        Ok(Err(err)) => {
            error!("failed to start simulation: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        Err(err) => {
            error!("simulation request task failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// GET `/spring/limits`
pub async fn limits_handler(State(state): State<AppState>) -> Json<Limits> {
    Json(state.limits)
}

/// GET `/spring/status`
///
/// Reads the run slot off the async workers, since a superseding request
/// holds it while the previous loop is joined.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || {
        let active = state.manager.current().map(|info| ActiveRun {
            run: info.id.0,
            params: info.params,
            regime: format!("{:?}", info.regime),
        });
        RunStatusResponse {
            active,
            subscribers: state.broadcaster.subscriber_count(),
        }
    })
    .await;

    match result {
        Ok(status) => Json(status).into_response(),
        Err(err) => {
            error!("status task failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_frames(socket, state))
}

/// Bridges the synchronous broadcaster to an async WebSocket task
pub struct ChannelSubscriber(pub mpsc::Sender<Frame>);

impl Subscriber for ChannelSubscriber {
    fn try_send(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.0.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }
}

/// Push every broadcast frame to the socket until either side closes
async fn forward_frames(websocket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel(state.queue_depth);
    let id = state.broadcaster.subscribe(Box::new(ChannelSubscriber(tx)));
    info!("WebSocket subscriber connected");

    let (mut ws_sender, mut ws_receiver) = websocket.split();

    let frames_to_ws = async {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.to_string())).await.is_err() {
                info!("WebSocket closed (send failed)");
                break;
            }
        }
    };

    let ws_closed = async {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    info!("WebSocket closed by client");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("WebSocket error: {err}");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = frames_to_ws => {},
        _ = ws_closed => {},
    }

    state.broadcaster.unsubscribe(id);
    info!("WebSocket subscriber disconnected");
}
