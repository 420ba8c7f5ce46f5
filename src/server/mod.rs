//! HTTP and WebSocket surface (feature `server`).
//!
//! Thin glue around [`EventRouter`] and [`SessionManager`]: REST endpoints
//! for creating and looking up sessions, recording swipes and reading
//! matches, plus a `/ws` endpoint speaking the event protocol.

mod error;
mod handlers;
mod ws;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{EventRouter, SeaOrmStore, SessionManager};

pub use error::AppError;

/// Tripped when the storage layer fails; the server shuts down on it.
#[derive(Debug, Default)]
pub struct FatalSignal {
    tripped: AtomicBool,
    notify: Notify,
}

impl FatalSignal {
    pub fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Resolves once [`trip`](Self::trip) was called.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_tripped() {
            return;
        }
        notified.await;
    }
}

#[derive(Clone)]
pub struct AppState {
    pub router: EventRouter<SeaOrmStore>,
    pub fatal: Arc<FatalSignal>,
}

impl AppState {
    pub fn new(router: EventRouter<SeaOrmStore>) -> Self {
        Self {
            router,
            fatal: Arc::new(FatalSignal::default()),
        }
    }

    pub fn sessions(&self) -> &SessionManager<SeaOrmStore> {
        self.router.sessions()
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/rooms", post(handlers::create_session))
        .route("/rooms/join", post(handlers::join_by_key))
        .route("/rooms/{id}", get(handlers::get_session))
        .route("/swipes", post(handlers::record_swipe))
        .route("/swipes/{id}", get(handlers::matches))
        .route("/swipes/{id}/stats", get(handlers::swipe_stats))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
