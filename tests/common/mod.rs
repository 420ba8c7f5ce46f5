#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database};
use swipe_sessions::migration::{Migrator, MigratorTrait};
use swipe_sessions::{
    CandidateSnapshot, EventReceiver, Filters, KeyGenerator, Location, OutboundEvent,
    SeaOrmStore, SessionManager,
};

/// Fresh in-memory SQLite database with the schema applied.
///
/// A single pooled connection, so every query sees the same memory database.
pub async fn store() -> SeaOrmStore {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.expect("connect to sqlite");
    Migrator::up(&conn, None).await.expect("run migrations");
    SeaOrmStore::new(conn)
}

pub async fn manager() -> SessionManager<SeaOrmStore> {
    SessionManager::new(store().await)
}

pub fn location() -> Location {
    Location {
        lat: 40.7128,
        lng: -74.006,
    }
}

pub fn filters() -> Filters {
    Filters {
        max_distance: 5000,
        ..Filters::default()
    }
}

pub fn snapshot(name: &str, rating: f64) -> CandidateSnapshot {
    CandidateSnapshot {
        name: name.to_string(),
        address: "1 Main St".to_string(),
        rating: Some(rating),
        price_level: Some(2),
        ..Default::default()
    }
}

/// Always hands out the same key.
pub struct FixedKey(pub &'static str);

impl KeyGenerator for FixedKey {
    fn generate_key(&self) -> String {
        self.0.to_string()
    }

    fn is_valid_format(&self, key: &str) -> bool {
        key.trim().len() == self.0.len()
    }
}

/// Everything queued for a connection so far.
pub fn drain(rx: &mut EventReceiver) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
