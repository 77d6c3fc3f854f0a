//! Application state shared across all request handlers.

use gophermart_core::store::BonusStore;
use gophermart_sdk::session::SessionKey;
use std::sync::Arc;

/// Cheap to clone: the store is behind an `Arc`, the key is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BonusStore>,
    pub sessions: SessionKey,
}

impl AppState {
    pub fn new(store: Arc<dyn BonusStore>, sessions: SessionKey) -> Self {
        Self { store, sessions }
    }
}
