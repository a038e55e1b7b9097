use std::sync::Arc;

use preparation_core::service::PreparationService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Preparation use cases, wired to the configured store and order lookup.
    pub service: Arc<PreparationService>,
}
