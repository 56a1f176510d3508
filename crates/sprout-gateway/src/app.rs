use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sprout_core::config::SproutConfig;
use sprout_garden::PlantStore;
use sprout_scheduler::SchedulerHandle;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: SproutConfig,
    pub scheduler: SchedulerHandle,
    /// Read side only; every write goes through a scheduled job.
    pub store: Arc<dyn PlantStore>,
}

impl AppState {
    pub fn new(config: SproutConfig, scheduler: SchedulerHandle, store: Arc<dyn PlantStore>) -> Self {
        Self {
            config,
            scheduler,
            store,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/api/plants",
            get(crate::http::plants::list_plants).post(crate::http::plants::plant_seed),
        )
        .route(
            "/api/plants/{id}/fertilize",
            post(crate::http::plants::fertilize),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
