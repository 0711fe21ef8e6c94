use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::documents::service::hard_delete_expired;
use crate::state::AppState;

/// Periodic expiration sweep. Runs until the process exits; a failing pass
/// is logged and the next tick tries again.
pub async fn run_expiration_sweep(state: Arc<AppState>) {
    let interval_seconds = state.config.expiration_sweep_interval_seconds;
    let retention_days = state.config.documents_retention_days;
    info!(
        interval_seconds,
        retention_days, "expiration sweep started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    if !state.config.expiration_sweep_run_on_startup {
        // The first tick of a tokio interval fires immediately.
        interval.tick().await;
    }

    loop {
        interval.tick().await;
        if let Err(err) =
            hard_delete_expired(&state, retention_days, Utc::now().naive_utc()).await
        {
            error!(error = %err, "expiration sweep pass failed");
        }
    }
}
