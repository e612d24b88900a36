//! Route handlers organized by resource

pub mod activity;
pub mod auth;
pub mod documents;
pub mod download;
pub mod events;
pub mod export;
pub mod fees;
pub mod health;
pub mod junior_members;
pub mod meetings;
pub mod members;
pub mod print;
pub mod radios;
pub mod scheduler;
pub mod templates;
pub mod training;
pub mod users;
pub mod vehicles;
pub mod warehouse;

use std::sync::Arc;

use uuid::Uuid;

use crate::db::repos::ActivityRepo;
use crate::state::AppState;

/// Best-effort audit write. A failing log entry is reported but never
/// fails the operation that triggered it.
pub(crate) async fn log_activity(
    state: &Arc<AppState>,
    user_id: Uuid,
    module: &str,
    action: &str,
    record_id: Option<Uuid>,
    description: &str,
) {
    if let Err(e) = ActivityRepo::new(&state.pool)
        .record(user_id, module, action, record_id, Some(description))
        .await
    {
        tracing::warn!("activity log write failed: {}", e);
    }
}
