use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use jarvis::LogRecord;
use serde::{Deserialize, Serialize};

use crate::AppState;

const DEFAULT_LIMIT: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new().route("/history", get(recent_history))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub records: Vec<LogRecord>,
}

/// Most recent commands, newest first
async fn recent_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(HistoryResponse {
        success: true,
        records: state.history.recent(limit).await,
    })
}
