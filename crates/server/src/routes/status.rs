use axum::{Json, Router, extract::State, routing::get};
use jarvis::HistoryStats;
use serde::Serialize;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub jarvis_name: String,
    pub version: &'static str,
    pub features: FeatureStatus,
    pub stats: HistoryStats,
}

#[derive(Debug, Serialize)]
pub struct FeatureStatus {
    pub typing: bool,
    pub file_operations: bool,
    pub system_shutdown: bool,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let features = &state.config.features;
    Json(StatusResponse {
        status: "online",
        jarvis_name: state.config.assistant.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        features: FeatureStatus {
            typing: features.remote_typing,
            file_operations: features.file_operations,
            system_shutdown: features.system_shutdown,
        },
        stats: state.history.stats().await,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::routes::{router, testing::*};

    #[tokio::test]
    async fn test_status_reports_online() {
        let (state, _) = state();

        let response = router(state).oneshot(get("/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "online");
        assert_eq!(json["jarvis_name"], "JARVIS");
        assert_eq!(json["features"]["system_shutdown"], false);
        assert_eq!(json["stats"]["totalCommands"], 0);
    }

    #[tokio::test]
    async fn test_status_counts_handled_commands() {
        let (state, _) = state();
        state
            .dispatcher
            .handle("open chrome", jarvis::Source::Phone)
            .await;

        let response = router(state).oneshot(get("/status")).await.unwrap();

        let json = body_json(response).await;
        assert_eq!(json["stats"]["totalCommands"], 1);
        assert_eq!(json["stats"]["byAction"]["app_launch"], 1);
    }
}
