use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

use crate::{AppState, error::ApiError, middleware::request_id_middleware};

pub mod commands;
pub mod history;
pub mod status;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(status::router())
        .merge(commands::router())
        .merge(history::router())
        .fallback(not_found)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::{testing::*, *};

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (state, _) = state();

        let response = router(state).oneshot(get("/nope")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let (state, _) = state();

        let response = router(state).oneshot(get("/status")).await.unwrap();

        assert!(
            response
                .headers()
                .contains_key(crate::middleware::REQUEST_ID_HEADER)
        );
    }
}
