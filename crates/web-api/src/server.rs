use crate::handlers::{self, AlertLog};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Default)]
pub struct ApiServer {
    alerts: AlertLog,
}

impl ApiServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the in-memory alert log.
    #[must_use]
    pub fn alerts(&self) -> AlertLog {
        self.alerts.clone()
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/alert", post(handlers::receive_alert))
            .route("/alerts", get(handlers::list_alerts))
            .route("/health", get(handlers::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.alerts.clone())
    }

    /// Starts the alert server on `addr`.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Alert API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_alert(body: Value) -> Request<Body> {
        Request::post("/alert")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(
            ApiServer::new().router(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "API is healthy" }));
    }

    #[tokio::test]
    async fn test_post_alert_formats_entry() {
        let server = ApiServer::new();
        let (status, body) = call(
            server.router(),
            post_alert(json!({
                "message": "Order submitted",
                "level": "warning",
                "timestamp": "2025-03-04T09:15:30"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "Alert received");
        assert_eq!(
            body["log_entry"],
            "[2025-03-04 09:15:30] [WARNING] Order submitted"
        );

        let stored = server.alerts();
        let log = stored.read().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, "WARNING");
    }

    #[tokio::test]
    async fn test_post_alert_defaults() {
        let server = ApiServer::new();
        let (status, body) = call(
            server.router(),
            post_alert(json!({ "message": "hello", "timestamp": "2025-03-04T09:15:30+02:00" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["log_entry"], "[2025-03-04 09:15:30] [INFO] hello");

        let (status, body) = call(server.router(), post_alert(json!({ "message": "now" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["log_entry"].as_str().unwrap().ends_with("[INFO] now"));
    }

    #[tokio::test]
    async fn test_list_alerts_returns_latest_oldest_first() {
        let server = ApiServer::new();
        for i in 0..25 {
            let (status, _) = call(
                server.router(),
                post_alert(json!({ "message": format!("alert {i}"), "timestamp": "2025-03-04T09:00:00" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = call(
            server.router(),
            Request::get("/alerts").body(Body::empty()).unwrap(),
        )
        .await;
        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 20);
        assert_eq!(alerts[0]["message"], "alert 5");
        assert_eq!(alerts[19]["message"], "alert 24");

        let (_, body) = call(
            server.router(),
            Request::get("/alerts?limit=2").body(Body::empty()).unwrap(),
        )
        .await;
        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1]["message"], "alert 24");
        assert_eq!(alerts[1]["level"], "INFO");
    }

    #[tokio::test]
    async fn test_missing_message_rejected() {
        let response = ApiServer::new()
            .router()
            .oneshot(post_alert(json!({ "level": "INFO" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
