use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Alerts received since start-up, oldest first.
pub type AlertLog = Arc<RwLock<Vec<AlertRecord>>>;

const DEFAULT_ALERT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: NaiveDateTime,
    pub level: String,
    pub message: String,
}

/// Timestamps are accepted with or without an offset; the wall-clock time
/// as sent is kept.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl RawTimestamp {
    fn wall_clock(self) -> NaiveDateTime {
        match self {
            Self::Zoned(t) => t.naive_local(),
            Self::Naive(t) => t,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertRequest {
    pub message: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    timestamp: Option<RawTimestamp>,
}

fn default_level() -> String {
    "INFO".to_string()
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub status: &'static str,
    pub log_entry: String,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertRecord>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Stores an alert and echoes the formatted log line.
pub async fn receive_alert(
    State(alerts): State<AlertLog>,
    Json(req): Json<AlertRequest>,
) -> (StatusCode, Json<AlertResponse>) {
    let record = AlertRecord {
        timestamp: req
            .timestamp
            .map_or_else(|| Local::now().naive_local(), RawTimestamp::wall_clock),
        level: req.level.to_uppercase(),
        message: req.message,
    };

    let log_entry = format!(
        "[{}] [{}] {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.level,
        record.message
    );
    tracing::info!(level = %record.level, "alert received: {}", log_entry);

    alerts.write().await.push(record);

    (
        StatusCode::CREATED,
        Json(AlertResponse {
            status: "Alert received",
            log_entry,
        }),
    )
}

/// The latest `limit` alerts (default 20), oldest first.
pub async fn list_alerts(
    State(alerts): State<AlertLog>,
    Query(query): Query<AlertsQuery>,
) -> Json<AlertsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT);
    let log = alerts.read().await;
    let start = log.len().saturating_sub(limit);
    Json(AlertsResponse {
        alerts: log[start..].to_vec(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "API is healthy",
    })
}
