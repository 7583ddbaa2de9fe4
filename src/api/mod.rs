//! API endpoints for the edge interdiction service.
//!
//! This module provides the dashboard read APIs over the security event log,
//! the administrative clear action, health and metrics endpoints, and the
//! shared state the edge middleware runs against.

pub mod middleware;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use chrono::{DateTime, Utc};
use log::error;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use thiserror::Error;

use crate::core::{
    Classifier, ClassifierError, EventCategory, EventLog, EventStoreError, HoneypotResponder,
    PathCount, RequestCounter, SecurityEvent, SecurityStats,
};
use crate::models::Config;

pub use middleware::{edge_guard, security_headers};

/// State shared by the middleware and the handlers
pub struct EdgeState {
    pub classifier: Classifier,
    pub rate_limiter: Arc<dyn RequestCounter>,
    pub events: Arc<dyn EventLog>,
    pub honeypot: HoneypotResponder,
    pub config: Arc<Config>,
    pub metrics: Option<PrometheusHandle>,
}

impl EdgeState {
    pub fn new(
        config: Arc<Config>,
        rate_limiter: Arc<dyn RequestCounter>,
        events: Arc<dyn EventLog>,
    ) -> Result<Self, ClassifierError> {
        Ok(Self {
            classifier: Classifier::from_config(&config.classifier)?,
            honeypot: HoneypotResponder::new(config.honeypot.clone()),
            rate_limiter,
            events,
            config,
            metrics: None,
        })
    }

    /// Serve `/metrics` from this recorder handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/metrics").route(web::get().to(prometheus_metrics)))
        .service(web::resource("/api/security/logs").route(web::get().to(security_logs)))
        .service(web::resource("/api/security/stats").route(web::get().to(security_stats)))
        .service(web::resource("/api/bot-analytics/clear").route(web::post().to(clear_logs)));
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Errors surfaced by the dashboard endpoints
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to fetch security logs")]
    Logs(#[source] EventStoreError),
    #[error("Failed to fetch security stats")]
    Stats(#[source] EventStoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

/// Health check endpoint response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// One entry of the security log as the dashboard reads it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryResponse {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub event_type: EventCategory,
    pub user_agent: Option<String>,
    pub method: String,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SecurityEvent> for LogEntryResponse {
    fn from(event: SecurityEvent) -> Self {
        Self {
            id: event.id,
            timestamp: event.timestamp,
            path: event.path,
            ip: event.source_address,
            event_type: event.category,
            user_agent: event.user_agent,
            method: event.method,
            blocked: event.blocked,
            reason: event.reason,
        }
    }
}

/// Aggregate statistics as the dashboard reads them
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_attempts: u64,
    #[serde(rename = "uniqueIPs")]
    pub unique_ips: u64,
    pub last_hour: u64,
    pub top_paths: Vec<PathCount>,
}

impl From<SecurityStats> for StatsResponse {
    fn from(stats: SecurityStats) -> Self {
        Self {
            total_attempts: stats.total_attempts,
            unique_ips: stats.unique_sources,
            last_hour: stats.last_hour,
            top_paths: stats.top_paths,
        }
    }
}

#[derive(Serialize)]
struct ClearResponse {
    success: bool,
    message: &'static str,
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus exposition endpoint
async fn prometheus_metrics(state: web::Data<EdgeState>) -> HttpResponse {
    match &state.metrics {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NotFound().json(ErrorBody::new("Metrics disabled")),
    }
}

/// Most recent security events, newest first
async fn security_logs(state: web::Data<EdgeState>) -> Result<HttpResponse, ApiError> {
    let events = state
        .events
        .recent(state.config.event_store.recent_limit)
        .map_err(|e| {
            error!("Failed to read security logs: {}", e);
            ApiError::Logs(e)
        })?;

    let entries: Vec<LogEntryResponse> = events.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(entries))
}

/// Aggregate statistics over the retained events
async fn security_stats(state: web::Data<EdgeState>) -> Result<HttpResponse, ApiError> {
    let stats = state.events.stats(Utc::now()).map_err(|e| {
        error!("Failed to compute security stats: {}", e);
        ApiError::Stats(e)
    })?;

    Ok(HttpResponse::Ok().json(StatsResponse::from(stats)))
}

/// Administrative clear of the security log
async fn clear_logs(state: web::Data<EdgeState>) -> HttpResponse {
    state.events.clear();
    log::info!("Security event log cleared");
    HttpResponse::Ok().json(ClearResponse {
        success: true,
        message: "Security logs cleared",
    })
}

/// Stand-in for the protected application when running standalone
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody::new("Not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_store::MockEventLog;
    use crate::core::{EventStore, RateLimiter, SecurityEventInput};
    use actix_web::{test, App};
    use serde_json::Value;

    fn state_with(events: Arc<dyn EventLog>) -> web::Data<EdgeState> {
        let config = Arc::new(Config::default());
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        web::Data::new(EdgeState::new(config, rate_limiter, events).unwrap())
    }

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(App::new().configure(config)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_logs_shape_and_order() {
        let store = Arc::new(EventStore::new(Default::default()));
        store.record(SecurityEventInput::passed("10.0.0.1", "GET", "/invoice", None));
        store.record(SecurityEventInput::blocked(
            "10.0.0.2",
            "GET",
            "/wp-login.php",
            Some("Mozilla/5.0".to_string()),
            EventCategory::Honeypot,
            "decoy resource GET /wp-login.php",
        ));
        let app = test::init_service(App::new().app_data(state_with(store)).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/security/logs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();

        assert_eq!(entries.len(), 2);
        let newest = &entries[0];
        assert_eq!(newest["id"], 2);
        assert_eq!(newest["ip"], "10.0.0.2");
        assert_eq!(newest["path"], "/wp-login.php");
        assert_eq!(newest["type"], "honeypot");
        assert_eq!(newest["userAgent"], "Mozilla/5.0");
        assert_eq!(newest["method"], "GET");
        assert_eq!(newest["blocked"], true);
        assert!(newest["timestamp"]
            .as_str()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .is_some());

        let oldest = &entries[1];
        assert_eq!(oldest["type"], "legitimate");
        assert!(oldest["userAgent"].is_null());
        assert!(oldest.get("reason").is_none());
    }

    #[actix_web::test]
    async fn test_logs_are_capped_at_recent_limit() {
        let store = Arc::new(EventStore::new(Default::default()));
        for i in 0..150 {
            store.record(SecurityEventInput::passed("10.0.0.1", "GET", format!("/p{}", i), None));
        }
        let app = test::init_service(App::new().app_data(state_with(store)).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/security/logs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0]["path"], "/p149");
    }

    #[actix_web::test]
    async fn test_stats_shape() {
        let store = Arc::new(EventStore::new(Default::default()));
        for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.1"] {
            store.record(SecurityEventInput::passed(ip, "GET", "/xmlrpc.php", None));
        }
        let app = test::init_service(App::new().app_data(state_with(store)).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/security/stats").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["totalAttempts"], 3);
        assert_eq!(body["uniqueIPs"], 2);
        assert_eq!(body["lastHour"], 3);
        assert_eq!(body["topPaths"][0]["path"], "/xmlrpc.php");
        assert_eq!(body["topPaths"][0]["count"], 3);
    }

    #[actix_web::test]
    async fn test_clear_is_idempotent() {
        let store = Arc::new(EventStore::new(Default::default()));
        store.record(SecurityEventInput::passed("10.0.0.1", "GET", "/", None));
        let app = test::init_service(
            App::new()
                .app_data(state_with(store.clone()))
                .configure(config),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/bot-analytics/clear")
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["success"], true);
            assert!(store.is_empty());
        }
    }

    #[actix_web::test]
    async fn test_read_failures_return_500() {
        let mut events = MockEventLog::new();
        events
            .expect_recent()
            .returning(|_| Err(EventStoreError::Unavailable("lock poisoned".to_string())));
        events
            .expect_stats()
            .returning(|_| Err(EventStoreError::Unavailable("lock poisoned".to_string())));
        let app = test::init_service(
            App::new()
                .app_data(state_with(Arc::new(events)))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/security/logs").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to fetch security logs");

        let req = test::TestRequest::get().uri("/api/security/stats").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to fetch security stats");
    }

    #[actix_web::test]
    async fn test_metrics_disabled_without_recorder() {
        let store = Arc::new(EventStore::new(Default::default()));
        let app = test::init_service(App::new().app_data(state_with(store)).configure(config)).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
