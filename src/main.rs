//! Edge Interdiction Service
//!
//! This is the main entry point for the edge interdiction service.
//! It initializes the application components and starts the web server.

use std::sync::Arc;
use std::time::Instant;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;
use log::{debug, info};

use edge_interdiction_service::api::{self, edge_guard, security_headers, EdgeState};
use edge_interdiction_service::config;
use edge_interdiction_service::core::{monitoring, EventStore, RateLimiter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting Edge Interdiction Service...");

    // Load configuration
    let config = Arc::new(config::load_config().context("Failed to load configuration")?);

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let events = Arc::new(EventStore::new(config.event_store.clone()));

    let event_capacity = events.capacity();
    let mut state = EdgeState::new(config.clone(), rate_limiter.clone(), events)?;
    if config.metrics.enabled {
        let handle = monitoring::install_recorder().context("Failed to install metrics recorder")?;
        state = state.with_metrics(handle);
    }
    let state = web::Data::new(state);

    // Sweep expired rate-limit buckets
    let cleanup_interval = config.rate_limit.cleanup_interval();
    actix_rt::spawn(async move {
        let mut interval = actix_rt::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = rate_limiter.cleanup(Instant::now());
            monitoring::record_tracked_sources(rate_limiter.tracked_sources());
            if removed > 0 {
                debug!("Dropped {} expired rate-limit buckets", removed);
            }
        }
    });

    info!(
        "Listening on {}:{} (limit {} requests per {}s, {} retained events)",
        config.server.host,
        config.server.port,
        config.rate_limit.max_requests,
        config.rate_limit.window_seconds,
        event_capacity
    );

    // Start HTTP server
    let csp = config.server.content_security_policy.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::config)
            .default_service(web::to(api::not_found))
            .wrap(from_fn(edge_guard))
            .wrap(Logger::default())
            .wrap(security_headers(&csp))
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;

    Ok(())
}
