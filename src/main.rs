// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fleet Rentals API Server
//!
//! Serves the rental core over HTTP, backed by the in-memory store seeded
//! from the fleet fixture.

use fleet_rentals::{
    config::Config,
    db::MemoryDb,
    services::{LogNotificationSink, SandboxPaymentGateway},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, currency = %config.currency, "Starting Fleet Rentals API");

    // Seed the store
    tracing::info!(path = %config.fleet_fixture_path, "Loading fleet fixture");
    let db = MemoryDb::load_fixture(&config.fleet_fixture_path).await?;

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        Arc::new(SandboxPaymentGateway::new()),
        Arc::new(LogNotificationSink),
    ));

    // Expired entries are otherwise only dropped when read
    let _sweeper = state.cache.spawn_sweeper(config.cache_sweep_interval);
    tracing::info!(
        interval_secs = config.cache_sweep_interval.as_secs(),
        "Cache sweeper started"
    );

    // Build router
    let app = fleet_rentals::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleet_rentals=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;
    Ok(())
}
