//! Binary entry point - wires configuration, adapters, and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Json;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use analyzer_billing::adapters::http::{billing_router, BillingAppState};
use analyzer_billing::adapters::postgres::{PostgresDebugLogStore, PostgresEntitlementRepository};
use analyzer_billing::adapters::stripe::{StripeConfig, StripePaymentDirectory};
use analyzer_billing::adapters::telegram::{TelegramConfig, TelegramNotifier};
use analyzer_billing::application::{ExpiryScanJob, PaymentEventProcessor};
use analyzer_billing::config::AppConfig;
use analyzer_billing::domain::entitlement::{PlanCatalog, StripeWebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,analyzer_billing=debug,sqlx=warn")),
        )
        .init();

    let config = match AppConfig::load().and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => config,
        Err(e) => {
            // Keep the webhook endpoint up but inert: the provider gets a
            // clear 503 and keeps retrying until configuration is fixed.
            tracing::error!(error = %e, "Configuration missing or invalid, serving degraded");
            return serve_degraded().await;
        }
    };

    tracing::info!(
        environment = ?config.server.environment,
        test_mode = config.payment.is_test_mode(),
        "Starting analyzer-billing"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let repository = Arc::new(PostgresEntitlementRepository::new(pool.clone()));
    let debug_log = Arc::new(PostgresDebugLogStore::new(pool));
    let directory = Arc::new(StripePaymentDirectory::new(StripeConfig::new(
        config.payment.stripe_api_key.clone(),
    )));

    let notifier = if config.notifications.is_configured() {
        Arc::new(TelegramNotifier::new(TelegramConfig::new(
            config.notifications.telegram_bot_token.clone(),
            config.notifications.admin_chat_id.clone(),
        )))
    } else {
        tracing::warn!("Telegram not configured, notifications will be skipped");
        Arc::new(TelegramNotifier::disabled())
    };

    let processor = Arc::new(PaymentEventProcessor::new(
        repository.clone(),
        directory,
        notifier.clone(),
        debug_log.clone(),
        StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone()),
        PlanCatalog::new(
            config.payment.monthly_price_id.clone(),
            config.payment.annual_price_id.clone(),
        ),
        config.payment.allowed_product_ids_list(),
    ));

    let scan_job = Arc::new(ExpiryScanJob::new(
        repository,
        notifier,
        debug_log.clone(),
        config.notifications.dashboard_url.clone(),
    ));

    let state = BillingAppState {
        processor,
        scan_job,
        debug_log,
    };

    let app = billing_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve a router whose every route reports missing configuration.
async fn serve_degraded() -> Result<(), Box<dyn std::error::Error>> {
    async fn missing_config() -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "Missing config"})),
        )
    }

    let app = Router::new().fallback(missing_config);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, app).await?;

    Ok(())
}
