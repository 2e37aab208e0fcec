mod bootstrap;
mod health;
mod service;
mod webhook;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use coindash_core::config::{AppConfig, DeliveryMode, LoadOptions};
use coindash_telegram::polling::{HttpUpdateSource, LongPollRunner, ReconnectPolicy};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use coindash_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let delivery = app.config.telegram.delivery;

    let mut router = health::router(health::HealthState::new(app.store.clone(), delivery));
    if delivery == DeliveryMode::Webhook {
        let secret: SecretString = app
            .config
            .telegram
            .webhook_secret
            .clone()
            .context("telegram.webhook_secret is required for webhook delivery")?;
        router = router.merge(webhook::router(
            &app.config.telegram.webhook_path,
            webhook::WebhookState::new(app.processor.clone(), secret),
        ));
    }
    spawn_http(&app.config.server.bind_address, app.config.server.port, router).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        delivery_mode = delivery.as_str(),
        "coindash-server started"
    );

    match delivery {
        DeliveryMode::Polling => {
            let source = Arc::new(HttpUpdateSource::new(
                app.bot_api.clone(),
                app.config.telegram.poll_timeout_secs,
            ));
            let runner =
                LongPollRunner::new(source, app.processor.clone(), ReconnectPolicy::default());

            tokio::select! {
                outcome = runner.run() => outcome?,
                signal = wait_for_shutdown() => signal?,
            }
        }
        DeliveryMode::Webhook => {
            webhook::register(app.bot_api.as_ref(), &app.config.telegram).await?;
            wait_for_shutdown().await?;
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "coindash-server stopping"
    );

    Ok(())
}

async fn spawn_http(bind_address: &str, port: u16, router: Router) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http listener started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router).await {
            tracing::error!(
                event_name = "system.http.error",
                correlation_id = "bootstrap",
                error = %error,
                "http listener terminated unexpectedly"
            );
        }
    });

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
