use anyhow::{Context, Result};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mashup::utils::check_dependencies;
use mashup::web::{self, AppState};
use mashup::{Config, MashupPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;

    println!("============================================================");
    println!("🎵 MASHUP WEB SERVICE");
    println!("============================================================");
    config.display();

    if !config.mail_configured() {
        tracing::warn!("SMTP credentials missing - requests will be rejected until SMTP_EMAIL and SMTP_PASSWORD are set");
    }

    let missing = check_dependencies(&config.tools).await;
    for dep in &missing {
        tracing::warn!("Dependency check: {}", dep);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let pipeline = Arc::new(MashupPipeline::from_config(config));

    let app = web::router(AppState::new(pipeline)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🌐 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mashup=info,mashup_web=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
