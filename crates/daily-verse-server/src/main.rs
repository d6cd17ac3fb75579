//! Daily Verse Server
//!
//! Emails subscribed users a daily Bible verse with an explanation and an
//! application note, and serves the REST API behind the web front end.
//!
//! Storage is SQLite (embedded) by default, or process-local maps when
//! `STORAGE_BACKEND=memory`.

mod error;
mod extractors;
mod handlers;
mod services;
mod settings;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;
use services::{AuthService, BatchDispatcher, BibleApiSource, LogMailer, SmtpMailer};
use verse_core::{EntityStore, MailSender, VerseSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub auth_service: Arc<AuthService>,
    pub verse_source: Arc<dyn VerseSource>,
    pub dispatcher: Arc<BatchDispatcher>,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daily_verse_server=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Daily Verse Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, storage={}",
        config.bind_address, config.storage_backend
    );

    let store = storage::open(&config).await?;

    info!("Initializing services...");
    let mailer = build_mailer(&config)?;
    let verse_source: Arc<dyn VerseSource> = Arc::new(BibleApiSource::new(
        config.bible_api_url.clone(),
        config.bible_id.clone(),
        config.bible_api_key.clone(),
    )?);
    if config.bible_api_key.is_none() {
        warn!("BIBLE_API_KEY not set, serving verses from the local list");
    }

    let state = AppState {
        store: store.clone(),
        auth_service: Arc::new(AuthService::new(store.clone(), config.session_ttl())),
        verse_source,
        dispatcher: Arc::new(BatchDispatcher::new(
            store,
            mailer,
            config.dispatch_delay(),
        )),
    };
    info!("Services initialized");

    if let Some(dir) = &config.static_dir {
        info!("Static files directory: {}", dir);
    }
    let app = app(state, config.static_dir.as_deref());

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn build_mailer(config: &ServerConfig) -> Result<Arc<dyn MailSender>> {
    match &config.smtp_host {
        Some(host) => {
            let credentials = config.email_user.clone().zip(config.email_pass.clone());
            let mailer = SmtpMailer::new(
                host,
                config.smtp_port,
                credentials,
                &config.email_from,
                &config.app_url,
            )?;
            info!("Mail via SMTP relay {}:{}", host, config.smtp_port);
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("SMTP_HOST not set, verse emails will only be logged");
            Ok(Arc::new(LogMailer::new(&config.email_from, &config.app_url)?))
        }
    }
}

/// Full router. `static_dir` serves a built front end with SPA fallback.
pub fn app(state: AppState, static_dir: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes());

    if let Some(dir) = static_dir {
        let index_path = PathBuf::from(dir).join("index.html");
        router = router
            .nest_service(
                "/assets",
                ServeDir::new(PathBuf::from(dir).join("assets")),
            )
            .fallback_service(ServeFile::new(index_path));
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/user", get(handlers::auth::me))
        .route("/user/settings", patch(handlers::users::update_settings))
        .route("/verses", post(handlers::verses::create))
        .route("/verses/random", get(handlers::verses::random))
        .route(
            "/admin/send-daily-verse",
            post(handlers::admin::send_daily_verse),
        )
}
