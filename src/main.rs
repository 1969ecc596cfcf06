use chat_dashboard::{
    config::Settings,
    db, handlers,
    store::{MemoryStore, PgStore, Store},
    AppState,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let settings = Settings::from_env();

    let store: Arc<dyn Store> = match settings.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::create_pool(database_url, settings.db_max_connections).await?;
            tracing::info!("✅ Connected to PostgreSQL");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::with_models([settings.default_model_tag.as_str(), "gpt-4", "gpt-3.5"]))
        }
    };

    let routes = settings.routes();
    tracing::info!("Dashboard: {}  Chat: {}  Login: {}", routes.dashboard, routes.chat, routes.login);

    let bind_addr = settings.bind_addr.clone();
    let shared_state = Arc::new(AppState::new(store, settings));
    let app = handlers::router(shared_state);

    // ConnectInfo gives the request logger the peer address
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,chat_dashboard=trace,sqlx=info,hyper=info,tower=info".to_string()
        } else {
            "info,chat_dashboard=info,sqlx=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON for log aggregation, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    tracing::info!("💬 chat-dashboard starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);
    tracing::info!(
        "Configuration - Database: {}, JWT secret: {}",
        if std::env::var("DATABASE_URL").is_ok() { "✅" } else { "❌" },
        if std::env::var("JWT_SECRET").is_ok() { "✅" } else { "❌ (development default)" }
    );

    Ok(())
}
