use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use guestbook_api::{router, AppStateInner};

/// Default log filter. The bare `guestbook` directive prefix-matches the
/// binary's own target as well as every `guestbook_*` crate.
const DEFAULT_LOG_FILTER: &str = "guestbook=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    // Config
    let db_path = std::env::var("GUESTBOOK_DB_PATH").unwrap_or_else(|_| "guestbook.db".into());
    let host = std::env::var("GUESTBOOK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GUESTBOOK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // The OAuth exchange runs in the login front end; the server just
    // flags missing provider config early instead of at first sign-in.
    for var in ["GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"] {
        if std::env::var(var).is_err() {
            warn!("{} not set, GitHub sign-in will not work", var);
        }
    }

    // Init database
    let db = guestbook_db::Database::open(&PathBuf::from(&db_path))?;
    let purged = db.purge_expired_sessions()?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    // Shared state
    let state = Arc::new(AppStateInner { db });

    // Routes
    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Guestbook server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
