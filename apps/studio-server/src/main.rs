use clap::Parser;
use project::ProjectDb;
use studio_server::{config::DEFAULT_LOG_FILTER, router, AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| {
        eprintln!("invalid log filter {:?}, using default", config.log_filter);
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting studio server...");

    let db_path = config.database_path();
    let db = ProjectDb::open_or_create(&db_path)?;
    info!("Storage initialized at: {}", db_path.display());

    let purged = db.purge_expired_sessions()?;
    if purged > 0 {
        info!(purged, "removed expired sessions");
    }

    if let Some((username, password)) = config.admin_credentials() {
        if db.find_user(username)?.is_none() {
            db.create_user(username, password)?;
            info!(username, "bootstrap account created");
        }
    } else if db.user_count()? == 0 {
        warn!("no user accounts exist; create one with `branchline create-user` or --admin-user");
    }

    let app = router(AppState::new(db, &config));

    info!("Studio server listening on http://{}", config.bind);
    info!("API endpoints:");
    info!("  POST   /api/login            - Start a session");
    info!("  POST   /api/logout           - End the session");
    info!("  GET    /api/projects         - List projects");
    info!("  POST   /api/projects         - Create project");
    info!("  GET    /api/projects/:id     - Load project");
    info!("  PUT    /api/projects/:id     - Save project");
    info!("  PATCH  /api/projects/:id     - Rename project");
    info!("  DELETE /api/projects/:id     - Delete project");
    info!("  GET    /api/embed/:id        - Public player feed");

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
