use crate::config::ServerConfig;
use crate::error::Result;
use axum::Router;
use futures::FutureExt;
use greenlight_app::state::{AppConfig, AppState};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        "Starting {} server on {}",
        args.env,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn main_router(state: AppState) -> Router<()> {
    Router::new()
        .nest("/v1", greenlight_app::api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let app_config: AppConfig = config.into();

    let pool =
        greenlight_dal::new_pool_with(&config.database_url, &config.pool_settings()).await?;
    info!("Database connection pool established");
    greenlight_dal::migrate(&pool).await?;
    debug!("Database migrations applied");

    Ok(AppState::new(app_config, pool))
}
