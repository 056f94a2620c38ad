pub mod rest;

use std::{fmt::Display, path::Path, time::Duration};

use anyhow::{anyhow, Result};
use greenlight_server::{
    config::{Parser, ServerConfig},
    run::{build_state, run_graceful_with_state},
};
use rand::Rng as _;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, error};
use url::Url;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let database_url = format!(
        "sqlite://{}",
        tmp_data_dir.path().join("greenlight.db").to_string_lossy()
    );
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "greenlight-e2e-tests",
        "--port",
        &port,
        "--database-url",
        &database_url,
        "--base-url",
        &base_url,
        "--env",
        "staging",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir)
}

/// Stops the spawned server when dropped.
pub struct ServerGuard {
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_server(args: ServerConfig) -> Result<ServerGuard> {
    let state = build_state(&args).await?;
    let health_url = args.base_url.join("v1/healthcheck")?;
    let (tx, rx) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = rx.await;
    };

    tokio::spawn(async move {
        if let Err(e) = run_graceful_with_state(args, state, shutdown).await {
            error!("Test server failed: {e}");
        }
    });
    let guard = ServerGuard { shutdown: Some(tx) };

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(guard),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start in time"))
}

pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, ServerGuard)> {
    let guard = spawn_server(args).await?;
    let client = reqwest::Client::builder().build()?;
    Ok((client, guard))
}

pub fn extend_url(url: &Url, segment: impl Display) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url")
        .push(&segment.to_string());
    url
}
