use greenlight_server::{config::ServerConfig, run::run, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = ServerConfig::load()?;
    run(args).await
}
