//! shopdesk server binary
//!
//! Usage: `shopdesk [config.yaml]`. Without an argument the file named by
//! `SHOPDESK_CONFIG` is used, if any; every setting can also come from the
//! environment (see `AppConfig::apply_overrides`).

use anyhow::Context;
use shopdesk::config::AppConfig;
use shopdesk::server::ServerBuilder;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopdesk=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("SHOPDESK_CONFIG").map(PathBuf::from));

    let config = AppConfig::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "loading configuration from the environment".to_string(),
    })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr(),
        backend = ?config.backend,
        "starting shopdesk"
    );

    ServerBuilder::new().with_config(config).serve().await
}
