use anyhow::Result;
use log::info;
use ufw_bridge::core::config::Config;
use ufw_bridge::services::rest::RestService;

const DEFAULT_CONFIG_PATH: &str = "/etc/ufw-bridge/config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("UFW_BRIDGE_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::from_file(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    info!("ufw-bridge starting, config loaded from {}", config_path);

    let rest_service = RestService::new(config);
    rest_service.run().await
}
