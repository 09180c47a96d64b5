use std::env;

use bookingBot::config::{AppConfig, LogFormat, LogSettings, RunMode, Settings};
use bookingBot::{cli, runtime};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LogSettings) {
    // RUST_LOG wins over LOG_LEVEL when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::from_config(&config)?;
    init_logging(&settings.logging);

    match settings.run_mode {
        RunMode::Api => runtime::run_api(settings).await,
        RunMode::Cli => cli::cli(settings).await,
    }
}
