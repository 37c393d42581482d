use std::sync::Arc;

use imgbot_core::config::Config;
use imgbot_fal::{FalClient, FalConfig, HttpImageFetcher};

#[tokio::main]
async fn main() -> Result<(), imgbot_core::Error> {
    imgbot_core::logging::init("imgbot")?;

    let cfg = Arc::new(Config::load()?);

    let generator = Arc::new(FalClient::new(FalConfig::from_config(&cfg))?);
    let fetcher = Arc::new(HttpImageFetcher::new(cfg.download_timeout)?);

    imgbot_telegram::router::run_polling(cfg, generator, fetcher)
        .await
        .map_err(|e| imgbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
