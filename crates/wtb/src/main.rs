use std::sync::Arc;

use wtb_core::config::Config;
use wtb_tracker_http::HttpTracker;

#[tokio::main]
async fn main() -> Result<(), wtb_core::Error> {
    wtb_core::logging::init("wtb")?;

    let cfg = Arc::new(Config::load()?);

    let tracker = Arc::new(HttpTracker::new(
        cfg.tracker_api_url.clone(),
        cfg.tracker_api_token.clone(),
        cfg.tracker_timeout,
    )?);

    wtb_telegram::router::run_polling(cfg, tracker)
        .await
        .map_err(|e| wtb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
