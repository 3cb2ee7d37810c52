use std::sync::Arc;

use tgblast_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), tgblast_core::Error> {
    tgblast_core::logging::init("tgblast")?;

    let cfg = Arc::new(Config::load()?);

    tgblast_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| tgblast_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
