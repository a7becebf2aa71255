use std::sync::Arc;

use avio_core::{config::Config, directory::MemoryDirectory, directory::UserDirectory};
use avio_pg::PgDirectory;

#[tokio::main]
async fn main() -> Result<(), avio_core::Error> {
    avio_core::logging::init("avio");

    let cfg = Arc::new(Config::load()?);

    let directory: Arc<dyn UserDirectory> = match &cfg.database_url {
        Some(url) => Arc::new(PgDirectory::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory user directory");
            Arc::new(MemoryDirectory::new())
        }
    };

    avio_telegram::router::run_polling(cfg, directory)
        .await
        .map_err(|e| avio_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
