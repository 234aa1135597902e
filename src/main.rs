use std::sync::Arc;
use log::{error, info};
use genbridge::config::{AppConfig, Credentials};
use genbridge::error::Error;
use genbridge::GenerativeAi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{   env_logger::init();

    let config = AppConfig::from_env()?;
    let credentials: Credentials = config.credentials.clone()
      .ok_or_else(|| {
        Error::InvalidConfiguration("missing backend credentials".to_string())
      })?;

    let service = GenerativeAi::from_config(config.genai.clone(), credentials)
      .map_err(|e| {
        error!("Cannot create backend client: {}", e);
        e
      })?;

    info!("Starting genbridge");
    genbridge::server::serve(Arc::new(service), config.server).await?;
    Ok(())
}
