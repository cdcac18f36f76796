use std::sync::Arc;

use prompt_console::api::{ApiState, handler};
use prompt_console::core::config::AppConfig;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    prompt_console::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        lambda_runtime::Error::from(e.to_string())
    })?;
    let state = Arc::new(ApiState::from_config(&config).await.map_err(|e| {
        error!("Startup error: {}", e);
        lambda_runtime::Error::from(e.to_string())
    })?);

    lambda_runtime::run(lambda_runtime::service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(&state, event).await }
    }))
    .await
}
