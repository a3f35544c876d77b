use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use xray_report::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("cannot start without a Gemini API key")?;

    let gateway = GeminiGateway::with_config(config.gemini.clone())?;

    if config.skip_credential_check {
        warn!("Skipping Gemini credential check");
    } else {
        gateway
            .verify_credentials(&config.model)
            .await
            .context("Gemini credential check failed")?;
        info!(model = %config.model, "Gemini credentials verified");
    }

    let broker = LlmBroker::new(config.model.clone(), Arc::new(gateway));
    let analyzer = LlmAnalyzer::new(broker, CompletionConfig::sarcoma_report());
    let session = Session::new(Arc::new(analyzer), ReportRenderer::new());

    xray_report::shell::serve(config.bind, session).await?;

    Ok(())
}
