//! API Server binary entrypoint.

use std::sync::Arc;

use api_server::{ApiServer, AppState, EmailClient, EmailConfig, ServerConfig};
use fulfillment_core::{FulfillmentConfig, Notifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_server=debug,fulfillment_core=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let fulfillment = FulfillmentConfig::from_env()?;

    // Purchase e-mails are optional; without a key fulfillment still succeeds
    let notifier: Option<Arc<dyn Notifier>> = match EmailConfig::from_env() {
        Some(email) => Some(Arc::new(EmailClient::new(email)?)),
        None => {
            tracing::warn!("RESEND_API_KEY not set, purchase e-mails are disabled");
            None
        }
    };

    if fulfillment.webhook_secret.is_none() {
        tracing::warn!(
            policy = ?fulfillment.unsigned_webhook_policy,
            "LEMON_SQUEEZY_WEBHOOK_SECRET not set, webhook signatures are not checked"
        );
    }

    let state = AppState::from_config(&fulfillment, notifier)?;
    tracing::info!(
        documents = %fulfillment.storage.documents_dir.display(),
        assets = %fulfillment.storage.assets_dir.display(),
        products = state.pipeline.catalog().len(),
        "Fulfillment pipeline ready"
    );

    // Create server config from environment
    let config = ServerConfig::from_env()?;

    // Create and run server
    ApiServer::new(config, state).run().await?;

    Ok(())
}
