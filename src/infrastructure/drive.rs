use crate::config::AppConfig;
use crate::services::drive::RemoteStore;
use crate::services::drive::auth::{
    ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource, TokenSource,
};
use crate::services::drive::google_drive::GoogleDriveClient;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Builds the long-lived Drive client shared by every request.
pub async fn setup_drive(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteStore>> {
    let http = reqwest::Client::builder()
        .timeout(config.drive_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let tokens: Arc<dyn TokenSource> = match &config.access_token {
        Some(token) => {
            info!("🔑 Using pre-issued access token from GOOGLE_ACCESS_TOKEN");
            Arc::new(StaticTokenSource::new(token.clone()))
        }
        None => {
            let key = ServiceAccountKey::load(&config.credentials)
                .await
                .with_context(|| {
                    format!("failed to load credentials from {}", config.credentials.describe())
                })?;
            let source = ServiceAccountTokenSource::new(http.clone(), key)
                .context("failed to prepare service account signer")?;
            info!(
                "🔑 Service account {} ({})",
                source.client_email(),
                config.credentials.describe()
            );
            Arc::new(source)
        }
    };

    info!(
        "☁️  Google Drive: {} (Folder: {})",
        config.drive_api_base, config.drive_folder_id
    );

    let client = GoogleDriveClient::with_base_url(http, tokens, config.drive_api_base.clone())
        .with_timeout(config.drive_timeout);
    Ok(Arc::new(client))
}
