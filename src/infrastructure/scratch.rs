use anyhow::Context;
use std::path::Path;
use tracing::info;

/// Creates the staging directory once at startup.
pub async fn setup_scratch_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create scratch directory {}", dir.display()))?;
    info!("📂 Scratch directory: {}", dir.display());
    Ok(())
}
