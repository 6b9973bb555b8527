use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::services::sync_service::SyncService;
use crate::utils::keyed_mutex::KeyedMutex;
use crate::utils::validation::{resolve_filename, validate_filename};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub filename: String,
    pub remote_id: String,
    pub size: usize,
}

/// Turns a raw request body into a replaced remote CSV.
pub struct UploadService {
    sync: Arc<SyncService>,
    scratch_dir: PathBuf,
    default_filename: String,
    locks: Option<KeyedMutex>,
}

impl UploadService {
    pub fn new(sync: Arc<SyncService>, config: &AppConfig) -> Self {
        Self {
            sync,
            scratch_dir: config.scratch_dir.clone(),
            default_filename: config.default_filename.clone(),
            locks: config.serialize_uploads.then(KeyedMutex::new),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn sync_service(&self) -> &SyncService {
        &self.sync
    }

    pub async fn handle_upload(
        &self,
        body: &[u8],
        filename_header: Option<&str>,
    ) -> Result<UploadOutcome, AppError> {
        let csv = std::str::from_utf8(body)?;
        let filename =
            validate_filename(resolve_filename(filename_header, &self.default_filename))?;

        info!("🔵 New upload request");
        info!("📂 Filename: {}", filename);
        info!("📏 CSV size: {} bytes", csv.len());

        // Removed from disk when dropped, whichever way this function exits.
        let staged = self.stage(csv).await?;
        info!("💾 CSV staged at {}", staged.display());

        let _guard = match &self.locks {
            Some(locks) => Some(locks.lock(filename).await),
            None => None,
        };

        let remote_id = self.sync.sync(filename, &staged).await?;
        info!("✅ '{}' uploaded with id {}", filename, remote_id);

        Ok(UploadOutcome {
            filename: filename.to_string(),
            remote_id,
            size: csv.len(),
        })
    }

    async fn stage(&self, csv: &str) -> Result<TempPath, AppError> {
        let path = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".csv")
            .tempfile_in(&self.scratch_dir)
            .map_err(AppError::Staging)?
            .into_temp_path();

        tokio::fs::write(&path, csv)
            .await
            .map_err(AppError::Staging)?;
        Ok(path)
    }
}
