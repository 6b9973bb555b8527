use crate::services::drive::{DriveError, RemoteStore};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const CSV_MIME_TYPE: &str = "text/csv";

/// Replaces a named file in one remote folder: find, delete every match, create.
///
/// The three steps are not transactional. If `create` fails after the deletes
/// went through, the folder holds no file of that name until the next upload.
pub struct SyncService {
    store: Arc<dyn RemoteStore>,
    folder_id: String,
}

impl SyncService {
    pub fn new(store: Arc<dyn RemoteStore>, folder_id: impl Into<String>) -> Self {
        Self {
            store,
            folder_id: folder_id.into(),
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Uploads the file at `local_path` as `name`, returning the new remote id.
    pub async fn sync(&self, name: &str, local_path: &Path) -> Result<String, DriveError> {
        let content = Bytes::from(tokio::fs::read(local_path).await?);
        self.replace(name, content).await
    }

    pub async fn replace(&self, name: &str, content: Bytes) -> Result<String, DriveError> {
        let existing = self.store.list(name, &self.folder_id).await?;

        for file in &existing {
            info!("🗑️  Removing previous '{}' ({})", file.name, file.id);
            self.store.delete(&file.id).await?;
        }

        let id = self
            .store
            .create(name, &self.folder_id, content, CSV_MIME_TYPE)
            .await?;

        info!(
            "☁️  Uploaded '{}' to {} as {} (replaced {})",
            name,
            self.store.display_name(),
            id,
            existing.len()
        );
        Ok(id)
    }
}
