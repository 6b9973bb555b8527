use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod auth;
pub mod google_drive;

/// A file record as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive {operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Drive {operation} failed ({status}): {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("Drive authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected Drive response for {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            DriveError::Transport { .. } => "transport",
            DriveError::Api { status, .. } if *status == 401 || *status == 403 => "authorization",
            DriveError::Api { .. } => "provider",
            DriveError::Auth(_) => "credentials",
            DriveError::Decode { .. } => "decode",
            DriveError::Io(_) => "io",
        }
    }
}

/// The three storage operations the relay needs from a provider.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable provider name
    fn display_name(&self) -> &'static str;

    /// Non-trashed files named exactly `name` whose parent is `parent_id`
    async fn list(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFile>, DriveError>;

    /// Delete a file by id
    async fn delete(&self, file_id: &str) -> Result<(), DriveError>;

    /// Create a new file under `parent_id`, returning its id
    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, DriveError>;
}
