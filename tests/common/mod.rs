#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use csv_drive_relay::config::AppConfig;
use csv_drive_relay::services::drive::{DriveError, RemoteFile, RemoteStore};
use csv_drive_relay::services::sync_service::SyncService;
use csv_drive_relay::services::upload_service::UploadService;
use csv_drive_relay::{AppState, create_app};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const FOLDER: &str = "test-folder";
pub const OTHER_FOLDER: &str = "other-folder";

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub parent: String,
    pub content: Bytes,
    pub mime_type: String,
}

/// Drive stand-in that keeps files in memory and records every call.
#[derive(Default)]
pub struct InMemoryDrive {
    files: Mutex<Vec<StoredFile>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_delete: AtomicBool,
    fail_create: AtomicBool,
    list_delay: Option<Duration>,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps after taking the list snapshot, widening the find/create race window.
    pub fn with_list_delay(delay: Duration) -> Self {
        Self {
            list_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed(&self, name: &str, parent: &str, content: &str) -> String {
        let id = self.allocate_id();
        self.files.lock().unwrap().push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.to_string(),
            content: Bytes::from(content.to_string()),
            mime_type: "text/csv".to_string(),
        });
        id
    }

    pub fn files_in(&self, parent: &str) -> Vec<StoredFile> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.parent == parent)
            .cloned()
            .collect()
    }

    pub fn named(&self, name: &str, parent: &str) -> Vec<StoredFile> {
        self.files_in(parent)
            .into_iter()
            .filter(|f| f.name == name)
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn fail_creates(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    fn allocate_id(&self) -> String {
        format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteStore for InMemoryDrive {
    fn display_name(&self) -> &'static str {
        "In-memory Drive"
    }

    async fn list(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFile>, DriveError> {
        self.record(format!("list {} {}", name, parent_id));
        let matches = self
            .named(name, parent_id)
            .into_iter()
            .map(|f| RemoteFile {
                id: f.id,
                name: f.name,
            })
            .collect();

        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(matches)
    }

    async fn delete(&self, file_id: &str) -> Result<(), DriveError> {
        self.record(format!("delete {}", file_id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DriveError::Api {
                operation: "delete",
                status: 403,
                message: "Insufficient permissions for this file".to_string(),
            });
        }

        let mut files = self.files.lock().unwrap();
        match files.iter().position(|f| f.id == file_id) {
            Some(index) => {
                files.remove(index);
                Ok(())
            }
            None => Err(DriveError::Api {
                operation: "delete",
                status: 404,
                message: format!("File not found: {}.", file_id),
            }),
        }
    }

    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        self.record(format!("create {} {}", name, parent_id));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DriveError::Api {
                operation: "create",
                status: 500,
                message: "Internal Error".to_string(),
            });
        }

        let id = self.allocate_id();
        self.files.lock().unwrap().push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            parent: parent_id.to_string(),
            content,
            mime_type: mime_type.to_string(),
        });
        Ok(id)
    }
}

pub struct TestApp {
    pub router: Router,
    pub drive: Arc<InMemoryDrive>,
    pub upload_service: Arc<UploadService>,
    pub scratch: TempDir,
}

impl TestApp {
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

pub fn setup_app(drive: InMemoryDrive) -> TestApp {
    setup_app_with(drive, |_| {})
}

pub fn setup_app_with(drive: InMemoryDrive, configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();

    let scratch = tempfile::tempdir().unwrap();
    let mut config = AppConfig::development(scratch.path());
    config.drive_folder_id = FOLDER.to_string();
    configure(&mut config);

    let drive = Arc::new(drive);
    let sync_service = Arc::new(SyncService::new(
        drive.clone(),
        config.drive_folder_id.clone(),
    ));
    let upload_service = Arc::new(UploadService::new(sync_service, &config));

    let state = AppState {
        upload_service: upload_service.clone(),
        config,
    };

    TestApp {
        router: create_app(state),
        drive,
        upload_service,
        scratch,
    }
}
