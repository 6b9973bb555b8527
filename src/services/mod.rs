pub mod drive;
pub mod sync_service;
pub mod upload_service;
