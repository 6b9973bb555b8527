use crate::AppState;
use crate::api::error::AppError;
use crate::utils::validation::ValidationError;
use axum::{body::Bytes, extract::State, http::HeaderMap};

pub const FILENAME_HEADER: &str = "nombre-archivo";
pub const UPLOAD_OK_MESSAGE: &str = "Archivo recibido y subido a Drive.";

/// Reads the optional filename header, accepting UTF-8 beyond visible ASCII.
fn filename_header(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    match headers.get(FILENAME_HEADER) {
        None => Ok(None),
        Some(value) => std::str::from_utf8(value.as_bytes())
            .map(Some)
            .map_err(|_| {
                AppError::InvalidFilename(ValidationError {
                    code: "INVALID_FILENAME_ENCODING",
                    message: format!("'{}' header is not valid UTF-8", FILENAME_HEADER),
                })
            }),
    }
}

#[utoipa::path(
    post,
    path = "/upload_csv",
    request_body(content = String, description = "Raw CSV text", content_type = "text/csv"),
    params(
        ("nombre-archivo" = Option<String>, Header, description = "Target filename (default: archivo_emg.csv)")
    ),
    responses(
        (status = 200, description = "CSV stored in Drive, replacing any file of the same name", body = String),
        (status = 500, description = "Decode, staging or Drive failure", body = String)
    ),
    tag = "upload"
)]
pub async fn upload_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let filename = filename_header(&headers)?;
    state.upload_service.handle_upload(&body, filename).await?;
    Ok(UPLOAD_OK_MESSAGE)
}
