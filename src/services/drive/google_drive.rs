//! Google Drive v3 REST client.
//!
//! Implements [`RemoteStore`] with three endpoints: `files.list` (filtered by
//! name, parent folder and trash state), `files.delete` and a
//! `multipart/related` `files.create` upload.

use super::auth::TokenSource;
use super::{DriveError, RemoteFile, RemoteStore};
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Characters escaped when a file id is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const LIST_FIELDS: &str = "nextPageToken, files(id, name)";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct GoogleDriveClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl GoogleDriveClient {
    /// `base_url` is the API host, `https://www.googleapis.com` in production.
    pub fn with_base_url(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DriveError> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .timeout(self.timeout))
    }

    async fn send(
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<Response, DriveError> {
        let response = builder
            .send()
            .await
            .map_err(|source| DriveError::Transport { operation, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        Err(DriveError::Api {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

/// Escapes a literal for use inside single quotes in a Drive `q` expression.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn build_list_query(name: &str, parent_id: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_literal(name),
        escape_query_literal(parent_id)
    )
}

/// Assembles a `multipart/related` upload body: JSON metadata, then the media.
pub fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content: &[u8],
    mime_type: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[async_trait]
impl RemoteStore for GoogleDriveClient {
    fn display_name(&self) -> &'static str {
        "Google Drive"
    }

    async fn list(&self, name: &str, parent_id: &str) -> Result<Vec<RemoteFile>, DriveError> {
        let query = build_list_query(name, parent_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("fields", LIST_FIELDS.to_string()),
                ("spaces", "drive".to_string()),
                ("supportsAllDrives", "true".to_string()),
                ("includeItemsFromAllDrives", "true".to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let builder = self
                .request(Method::GET, "/drive/v3/files")
                .await?
                .query(&params);
            let page: FileList = Self::send("list", builder)
                .await?
                .json()
                .await
                .map_err(|e| DriveError::Decode {
                    operation: "list",
                    message: e.to_string(),
                })?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Drive list '{}' in {}: {} match(es)", name, parent_id, files.len());
        Ok(files)
    }

    async fn delete(&self, file_id: &str) -> Result<(), DriveError> {
        let path = format!(
            "/drive/v3/files/{}",
            utf8_percent_encode(file_id, PATH_SEGMENT)
        );
        let builder = self
            .request(Method::DELETE, &path)
            .await?
            .query(&[("supportsAllDrives", "true")]);
        Self::send("delete", builder).await?;

        tracing::debug!("Drive deleted {}", file_id);
        Ok(())
    }

    async fn create(
        &self,
        name: &str,
        parent_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        let boundary = format!("relay-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({
            "name": name,
            "parents": [parent_id],
            "mimeType": mime_type,
        });
        let body = multipart_related_body(&boundary, &metadata, &content, mime_type);

        let builder = self
            .request(Method::POST, "/upload/drive/v3/files")
            .await?
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let created: CreatedFile = Self::send("create", builder)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Decode {
                operation: "create",
                message: e.to_string(),
            })?;

        tracing::debug!("Drive created '{}' as {}", name, created.id);
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_escapes_quotes_and_backslashes() {
        assert_eq!(escape_query_literal("plain.csv"), "plain.csv");
        assert_eq!(escape_query_literal("o'brien.csv"), "o\\'brien.csv");
        assert_eq!(escape_query_literal("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_list_query_scopes_by_parent() {
        assert_eq!(
            build_list_query("test.csv", "folder-1"),
            "name = 'test.csv' and 'folder-1' in parents and trashed = false"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let metadata = json!({"name": "a.csv"});
        let body = multipart_related_body("XYZ", &metadata, b"a,b\n1,2\n", "text/csv");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--XYZ\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n"));
        assert!(text.contains(r#"{"name":"a.csv"}"#));
        assert!(text.contains("--XYZ\r\nContent-Type: text/csv\r\n\r\na,b\n1,2\n\r\n--XYZ--\r\n"));
    }

    #[test]
    fn test_file_id_path_encoding_keeps_drive_ids_intact() {
        let encoded = utf8_percent_encode("1AbC-_xyz", PATH_SEGMENT).to_string();
        assert_eq!(encoded, "1AbC-_xyz");
        let encoded = utf8_percent_encode("../x", PATH_SEGMENT).to_string();
        assert_eq!(encoded, "..%2Fx");
    }
}
