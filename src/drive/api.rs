//! Drive REST Transport
//!
//! Raw Drive v3 calls, one round trip each. Caching, retry and export
//! selection live in [`super::client::DriveClient`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::types::{FilePage, NewObject, RemoteObject};
use crate::auth::TokenProvider;
use crate::error::{DriveError, DriveResult};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Fields requested for listings
pub const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, parents, modifiedTime, webViewLink, size)";

/// Fields requested for single-object metadata
pub const METADATA_FIELDS: &str =
    "id, name, mimeType, parents, modifiedTime, webViewLink, size, exportLinks";

/// Fields returned by create/update
pub const MUTATION_FIELDS: &str = "id, name, mimeType, parents, webViewLink";

/// Upper bound on buffer space reserved from a `Content-Length` header
pub const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

/// Wire-level Drive operations
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// `files.list`
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> DriveResult<FilePage>;

    /// `files.get` (metadata)
    async fn get(&self, id: &str) -> DriveResult<RemoteObject>;

    /// `files.get?alt=media`, or `files.export` when `export_mime` is set
    async fn fetch_media(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>>;

    /// `files.create`, multipart when `media` is present
    async fn create(
        &self,
        object: &NewObject,
        media: Option<(Vec<u8>, String)>,
    ) -> DriveResult<RemoteObject>;

    /// `files.update` with a JSON patch body
    async fn update(&self, id: &str, patch: serde_json::Value) -> DriveResult<RemoteObject>;
}

/// Drive v3 over HTTPS
#[derive(Clone)]
pub struct HttpDriveApi {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpDriveApi {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_base_url(tokens, DEFAULT_API_BASE)
    }

    pub fn with_base_url(tokens: Arc<dyn TokenProvider>, base_url: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base_url)
    }

    /// `files/{id}[/{action}]` with the id pushed as one encoded segment
    fn file_url(&self, id: &str, action: Option<&str>) -> DriveResult<Url> {
        let mut url =
            Url::parse(&self.files_url()).map_err(|e| DriveError::InvalidUrl(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| DriveError::InvalidUrl(self.base_url.clone()))?;
            segments.push(id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> DriveResult<Response> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("Drive API {} body: {}", status, body);
        Err(DriveError::from_status(status.as_u16(), &body))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> DriveResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DriveApi for HttpDriveApi {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> DriveResult<FilePage> {
        let page_size = page_size.to_string();
        let mut params = vec![
            ("q", query),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        self.send_json(self.client.get(self.files_url()).query(&params))
            .await
    }

    async fn get(&self, id: &str) -> DriveResult<RemoteObject> {
        self.send_json(
            self.client
                .get(self.file_url(id, None)?)
                .query(&[("fields", METADATA_FIELDS)]),
        )
        .await
    }

    async fn fetch_media(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>> {
        let request = match export_mime {
            Some(mime) => self
                .client
                .get(self.file_url(id, Some("export"))?)
                .query(&[("mimeType", mime)]),
            None => self
                .client
                .get(self.file_url(id, None)?)
                .query(&[("alt", "media")]),
        };

        let response = self.send(request).await?;
        let mut buffer = Vec::with_capacity(initial_capacity(response.content_length()));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }

        debug!("Downloaded {} bytes for {}", buffer.len(), id);
        Ok(buffer)
    }

    async fn create(
        &self,
        object: &NewObject,
        media: Option<(Vec<u8>, String)>,
    ) -> DriveResult<RemoteObject> {
        let request = match media {
            None => self
                .client
                .post(self.files_url())
                .query(&[("fields", MUTATION_FIELDS)])
                .json(object),
            Some((bytes, mime_type)) => {
                let boundary = format!("drive-forge-{}", uuid::Uuid::new_v4().simple());
                let metadata = serde_json::to_vec(object)
                    .map_err(|e| DriveError::Decode(e.to_string()))?;
                let body = multipart_related(&boundary, &metadata, &bytes, &mime_type);

                self.client
                    .post(format!("{}/upload/drive/v3/files", self.base_url))
                    .query(&[("uploadType", "multipart"), ("fields", MUTATION_FIELDS)])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body)
            }
        };

        self.send_json(request).await
    }

    async fn update(&self, id: &str, patch: serde_json::Value) -> DriveResult<RemoteObject> {
        self.send_json(
            self.client
                .patch(self.file_url(id, None)?)
                .query(&[("fields", MUTATION_FIELDS)])
                .json(&patch),
        )
        .await
    }
}

/// Body for a `multipart/related` upload: JSON metadata part, then media part
fn multipart_related(boundary: &str, metadata: &[u8], media: &[u8], mime_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Reserve what the server announced, capped at [`MAX_PREALLOC`]
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOC) as usize
}

/// Patch body moving an object to the trash
pub fn trash_patch() -> serde_json::Value {
    json!({ "trashed": true })
}
