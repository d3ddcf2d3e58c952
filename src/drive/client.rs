//! Drive Client
//!
//! The baseline remote-store capability. Reads (`list`, `get_metadata`) are
//! retried and memoized; mutations go out exactly once, since create calls
//! are not idempotent on the remote side.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::api::{trash_patch, DriveApi};
use super::cache::{CacheStats, ReadCache};
use super::query;
use super::retry::RetryPolicy;
use super::types::{NewObject, RemoteObject, UploadContent, FOLDER_MIME, ROOT_ID};
use crate::error::DriveResult;

/// Default number of objects returned by a listing
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Largest page the service will return
pub const MAX_PAGE_SIZE: usize = 1000;

/// Remote-store operations, as seen by resolvers, wrappers and tools
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Objects matching `query` (trashed objects always excluded).
    /// `limit == 0` selects [`DEFAULT_LIST_LIMIT`].
    async fn list(&self, query: Option<&str>, limit: usize) -> DriveResult<Vec<RemoteObject>>;

    /// Full metadata, including export links
    async fn get_metadata(&self, id: &str) -> DriveResult<RemoteObject>;

    /// Content bytes; provider-native documents are exported
    async fn download(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>>;

    async fn create_folder(&self, name: &str, parent_id: &str) -> DriveResult<RemoteObject>;

    async fn upload(
        &self,
        name: &str,
        content: UploadContent,
        parent_id: &str,
        mime_type: &str,
    ) -> DriveResult<RemoteObject>;

    /// Move to trash (recoverable remote-side)
    async fn trash(&self, id: &str) -> DriveResult<RemoteObject>;

    async fn list_children(&self, folder_id: &str, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        self.list(Some(&query::in_parent(folder_id)), limit).await
    }

    async fn search(&self, text: &str, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        self.list(Some(&query::name_contains(text)), limit).await
    }
}

/// Cache sizing for [`DriveClient`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub list_capacity: u64,
    pub metadata_capacity: u64,
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_capacity: 128,
            metadata_capacity: 256,
            ttl: None,
        }
    }
}

/// Caching, retrying Drive client
#[derive(Clone)]
pub struct DriveClient {
    api: Arc<dyn DriveApi>,
    retry: RetryPolicy,
    listings: ReadCache<(String, usize), Arc<Vec<RemoteObject>>>,
    metadata: ReadCache<String, Arc<RemoteObject>>,
}

impl DriveClient {
    pub fn new(api: Arc<dyn DriveApi>) -> Self {
        Self::with_policies(api, RetryPolicy::default(), CacheConfig::default())
    }

    pub fn with_policies(api: Arc<dyn DriveApi>, retry: RetryPolicy, cache: CacheConfig) -> Self {
        Self {
            api,
            retry,
            listings: ReadCache::new("drive-listings", cache.list_capacity, cache.ttl),
            metadata: ReadCache::new("drive-metadata", cache.metadata_capacity, cache.ttl),
        }
    }

    pub fn list_cache_stats(&self) -> CacheStats {
        self.listings.stats()
    }

    pub fn metadata_cache_stats(&self) -> CacheStats {
        self.metadata.stats()
    }

    /// Forget every memoized read
    pub fn clear_cache(&self) {
        self.listings.clear();
        self.metadata.clear();
    }

    /// Walk pages until `limit` objects are collected or the listing ends
    async fn fetch_listing(&self, q: &str, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = (limit - files.len()).min(MAX_PAGE_SIZE) as u32;
            let token = page_token.clone();
            let page = self
                .retry
                .run("files.list", || self.api.list_page(q, page_size, token.as_deref()))
                .await
                .inspect_err(|e| error!("An error occurred listing '{}': {}", q, e))?;

            files.extend(page.files);
            page_token = page.next_page_token;

            if files.len() >= limit || page_token.is_none() {
                break;
            }
        }

        files.truncate(limit);
        Ok(files)
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list(&self, query: Option<&str>, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        let q = query::exclude_trashed(query);

        let files = self
            .listings
            .get_or_fetch((q.clone(), limit), async {
                self.fetch_listing(&q, limit).await.map(Arc::new)
            })
            .await?;

        Ok(files.as_ref().clone())
    }

    async fn get_metadata(&self, id: &str) -> DriveResult<RemoteObject> {
        let object = self
            .metadata
            .get_or_fetch(id.to_string(), async {
                self.retry
                    .run("files.get", || self.api.get(id))
                    .await
                    .map(Arc::new)
            })
            .await?;

        Ok(object.as_ref().clone())
    }

    async fn download(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>> {
        let meta = self.get_metadata(id).await?;
        let kind = meta.kind();

        let target = if kind.is_exportable() {
            export_mime.or(kind.default_export())
        } else {
            None
        };
        debug!("Downloading {} ({:?}) as {:?}", id, kind, target);

        self.retry
            .run("files.media", || self.api.fetch_media(id, target))
            .await
            .inspect_err(|e| error!("Error downloading file {}: {}", id, e))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> DriveResult<RemoteObject> {
        let folder = NewObject {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME.to_string()),
            parents: vec![parent_or_root(parent_id)],
        };
        let created = self.api.create(&folder, None).await?;
        info!("Created folder '{}' ({})", created.name, created.id);
        Ok(created)
    }

    async fn upload(
        &self,
        name: &str,
        content: UploadContent,
        parent_id: &str,
        mime_type: &str,
    ) -> DriveResult<RemoteObject> {
        let file = NewObject {
            name: name.to_string(),
            mime_type: None,
            parents: vec![parent_or_root(parent_id)],
        };
        let size = content.len();
        let created = self
            .api
            .create(&file, Some((content.into_bytes(), mime_type.to_string())))
            .await?;
        info!("Uploaded '{}' ({} bytes) as {}", created.name, size, created.id);
        Ok(created)
    }

    async fn trash(&self, id: &str) -> DriveResult<RemoteObject> {
        let trashed = self.api.update(id, trash_patch()).await?;
        info!("Trashed {}", id);
        Ok(trashed)
    }
}

fn parent_or_root(parent_id: &str) -> String {
    if parent_id.trim().is_empty() {
        ROOT_ID.to_string()
    } else {
        parent_id.to_string()
    }
}
