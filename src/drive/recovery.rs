//! Self-Healing Wrapper
//!
//! Turns provider "not found" failures on identifier-taking operations into
//! [`DriveError::RecoveryAdvised`], after recording a failed recovery event.
//! The wrapper only signals that recovery is possible; walking names to find
//! the object again is [`super::resolver::PathResolver`]'s job.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::client::RemoteStore;
use super::types::{RemoteObject, UploadContent};
use crate::audit::AuditSink;
use crate::error::{DriveError, DriveResult, SEARCH_GUIDANCE};

/// Placeholder recorded as the recovered name of a dead identifier
pub const NEEDS_SEARCH: &str = "Unknown (Need Search)";

/// Not-found interception policy
#[derive(Clone)]
pub struct NotFoundRecovery {
    audit: Arc<dyn AuditSink>,
}

impl NotFoundRecovery {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Pass `result` through, rewriting a not-found failure for `id`
    pub fn intercept<T>(&self, id: &str, result: DriveResult<T>) -> DriveResult<T> {
        match result {
            Err(DriveError::NotFound { .. }) => {
                self.audit.record_recovery(id, NEEDS_SEARCH, false);
                info!("Self-healing: File ID '{}' not found. Suggesting search recovery.", id);
                Err(DriveError::RecoveryAdvised {
                    id: id.to_string(),
                    guidance: SEARCH_GUIDANCE.to_string(),
                })
            }
            other => other,
        }
    }
}

/// A [`RemoteStore`] whose identifier-taking operations go through
/// [`NotFoundRecovery`]
pub struct SelfHealing<S> {
    inner: S,
    policy: NotFoundRecovery,
}

impl<S: RemoteStore> SelfHealing<S> {
    pub fn new(inner: S, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            inner,
            policy: NotFoundRecovery::new(audit),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for SelfHealing<S> {
    async fn list(&self, query: Option<&str>, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        self.inner.list(query, limit).await
    }

    async fn get_metadata(&self, id: &str) -> DriveResult<RemoteObject> {
        self.policy.intercept(id, self.inner.get_metadata(id).await)
    }

    async fn download(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>> {
        self.policy
            .intercept(id, self.inner.download(id, export_mime).await)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> DriveResult<RemoteObject> {
        self.policy
            .intercept(parent_id, self.inner.create_folder(name, parent_id).await)
    }

    async fn upload(
        &self,
        name: &str,
        content: UploadContent,
        parent_id: &str,
        mime_type: &str,
    ) -> DriveResult<RemoteObject> {
        let result = self.inner.upload(name, content, parent_id, mime_type).await;
        self.policy.intercept(parent_id, result)
    }

    async fn trash(&self, id: &str) -> DriveResult<RemoteObject> {
        self.policy.intercept(id, self.inner.trash(id).await)
    }

    async fn list_children(&self, folder_id: &str, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        self.policy
            .intercept(folder_id, self.inner.list_children(folder_id, limit).await)
    }

    async fn search(&self, text: &str, limit: usize) -> DriveResult<Vec<RemoteObject>> {
        self.inner.search(text, limit).await
    }
}
