//! Path Resolver
//!
//! Walks a human path (`/Projects/2026/Budget`) one segment at a time from
//! the drive root. Each segment is matched exactly first; on a miss the
//! parent's children are scanned for a unique case-insensitive substring
//! match ("healing"). Ambiguity is never broken by picking a candidate: zero
//! or several candidates end the walk unresolved.
//!
//! The walk is strictly sequential, since every segment is looked up under
//! the previous segment's (possibly healed) parent.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::client::{RemoteStore, MAX_PAGE_SIZE};
use super::query;
use super::types::{RemoteObject, ROOT_ID};
use crate::audit::{AuditSink, EventKind, EventStatus};
use crate::error::DriveResult;

/// One resolved segment
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    /// Segment as requested
    pub requested: String,
    /// Name actually found (differs from `requested` when healed)
    pub name: String,
    pub id: String,
    pub healed: bool,
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub segments: Vec<ResolvedSegment>,
    /// Identifier of the last segment (the root for an empty path)
    pub id: String,
}

impl ResolvedPath {
    /// Path rebuilt from the names actually found
    pub fn healed_path(&self) -> String {
        let names: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        format!("/{}", names.join("/"))
    }

    pub fn was_healed(&self) -> bool {
        self.segments.iter().any(|s| s.healed)
    }
}

enum SegmentMatch {
    Exact(RemoteObject),
    Healed(RemoteObject),
    Unresolved(Vec<RemoteObject>),
}

/// Path-to-identifier resolver with fuzzy healing
pub struct PathResolver {
    store: Arc<dyn RemoteStore>,
    audit: Arc<dyn AuditSink>,
    root_id: String,
    scan_limit: usize,
}

impl PathResolver {
    pub fn new(store: Arc<dyn RemoteStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            root_id: ROOT_ID.to_string(),
            scan_limit: MAX_PAGE_SIZE,
        }
    }

    /// Start walks somewhere other than the drive root
    pub fn with_root(mut self, root_id: &str) -> Self {
        self.root_id = root_id.to_string();
        self
    }

    /// Cap on children scanned when healing a segment
    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit.max(1);
        self
    }

    /// Resolve `path`. `Ok(None)` means a segment was missing or ambiguous
    /// (already audited); `Err` is reserved for remote failures.
    pub async fn resolve(&self, path: &str) -> DriveResult<Option<ResolvedPath>> {
        let mut parent = self.root_id.clone();
        let mut segments = Vec::new();

        for part in path.split('/').filter(|p| !p.is_empty()) {
            match self.match_segment(part, &parent).await? {
                SegmentMatch::Exact(found) => {
                    debug!("Resolved '{}' -> {}", part, found.id);
                    segments.push(ResolvedSegment {
                        requested: part.to_string(),
                        name: found.name,
                        id: found.id.clone(),
                        healed: false,
                    });
                    parent = found.id;
                }
                SegmentMatch::Healed(found) => {
                    info!(
                        "Active Healing: Resolved '{}' -> '{}' in folder {}",
                        part, found.name, parent
                    );
                    self.audit.record_event(
                        EventKind::Recovery,
                        &format!(
                            "Target ID: {} -> Found: {} (in folder {})",
                            part, found.name, parent
                        ),
                        EventStatus::Success,
                    );
                    segments.push(ResolvedSegment {
                        requested: part.to_string(),
                        name: found.name,
                        id: found.id.clone(),
                        healed: true,
                    });
                    parent = found.id;
                }
                SegmentMatch::Unresolved(candidates) => {
                    let suggestions: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                    warn!(
                        "Path break at '{}' in folder {}. Suggestions: {:?}",
                        part, parent, suggestions
                    );
                    self.audit.record_event(
                        EventKind::Recovery,
                        &format!(
                            "Target ID: {} -> Found: Ambiguous/Not Found (in folder {}; candidates: {:?})",
                            part, parent, suggestions
                        ),
                        EventStatus::Failure,
                    );
                    return Ok(None);
                }
            }
        }

        Ok(Some(ResolvedPath { segments, id: parent }))
    }

    /// Identifier for `path`, if it resolves
    pub async fn resolve_id(&self, path: &str) -> DriveResult<Option<String>> {
        Ok(self.resolve(path).await?.map(|resolved| resolved.id))
    }

    async fn match_segment(&self, part: &str, parent: &str) -> DriveResult<SegmentMatch> {
        let exact = self
            .store
            .list(Some(&query::named_in_parent(part, parent)), 0)
            .await?;
        if let Some(found) = exact.into_iter().next() {
            return Ok(SegmentMatch::Exact(found));
        }

        let children = self.store.list_children(parent, self.scan_limit).await?;
        let needle = part.to_lowercase();
        let mut candidates: Vec<RemoteObject> = children
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();

        if candidates.len() == 1 {
            return Ok(SegmentMatch::Healed(candidates.remove(0)));
        }

        // Report the ambiguous set when there is one, otherwise everything
        // the folder holds, so the operator sees what was there.
        let suggestions = if candidates.is_empty() { children } else { candidates };
        Ok(SegmentMatch::Unresolved(suggestions))
    }
}
