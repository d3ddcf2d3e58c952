//! In-memory Drive backend for integration tests
//!
//! Understands the small query subset the crate emits (`name = '..'`,
//! `name contains '..'`, `'..' in parents`, `trashed = false`), counts every
//! wire call, and can fail the next N calls with a transient error.

#![allow(dead_code)]

use async_trait::async_trait;
use drive_forge::drive::types::{FilePage, NewObject, RemoteObject, FOLDER_MIME};
use drive_forge::drive::DriveApi;
use drive_forge::{DriveError, DriveResult};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

static NAME_EQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"name = '([^']*)'").unwrap());
static NAME_CONTAINS: Lazy<Regex> = Lazy::new(|| Regex::new(r"name contains '([^']*)'").unwrap());
static IN_PARENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)' in parents").unwrap());

struct Entry {
    object: RemoteObject,
    trashed: bool,
}

#[derive(Default)]
pub struct FakeDrive {
    entries: Mutex<Vec<Entry>>,
    content: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
    next_id: AtomicUsize,
    max_page: Mutex<Option<usize>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: &str) {
        self.add_file(id, name, FOLDER_MIME, parent, b"");
    }

    pub fn add_file(&self, id: &str, name: &str, mime_type: &str, parent: &str, content: &[u8]) {
        self.entries.lock().push(Entry {
            object: object(id, name, mime_type, parent),
            trashed: false,
        });
        self.content.lock().insert(id.to_string(), content.to_vec());
    }

    pub fn add_trashed(&self, id: &str, name: &str, parent: &str) {
        self.entries.lock().push(Entry {
            object: object(id, name, "text/plain", parent),
            trashed: true,
        });
    }

    /// Fail the next `n` wire calls with a transient error
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Cap how many results a single page may carry
    pub fn set_max_page(&self, size: usize) {
        *self.max_page.lock() = Some(size);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of wire calls whose label starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn is_trashed(&self, id: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.object.id == id && e.trashed)
    }

    pub fn stored(&self, id: &str) -> Option<Vec<u8>> {
        self.content.lock().get(id).cloned()
    }

    fn record(&self, call: String) -> DriveResult<()> {
        self.calls.lock().push(call);
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DriveError::transient("simulated 503"));
        }
        Ok(())
    }

    fn matches(entry: &Entry, query: &str) -> bool {
        if query.contains("trashed = false") && entry.trashed {
            return false;
        }
        let object = &entry.object;
        if let Some(caps) = NAME_EQ.captures(query) {
            if object.name != caps[1] {
                return false;
            }
        }
        if let Some(caps) = NAME_CONTAINS.captures(query) {
            if !object.name.to_lowercase().contains(&caps[1].to_lowercase()) {
                return false;
            }
        }
        if let Some(caps) = IN_PARENTS.captures(query) {
            if !object.parents.iter().any(|p| p == &caps[1]) {
                return false;
            }
        }
        true
    }
}

pub fn object(id: &str, name: &str, mime_type: &str, parent: &str) -> RemoteObject {
    RemoteObject {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        parents: vec![parent.to_string()],
        modified_time: None,
        size: None,
        web_view_link: None,
        export_links: Default::default(),
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_page(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> DriveResult<FilePage> {
        self.record(format!("list:{}", query))?;

        let matching: Vec<RemoteObject> = self
            .entries
            .lock()
            .iter()
            .filter(|e| Self::matches(e, query))
            .map(|e| e.object.clone())
            .collect();

        let size = match *self.max_page.lock() {
            Some(max) => (page_size as usize).min(max),
            None => page_size as usize,
        };
        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + size).min(matching.len());
        let next_page_token = if end < matching.len() {
            Some(end.to_string())
        } else {
            None
        };

        Ok(FilePage {
            files: matching[offset.min(end)..end].to_vec(),
            next_page_token,
        })
    }

    async fn get(&self, id: &str) -> DriveResult<RemoteObject> {
        self.record(format!("get:{}", id))?;
        self.entries
            .lock()
            .iter()
            .find(|e| e.object.id == id)
            .map(|e| e.object.clone())
            .ok_or_else(|| DriveError::not_found(format!("File not found: {}", id)))
    }

    async fn fetch_media(&self, id: &str, export_mime: Option<&str>) -> DriveResult<Vec<u8>> {
        self.record(format!("media:{}:{}", id, export_mime.unwrap_or("-")))?;
        self.content
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| DriveError::not_found(format!("File not found: {}", id)))
    }

    async fn create(
        &self,
        object: &NewObject,
        media: Option<(Vec<u8>, String)>,
    ) -> DriveResult<RemoteObject> {
        self.record(format!("create:{}", object.name))?;

        let parent = object.parents.first().cloned().unwrap_or_else(|| "root".to_string());
        if parent != "root" && !self.entries.lock().iter().any(|e| e.object.id == parent) {
            return Err(DriveError::not_found(format!("File not found: {}", parent)));
        }

        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let (bytes, mime_type) = match media {
            Some((bytes, mime)) => (bytes, mime),
            None => (
                Vec::new(),
                object.mime_type.clone().unwrap_or_else(|| FOLDER_MIME.to_string()),
            ),
        };
        self.add_file(&id, &object.name, &mime_type, &parent, &bytes);
        Ok(self::object(&id, &object.name, &mime_type, &parent))
    }

    async fn update(&self, id: &str, patch: serde_json::Value) -> DriveResult<RemoteObject> {
        self.record(format!("update:{}", id))?;
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.object.id == id)
            .ok_or_else(|| DriveError::not_found(format!("File not found: {}", id)))?;
        if patch["trashed"].as_bool() == Some(true) {
            entry.trashed = true;
        }
        Ok(entry.object.clone())
    }
}
