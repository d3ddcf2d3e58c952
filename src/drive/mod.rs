//! Resilient Google Drive Access
//!
//! # Architecture
//!
//! ```text
//! Tools ──► PathResolver ──► SelfHealing<DriveClient> ──► DriveClient ──► HttpDriveApi
//!             (exact,           (not-found →               (ReadCache +     (Drive v3
//!              then fuzzy)       RecoveryAdvised)           RetryPolicy)      REST)
//! ```
//!
//! Reads are memoized in bounded LRU caches and retried with exponential
//! backoff; mutations are sent once. Provider-native documents are exported
//! on download (documents and presentations to PDF, spreadsheets to xlsx).

pub mod api;
pub mod cache;
pub mod client;
pub mod query;
pub mod recovery;
pub mod resolver;
pub mod retry;
pub mod types;

pub use api::{DriveApi, HttpDriveApi};
pub use cache::{CacheStats, ReadCache};
pub use client::{CacheConfig, DriveClient, RemoteStore, DEFAULT_LIST_LIMIT};
pub use recovery::{NotFoundRecovery, SelfHealing};
pub use resolver::{PathResolver, ResolvedPath, ResolvedSegment};
pub use retry::RetryPolicy;
pub use types::{ContentKind, RemoteObject, UploadContent, ROOT_ID};
