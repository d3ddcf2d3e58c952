//! Drive Forge MCP Server
//!
//! Model Context Protocol server that gives an agent resilient access to
//! Google Drive and a library of self-authored skills.
//!
//! # Features
//!
//! - **MCP Protocol**: JSON-RPC 2.0 over stdio
//! - **Resilient Drive Access**: bounded LRU read caches and exponential backoff
//! - **Self-Healing**: not-found interception and near-miss path repair
//! - **Skill Forge**: create, discover, update and run scripts at runtime
//! - **Audit Trail**: every recovery and forge event appended to a log file
//!
//! # Architecture
//!
//! ```text
//! Agent ──► MCP Protocol ──► ToolRegistry ──► PathResolver ──► SelfHealing<DriveClient> ──► Drive v3
//!             (stdio)            │
//!                                ├── SkillRegistry (SKILL.md + script.py)
//!                                ├── SkillExecutor (child process)
//!                                └── AuditSink (intelligent_audit.log)
//! ```

pub mod audit;
pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod mcp;
pub mod skills;
pub mod tools;

pub use audit::{AuditSink, EventKind, EventStatus, FileAuditLog, MemoryAudit, RecoveryEvent};
pub use auth::{AuthorizedUserToken, StaticToken, TokenProvider};
pub use config::Config;
pub use drive::{DriveClient, PathResolver, RemoteStore, RetryPolicy, SelfHealing};
pub use error::{DriveError, DriveResult};
pub use mcp::{McpRequest, McpResponse, McpServer};
pub use skills::{SkillDefinition, SkillError, SkillExecutor, SkillRegistry};
pub use tools::ToolRegistry;
