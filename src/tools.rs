//! MCP Tool Registry
//!
//! Defines and executes the agent-facing tools: Drive access, path
//! resolution, and the skill forge. Results are text so the calling agent
//! can read failures and retry conversationally.

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::audit::{AuditSink, FileAuditLog};
use crate::auth::{AuthorizedUserToken, StaticToken, TokenProvider};
use crate::config::Config;
use crate::drive::types::{ContentKind, XLSX_MIME, TEXT_MIME};
use crate::drive::{
    CacheConfig, DriveApi, DriveClient, HttpDriveApi, PathResolver, RemoteStore, RetryPolicy,
    SelfHealing, ROOT_ID,
};
use crate::skills::{sanitize_name, ExecutorConfig, SkillError, SkillExecutor, SkillRegistry};

/// URI scheme for file content resources
pub const RESOURCE_SCHEME: &str = "gdrive://";

/// Tool definition for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Contents returned by `resources/read`
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceContent {
    Text(String),
    /// Base64-encoded bytes
    Blob(String),
}

/// Tool registry with all components
pub struct ToolRegistry {
    config: Arc<Config>,
    drive: Arc<SelfHealing<DriveClient>>,
    resolver: PathResolver,
    skills: SkillRegistry,
    executor: SkillExecutor,
}

impl ToolRegistry {
    /// Create new tool registry talking to Google Drive
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let audit: Arc<dyn AuditSink> = Arc::new(FileAuditLog::new(&config.audit_log));

        let tokens: Arc<dyn TokenProvider> = match &config.access_token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(AuthorizedUserToken::new(&config.token_path)),
        };
        let api = Arc::new(HttpDriveApi::with_base_url(tokens, &config.api_base));

        std::fs::create_dir_all(&config.skills_dir).with_context(|| {
            format!("Failed to create skills directory {}", config.skills_dir.display())
        })?;

        Ok(Self::with_api(config, api, audit))
    }

    /// Assemble the registry over any Drive transport
    pub fn with_api(config: Arc<Config>, api: Arc<dyn DriveApi>, audit: Arc<dyn AuditSink>) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.retry_attempts.max(1),
            ..RetryPolicy::default()
        };
        Self::with_policies(config, api, audit, retry)
    }

    pub fn with_policies(
        config: Arc<Config>,
        api: Arc<dyn DriveApi>,
        audit: Arc<dyn AuditSink>,
        retry: RetryPolicy,
    ) -> Self {
        let cache = CacheConfig {
            list_capacity: config.list_cache_capacity,
            metadata_capacity: config.metadata_cache_capacity,
            ttl: config.cache_ttl,
        };
        let client = DriveClient::with_policies(api, retry, cache);
        let drive = Arc::new(SelfHealing::new(client, audit.clone()));
        let resolver = PathResolver::new(drive.clone(), audit.clone());
        let skills = SkillRegistry::new(&config.skills_dir, audit);
        let executor = SkillExecutor::new(ExecutorConfig {
            skills_dir: config.skills_dir.clone(),
            interpreter: config.python_path.clone(),
            package_root: config.home.clone(),
            timeout: config.skill_timeout,
        });

        Self {
            config,
            drive,
            resolver,
            skills,
            executor,
        }
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// List all tool definitions
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            // ========== Drive Tools ==========
            ToolDefinition::new(
                "list_files",
                "List the most recent files in Google Drive.",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Number of files to return (max 100)",
                            "default": 20
                        }
                    }
                }),
            ),
            ToolDefinition::new(
                "search_files",
                "Search for files in Google Drive by name.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search text (e.g. project name)"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Max results",
                            "default": 20
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                "list_folder",
                "List all children (files and subfolders) of a specific folder.",
                json!({
                    "type": "object",
                    "properties": {
                        "folder_id": {
                            "type": "string",
                            "description": "The ID of the folder to list. Use 'root' for top level."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Max results",
                            "default": 50
                        }
                    },
                    "required": ["folder_id"]
                }),
            ),
            ToolDefinition::new(
                "get_file_metadata",
                "Get detailed metadata for a file.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_id": {
                            "type": "string",
                            "description": "The ID of the file"
                        }
                    },
                    "required": ["file_id"]
                }),
            ),
            ToolDefinition::new(
                "create_folder",
                "Create a new folder.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Name of the new folder"
                        },
                        "parent_id": {
                            "type": "string",
                            "description": "ID of the parent folder",
                            "default": "root"
                        }
                    },
                    "required": ["name"]
                }),
            ),
            ToolDefinition::new(
                "upload_file",
                "Upload a text file to Google Drive.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Name of the file"
                        },
                        "content": {
                            "type": "string",
                            "description": "Text content of the file"
                        },
                        "parent_id": {
                            "type": "string",
                            "description": "ID of the parent folder",
                            "default": "root"
                        },
                        "mime_type": {
                            "type": "string",
                            "description": "MIME type (guessed from the name when omitted)"
                        }
                    },
                    "required": ["name", "content"]
                }),
            ),
            ToolDefinition::new(
                "trash_file",
                "Move a file to the trash.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_id": {
                            "type": "string",
                            "description": "ID of the file to trash"
                        }
                    },
                    "required": ["file_id"]
                }),
            ),
            // ========== Autonomy Tools ==========
            ToolDefinition::new(
                "resolve_path",
                "Resolve a human-readable path (e.g. '/Projects/2026') to a File ID, healing near-miss segments.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The full path to resolve"
                        }
                    },
                    "required": ["path"]
                }),
            ),
            ToolDefinition::new(
                "smart_read",
                "Resolve a path and read its content in one step. Documents are read as plain text.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the file"
                        }
                    },
                    "required": ["path"]
                }),
            ),
            ToolDefinition::new(
                "download_to_local",
                "Download a file from Drive to the local filesystem. Docs become markdown, Sheets become xlsx.",
                json!({
                    "type": "object",
                    "properties": {
                        "file_id": {
                            "type": "string",
                            "description": "The ID of the file to download"
                        },
                        "local_path": {
                            "type": "string",
                            "description": "Local file or directory path to save to"
                        }
                    },
                    "required": ["file_id", "local_path"]
                }),
            ),
            // ========== Forge Tools ==========
            ToolDefinition::new(
                "create_skill",
                "Forge a new capability (Skill) by writing a Python script.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Technical name of the skill (e.g. 'archive_old_files')"
                        },
                        "code": {
                            "type": "string",
                            "description": "The Python code for the script"
                        },
                        "description": {
                            "type": "string",
                            "description": "What this skill does (saved in SKILL.md)"
                        }
                    },
                    "required": ["name", "code", "description"]
                }),
            ),
            ToolDefinition::new(
                "list_skills",
                "List all available forged skills in the library.",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            ToolDefinition::new(
                "update_skill",
                "Update an existing skill with new code and optionally a new description.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Technical name of the skill to update"
                        },
                        "code": {
                            "type": "string",
                            "description": "The new Python code"
                        },
                        "description": {
                            "type": "string",
                            "description": "Optional updated description"
                        }
                    },
                    "required": ["name", "code"]
                }),
            ),
            ToolDefinition::new(
                "run_skill",
                "Execute a forged skill from the library.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "The name of the skill to run"
                        },
                        "args": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Optional command-line arguments for the script"
                        }
                    },
                    "required": ["name"]
                }),
            ),
            ToolDefinition::new(
                "get_skill_guide",
                "Return the manual (SKILL.md) describing autonomous features, the Forge, and script templates.",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            status_definition(),
        ]
    }

    /// Call a tool by name
    pub async fn call(&self, name: &str, args: serde_json::Value) -> Result<String> {
        info!("Tool call: {} with args: {}", name, args);
        let start = std::time::Instant::now();

        let result = match name {
            // ========== Drive ==========
            "list_files" => {
                let limit = limit_arg(&args, 20).min(100);
                let files = self.drive.list(None, limit).await?;
                Ok(serde_json::to_string_pretty(&files)?)
            }
            "search_files" => {
                let query = required_str(&args, "query")?;
                let limit = limit_arg(&args, 20);
                let files = self.drive.search(query, limit).await?;
                Ok(serde_json::to_string_pretty(&files)?)
            }
            "list_folder" => {
                let folder_id = required_str(&args, "folder_id")?;
                let limit = limit_arg(&args, 50);
                let files = self.drive.list_children(folder_id, limit).await?;
                Ok(serde_json::to_string_pretty(&files)?)
            }
            "get_file_metadata" => {
                let file_id = required_str(&args, "file_id")?;
                let meta = self.drive.get_metadata(file_id).await?;
                Ok(serde_json::to_string_pretty(&meta)?)
            }
            "create_folder" => {
                let name = required_str(&args, "name")?;
                let parent_id = args["parent_id"].as_str().unwrap_or(ROOT_ID);
                let created = self.drive.create_folder(name, parent_id).await?;
                Ok(serde_json::to_string_pretty(&created)?)
            }
            "upload_file" => {
                let name = required_str(&args, "name")?;
                let content = required_str(&args, "content")?;
                let parent_id = args["parent_id"].as_str().unwrap_or(ROOT_ID);
                let mime_type = match args["mime_type"].as_str() {
                    Some(mime) => mime.to_string(),
                    None => guess_mime(name),
                };
                let created = self
                    .drive
                    .upload(name, content.into(), parent_id, &mime_type)
                    .await?;
                Ok(serde_json::to_string_pretty(&created)?)
            }
            "trash_file" => {
                let file_id = required_str(&args, "file_id")?;
                let trashed = self.drive.trash(file_id).await?;
                Ok(serde_json::to_string_pretty(&trashed)?)
            }

            // ========== Autonomy ==========
            "resolve_path" => {
                let path = required_str(&args, "path")?;
                match self.resolver.resolve_id(path).await? {
                    Some(id) => Ok(format!("Resolved '{}' to ID: {}", path, id)),
                    None => Ok(format!(
                        "Error: Could not resolve path '{}'. Check logs for suggestions.",
                        path
                    )),
                }
            }
            "smart_read" => {
                let path = required_str(&args, "path")?;
                Ok(self.smart_read(path).await)
            }
            "download_to_local" => {
                let file_id = required_str(&args, "file_id")?;
                let local_path = required_str(&args, "local_path")?;
                Ok(self
                    .download_to_local(file_id, local_path)
                    .await
                    .unwrap_or_else(|e| format!("Error downloading file: {}", e)))
            }

            // ========== Forge ==========
            "create_skill" => {
                let name = required_str(&args, "name")?;
                let code = required_str(&args, "code")?;
                let description = required_str(&args, "description")?;
                let skill = self.skills.forge(name, code, description)?;
                Ok(format!(
                    "Skill '{}' forged successfully in {}",
                    skill.name,
                    skill.dir.display()
                ))
            }
            "list_skills" => {
                let skills: Vec<_> = self
                    .skills
                    .discover()
                    .map(|s| json!({ "name": s.name, "description": s.description }))
                    .collect();
                Ok(serde_json::to_string_pretty(&skills)?)
            }
            "update_skill" => {
                let name = required_str(&args, "name")?;
                let code = required_str(&args, "code")?;
                let description = args["description"].as_str();
                match self.skills.update(name, code, description) {
                    Ok(skill) => Ok(format!("Skill '{}' updated successfully.", skill.name)),
                    Err(e @ SkillError::NotFound(_)) => Ok(format!("Error: {}", e)),
                    Err(e) => Err(e.into()),
                }
            }
            "run_skill" => {
                let name = required_str(&args, "name")?;
                let skill_args: Vec<String> = args["args"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|v| match v.as_str() {
                                Some(s) => s.to_string(),
                                None => v.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(self.executor.run(&sanitize_name(name), &skill_args).await)
            }
            "get_skill_guide" => {
                let guide = self.config.guide_path();
                match tokio::fs::read_to_string(&guide).await {
                    Ok(content) => Ok(content),
                    Err(_) => Ok(format!(
                        "Error: SKILL.md not found at {}.",
                        guide.display()
                    )),
                }
            }
            "status" => Ok(self.status()),

            _ => anyhow::bail!("Unknown tool: {}", name),
        };

        // Log tool execution time
        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(100) {
            info!("Tool {} completed in {}ms", name, elapsed.as_millis());
        }

        result
    }

    /// Resolve a path and return its content as text
    pub async fn smart_read(&self, path: &str) -> String {
        let file_id = match self.resolver.resolve_id(path).await {
            Ok(Some(id)) => id,
            Ok(None) => return format!("Error: Could not resolve path '{}'", path),
            Err(e) => return format!("Error reading file at '{}': {}", path, e),
        };

        let read = async {
            let meta = self.drive.get_metadata(&file_id).await?;
            let export = match meta.kind() {
                ContentKind::Document => Some(TEXT_MIME),
                _ => None,
            };
            let bytes = self.drive.download(&file_id, export).await?;
            Ok::<_, crate::error::DriveError>((meta.mime_type, bytes))
        };

        match read.await {
            Ok((mime_type, bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => format!(
                    "<Binary Content: {} bytes> (MIME: {})",
                    e.as_bytes().len(),
                    mime_type
                ),
            },
            Err(e) => format!("Error reading file at '{}': {}", path, e),
        }
    }

    /// Save a remote file locally; documents become markdown, sheets xlsx
    pub async fn download_to_local(&self, file_id: &str, local_path: &str) -> Result<String> {
        let meta = self.drive.get_metadata(file_id).await?;
        let expanded = shellexpand::tilde(local_path).into_owned();

        let mut final_path = PathBuf::from(&expanded);
        if final_path.is_dir() || expanded.ends_with(std::path::MAIN_SEPARATOR) || expanded.ends_with('/') {
            let name = local_file_name(&meta.name)
                .with_context(|| format!("Remote name '{}' is not a usable file name", meta.name))?;
            tokio::fs::create_dir_all(&final_path).await?;
            final_path = final_path.join(name);
        }

        let content = match meta.kind() {
            ContentKind::Document => {
                final_path = with_suffix_unless(&final_path, &["txt", "md"], "md");
                self.drive.download(file_id, Some(TEXT_MIME)).await?
            }
            ContentKind::Spreadsheet => {
                final_path = with_suffix_unless(&final_path, &["xlsx"], "xlsx");
                self.drive.download(file_id, Some(XLSX_MIME)).await?
            }
            _ => self.drive.download(file_id, None).await?,
        };

        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&final_path, &content).await?;

        Ok(format!(
            "Successfully downloaded '{}' to '{}'",
            meta.name,
            final_path.display()
        ))
    }

    /// Read a `gdrive://{file_id}/content` resource
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContent> {
        let file_id = uri
            .strip_prefix(RESOURCE_SCHEME)
            .and_then(|rest| rest.strip_suffix("/content"))
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .with_context(|| format!("Unsupported resource URI: {}", uri))?;

        let bytes = self.drive.download(file_id, None).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => ResourceContent::Text(text),
            Err(e) => ResourceContent::Blob(
                base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
            ),
        })
    }

    fn status(&self) -> String {
        let client = self.drive.inner();
        let listings = client.list_cache_stats();
        let metadata = client.metadata_cache_stats();
        json!({
            "status": "ok",
            "skills_dir": self.config.skills_dir.display().to_string(),
            "skills": self.skills.discover().count(),
            "audit_log": self.config.audit_log.display().to_string(),
            "interpreter": self.executor.interpreter().display().to_string(),
            "list_cache": { "entries": listings.entries, "hits": listings.hits, "misses": listings.misses },
            "metadata_cache": { "entries": metadata.entries, "hits": metadata.hits, "misses": metadata.misses }
        })
        .to_string()
    }
}

/// Definition of the always-available `status` tool
pub fn status_definition() -> ToolDefinition {
    ToolDefinition::new(
        "status",
        "Report whether the server initialised, with cache and skill library details.",
        json!({
            "type": "object",
            "properties": {}
        }),
    )
}

fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .with_context(|| format!("Missing required argument '{}'", key))
}

fn limit_arg(args: &serde_json::Value, default: usize) -> usize {
    args["limit"]
        .as_u64()
        .map(|n| n as usize)
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(TEXT_MIME)
        .to_string()
}

/// Last component of a remote name, so it always lands inside the target dir
fn local_file_name(remote: &str) -> Option<&std::ffi::OsStr> {
    Path::new(remote).file_name()
}

/// Append `.{suffix}` unless the path already ends in one of `keep`
fn with_suffix_unless(path: &Path, keep: &[&str], suffix: &str) -> PathBuf {
    let has_kept = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| keep.iter().any(|k| e.eq_ignore_ascii_case(k)))
        .unwrap_or(false);

    if has_kept {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(format!(".{}", suffix));
        PathBuf::from(raw)
    }
}
