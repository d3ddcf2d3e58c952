//! Skill Registry
//!
//! Skills live one per directory under a root:
//!
//! ```text
//! {root}/{name}/SKILL.md    metadata (front matter + description)
//! {root}/{name}/script.py   executable body
//! ```
//!
//! Discovery is lazy and tolerant: directories without a metadata file are
//! skipped silently, malformed ones are skipped with an error log, and a
//! missing root yields nothing.

use std::fs::ReadDir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::{
    render_metadata, sanitize_name, SkillDefinition, SkillError, METADATA_FILE, SCRIPT_FILE,
};
use crate::audit::{AuditSink, EventKind, EventStatus};

/// Filesystem-backed skill library
pub struct SkillRegistry {
    root: PathBuf,
    audit: Arc<dyn AuditSink>,
}

impl SkillRegistry {
    pub fn new(root: impl Into<PathBuf>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            root: root.into(),
            audit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a skill name (sanitized first)
    pub fn skill_dir(&self, name: &str) -> PathBuf {
        self.root.join(sanitize_name(name))
    }

    /// Enumerate skills. Each call starts a fresh scan.
    pub fn discover(&self) -> Discovery {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Skills directory not found: {} ({})", self.root.display(), e);
                None
            }
        };
        Discovery { entries }
    }

    /// Look up a single skill by name
    pub fn get(&self, name: &str) -> Option<SkillDefinition> {
        load_skill(&self.skill_dir(name))
    }

    /// Create (or overwrite) a skill
    pub fn forge(&self, name: &str, code: &str, description: &str) -> Result<SkillDefinition, SkillError> {
        let safe_name = checked_name(name)?;
        let dir = self.root.join(&safe_name);
        std::fs::create_dir_all(&dir)?;

        std::fs::write(dir.join(SCRIPT_FILE), code)?;
        std::fs::write(dir.join(METADATA_FILE), render_metadata(&safe_name, description))?;

        self.audit.record_skill_forge(&safe_name);
        info!("Skill '{}' forged in {}", safe_name, dir.display());

        Ok(SkillDefinition {
            name: safe_name,
            description: description.to_string(),
            long_description: description.to_string(),
            dir,
            script: Some(code.to_string()),
        })
    }

    /// Replace a skill's script, and its description when one is given
    pub fn update(
        &self,
        name: &str,
        code: &str,
        description: Option<&str>,
    ) -> Result<SkillDefinition, SkillError> {
        let safe_name = checked_name(name)?;
        let dir = self.root.join(&safe_name);
        if !dir.is_dir() {
            return Err(SkillError::NotFound(safe_name));
        }

        std::fs::write(dir.join(SCRIPT_FILE), code)?;
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            std::fs::write(dir.join(METADATA_FILE), render_metadata(&safe_name, description))?;
        }

        self.audit.record_event(
            EventKind::SkillUpdate,
            &format!("Capability updated: {}", safe_name),
            EventStatus::Info,
        );
        info!("Skill '{}' updated", safe_name);

        let metadata = std::fs::read_to_string(dir.join(METADATA_FILE))?;
        let mut skill = SkillDefinition::parse(&metadata, &dir)?;
        skill.script = Some(code.to_string());
        Ok(skill)
    }
}

/// Same sanitization the executor applies on run; blank names are refused
fn checked_name(name: &str) -> Result<String, SkillError> {
    if name.trim().is_empty() {
        return Err(SkillError::InvalidName(name.to_string()));
    }
    Ok(sanitize_name(name))
}

/// Parse one skill directory, logging (not failing) on bad metadata
fn load_skill(dir: &Path) -> Option<SkillDefinition> {
    let metadata_path = dir.join(METADATA_FILE);
    if !metadata_path.is_file() {
        return None;
    }

    let parsed = std::fs::read_to_string(&metadata_path)
        .map_err(SkillError::from)
        .and_then(|content| SkillDefinition::parse(&content, dir));

    match parsed {
        Ok(mut skill) => {
            skill.script = std::fs::read_to_string(dir.join(SCRIPT_FILE)).ok();
            Some(skill)
        }
        Err(e) => {
            error!("Error parsing {}: {}", metadata_path.display(), e);
            None
        }
    }
}

/// Lazy scan over a skills root
pub struct Discovery {
    entries: Option<ReadDir>,
}

impl Iterator for Discovery {
    type Item = SkillDefinition;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;

        for entry in entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable skills entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(skill) = load_skill(&path) {
                return Some(skill);
            }
        }

        self.entries = None;
        None
    }
}
