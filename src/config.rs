//! Configuration management

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::drive::api::DEFAULT_API_BASE;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Package root: exposed to skills, holds the guide and token file
    pub home: PathBuf,

    /// Root of the skill library
    pub skills_dir: PathBuf,

    /// Interpreter file or virtualenv directory for skills
    pub python_path: PathBuf,

    /// Audit log file
    pub audit_log: PathBuf,

    /// Static bearer token (optional - bypasses token.json)
    pub access_token: Option<String>,

    /// Authorized-user token file
    pub token_path: PathBuf,

    /// Drive REST base URL
    pub api_base: String,

    /// Listing cache capacity
    pub list_cache_capacity: u64,

    /// Metadata cache capacity
    pub metadata_cache_capacity: u64,

    /// Optional expiry for cached reads
    pub cache_ttl: Option<Duration>,

    /// Attempts for retried reads
    pub retry_attempts: usize,

    /// Optional skill timeout
    pub skill_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let home = env_path("DRIVE_FORGE_HOME")
            .map(Ok)
            .unwrap_or_else(std::env::current_dir)?;

        let skills_dir = env_path("GOOGLE_DRIVE_SKILLS_DIR").unwrap_or_else(|| home.join("skills"));

        let python_path = env_path("GOOGLE_DRIVE_PYTHON_PATH").unwrap_or_else(|| {
            let venv = home.join("antigravity-env");
            if venv.exists() {
                venv
            } else {
                PathBuf::from("python3")
            }
        });

        let audit_log = env_path("GOOGLE_DRIVE_AUDIT_LOG").unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| home.clone())
                .join("drive-forge")
                .join("intelligent_audit.log")
        });

        let access_token = std::env::var("GOOGLE_DRIVE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let token_path = env_path("GOOGLE_DRIVE_TOKEN_PATH").unwrap_or_else(|| home.join("token.json"));

        let api_base = std::env::var("DRIVE_FORGE_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        let list_cache_capacity = env_parse("DRIVE_FORGE_LIST_CACHE").unwrap_or(128);
        let metadata_cache_capacity = env_parse("DRIVE_FORGE_METADATA_CACHE").unwrap_or(256);
        let cache_ttl = env_parse::<u64>("DRIVE_FORGE_CACHE_TTL").map(Duration::from_secs);
        let retry_attempts = env_parse("DRIVE_FORGE_RETRY_ATTEMPTS").unwrap_or(3);
        let skill_timeout = env_parse::<u64>("DRIVE_FORGE_SKILL_TIMEOUT")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            home,
            skills_dir,
            python_path,
            audit_log,
            access_token,
            token_path,
            api_base,
            list_cache_capacity,
            metadata_cache_capacity,
            cache_ttl,
            retry_attempts,
            skill_timeout,
        })
    }

    /// The long-form usage guide served by `get_skill_guide`
    pub fn guide_path(&self) -> PathBuf {
        self.home.join("SKILL.md")
    }
}

/// Path from the environment, with `~` and `$VAR` expanded
fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok().filter(|v| !v.trim().is_empty())?;
    let expanded = shellexpand::full(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    Some(PathBuf::from(expanded))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_path_expands_home() {
        std::env::set_var("DRIVE_FORGE_TEST_PATH", "~/forge-skills");
        let path = env_path("DRIVE_FORGE_TEST_PATH").unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("forge-skills"));
        std::env::remove_var("DRIVE_FORGE_TEST_PATH");
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        std::env::set_var("DRIVE_FORGE_TEST_NUM", "not-a-number");
        assert_eq!(env_parse::<u64>("DRIVE_FORGE_TEST_NUM"), None);
        std::env::set_var("DRIVE_FORGE_TEST_NUM", " 42 ");
        assert_eq!(env_parse::<u64>("DRIVE_FORGE_TEST_NUM"), Some(42));
        std::env::remove_var("DRIVE_FORGE_TEST_NUM");
    }
}
