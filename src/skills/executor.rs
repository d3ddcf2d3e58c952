//! Skill Executor
//!
//! Runs `{skills_dir}/{name}/script.py` as a child process:
//! - interpreter resolved from a file or virtualenv directory
//! - caller's extra args passed through
//! - package root prepended to `PYTHONPATH` so skills can import shared code
//! - stdout and stderr captured separately, then combined
//!
//! Every outcome is reported as text. A missing script, a launch failure or
//! a timeout never escapes as an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::types::{sanitize_name, SCRIPT_FILE};

/// Result text when a skill prints nothing
pub const NO_OUTPUT: &str = "Script executed successfully with no output.";

/// Header separating stderr from stdout in combined output
pub const STDERR_HEADER: &str = "--- Errors/Warnings ---";

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Skills root
    pub skills_dir: PathBuf,
    /// Interpreter executable, or a virtualenv directory containing one
    pub interpreter: PathBuf,
    /// Added to the child's module search path
    pub package_root: PathBuf,
    /// Kill the child after this long (`None` waits indefinitely)
    pub timeout: Option<Duration>,
}

/// Captured run of one skill
#[derive(Debug, Clone)]
pub struct SkillRun {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl SkillRun {
    /// stdout, plus a delimited stderr section when stderr is non-empty.
    /// Stderr alone does not make the run a failure.
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            output.push_str(&format!("\n{}\n{}", STDERR_HEADER, self.stderr));
        }

        if output.trim().is_empty() {
            NO_OUTPUT.to_string()
        } else {
            output
        }
    }
}

/// Child-process skill runner
pub struct SkillExecutor {
    config: ExecutorConfig,
    interpreter: PathBuf,
}

impl SkillExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let interpreter = resolve_interpreter(&config.interpreter);
        info!("SkillExecutor initialized with interpreter: {}", interpreter.display());
        Self { config, interpreter }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Script path for a skill name (sanitized first)
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.config
            .skills_dir
            .join(sanitize_name(name))
            .join(SCRIPT_FILE)
    }

    /// Run a skill and return its combined output, or an error message
    pub async fn run(&self, name: &str, args: &[String]) -> String {
        let script = self.script_path(name);
        if !script.is_file() {
            return format!("Error: Skill script not found at {}", script.display());
        }

        match self.execute(&script, args).await {
            Ok(run) => {
                debug!(
                    "Skill '{}' exited with {:?} in {}ms",
                    name, run.exit_code, run.duration_ms
                );
                run.combined_output()
            }
            Err(message) => message,
        }
    }

    /// Spawn the script and wait for it. `Err` carries a user-facing message.
    pub async fn execute(&self, script: &Path, args: &[String]) -> Result<SkillRun, String> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script)
            .args(args)
            .env("PYTHONPATH", self.python_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| format!("Failed to execute skill: {}", e))?;

        let output = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the wait future drops the child, which kills it
                    warn!("Skill {} timed out after {:?}", script.display(), limit);
                    return Err(format!(
                        "Error: Skill timed out after {} seconds",
                        limit.as_secs_f64()
                    ));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| format!("Failed to execute skill: {}", e))?;

        Ok(SkillRun {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Package root first, then whatever the parent process had
    fn python_path(&self) -> std::ffi::OsString {
        let mut paths = vec![self.config.package_root.clone()];
        if let Some(existing) = std::env::var_os("PYTHONPATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths)
            .unwrap_or_else(|_| self.config.package_root.clone().into_os_string())
    }
}

/// Accept an interpreter file, or a virtualenv directory holding one
/// (`bin/python`, `Scripts/python.exe`, `python`). Anything else is used
/// verbatim and looked up on `PATH` at spawn time.
pub fn resolve_interpreter(configured: &Path) -> PathBuf {
    if configured.is_file() {
        return configured.to_path_buf();
    }

    if configured.is_dir() {
        let candidates = [
            configured.join("bin").join("python"),
            configured.join("Scripts").join("python.exe"),
            configured.join("python"),
        ];
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return found;
        }
    }

    configured.to_path_buf()
}
