//! Audit Trail
//!
//! Append-only record of recovery attempts and skill lifecycle events.
//! Writing is best-effort: a failed append is logged and swallowed.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Kind of audited operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Recovery,
    SkillForge,
    SkillUpdate,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Recovery => "RECOVERY",
            Self::SkillForge => "SKILL_FORGE",
            Self::SkillUpdate => "SKILL_UPDATE",
            Self::Other(kind) => kind,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Info,
    Success,
    Failure,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record
#[derive(Debug, Clone)]
pub struct RecoveryEvent {
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    pub detail: String,
    pub status: EventStatus,
}

impl RecoveryEvent {
    pub fn now(kind: EventKind, detail: &str, status: EventStatus) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            detail: detail.to_string(),
            status,
        }
    }

    /// `[2026-01-31 09:15:02] [SUCCESS] [RECOVERY] detail`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.kind,
            self.detail
        )
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    fn record_event(&self, kind: EventKind, detail: &str, status: EventStatus);

    fn record_recovery(&self, original_target: &str, recovered_name: &str, success: bool) {
        let status = if success {
            EventStatus::Success
        } else {
            EventStatus::Failure
        };
        self.record_event(
            EventKind::Recovery,
            &format!("Target ID: {} -> Found: {}", original_target, recovered_name),
            status,
        );
    }

    fn record_skill_forge(&self, name: &str) {
        self.record_event(
            EventKind::SkillForge,
            &format!("New capability created: {}", name),
            EventStatus::Info,
        );
    }
}

/// Line-per-event log file
pub struct FileAuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileAuditLog {
    /// Open (lazily) an audit log, creating parent directories
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("Failed to create audit log directory {}: {}", parent.display(), e);
            }
        }
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.lock.lock();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl AuditSink for FileAuditLog {
    fn record_event(&self, kind: EventKind, detail: &str, status: EventStatus) {
        let line = RecoveryEvent::now(kind, detail, status).to_line();
        debug!("Audit: {}", line);
        if let Err(e) = self.append(&line) {
            error!("Failed to write to audit log {}: {}", self.path.display(), e);
        }
    }
}

/// In-process sink, handy for embedding and inspection
#[derive(Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<RecoveryEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecoveryEvent> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, kind: &EventKind) -> Vec<RecoveryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.kind == kind)
            .cloned()
            .collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record_event(&self, kind: EventKind, detail: &str, status: EventStatus) {
        self.events.lock().push(RecoveryEvent::now(kind, detail, status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_log_appends_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("audit.log");
        let log = FileAuditLog::new(&path);

        log.record_recovery("Budgt", "Budget2026", true);
        log.record_skill_forge("archive_old_files");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[SUCCESS] [RECOVERY] Target ID: Budgt -> Found: Budget2026"));
        assert!(lines[1].contains("[INFO] [SKILL_FORGE] New capability created: archive_old_files"));
    }

    #[test]
    fn test_unwritable_log_is_swallowed() {
        let temp = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let log = FileAuditLog::new(temp.path());
        log.record_event(EventKind::Other("PROBE".into()), "ignored", EventStatus::Info);
    }

    #[test]
    fn test_memory_audit_filters_by_kind() {
        let audit = MemoryAudit::new();
        audit.record_recovery("x", "Unknown (Need Search)", false);
        audit.record_event(EventKind::SkillUpdate, "Capability updated: x", EventStatus::Info);

        let recoveries = audit.events_of(&EventKind::Recovery);
        assert_eq!(recoveries.len(), 1);
        assert_eq!(recoveries[0].status, EventStatus::Failure);
        assert_eq!(audit.events().len(), 2);
    }
}
