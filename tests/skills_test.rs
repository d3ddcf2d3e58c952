//! Skill Forge Integration Tests
//!
//! Forge, discover and run skills end to end. `/bin/sh` stands in for the
//! interpreter so the scripts run without a Python install.

use drive_forge::audit::{EventKind, MemoryAudit};
use drive_forge::skills::{ExecutorConfig, SkillExecutor, SkillRegistry, NO_OUTPUT};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Forge {
    registry: SkillRegistry,
    executor: SkillExecutor,
    audit: Arc<MemoryAudit>,
    temp: TempDir,
}

fn forge(timeout: Option<Duration>) -> Forge {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let skills_dir = temp.path().join("skills");
    let audit = Arc::new(MemoryAudit::new());

    let registry = SkillRegistry::new(&skills_dir, audit.clone());
    let executor = SkillExecutor::new(ExecutorConfig {
        skills_dir,
        interpreter: "/bin/sh".into(),
        package_root: temp.path().to_path_buf(),
        timeout,
    });

    Forge {
        registry,
        executor,
        audit,
        temp,
    }
}

#[tokio::test]
async fn test_forge_then_run_with_messy_name() {
    let f = forge(None);
    f.registry
        .forge("Archive Old Files!", "echo archived \"$1\"", "Archive stale files")
        .unwrap();

    let output = f
        .executor
        .run("Archive Old Files!", &["2025".to_string()])
        .await;

    assert_eq!(output, "archived 2025\n");
    assert_eq!(f.audit.events_of(&EventKind::SkillForge).len(), 1);
}

#[tokio::test]
async fn test_padded_name_runs_what_was_forged() {
    let f = forge(None);
    f.registry.forge(" Report ", "echo ran", "Padded name").unwrap();

    assert!(f.registry.root().join("_report_").join("script.py").is_file());
    assert_eq!(f.executor.run(" Report ", &[]).await, "ran\n");
}

#[tokio::test]
async fn test_silent_skill_reports_sentinel() {
    let f = forge(None);
    f.registry.forge("quiet", "true", "Does nothing").unwrap();

    assert_eq!(f.executor.run("quiet", &[]).await, NO_OUTPUT);
}

#[tokio::test]
async fn test_stderr_is_appended_not_fatal() {
    let f = forge(None);
    f.registry
        .forge("noisy", "echo result\necho 'deprecated flag' >&2", "Warns")
        .unwrap();

    let output = f.executor.run("noisy", &[]).await;

    assert!(output.starts_with("result\n"));
    assert!(output.contains("--- Errors/Warnings ---"));
    assert!(output.contains("deprecated flag"));
}

#[tokio::test]
async fn test_failing_skill_still_returns_text() {
    let f = forge(None);
    f.registry
        .forge("broken", "echo 'Traceback: boom' >&2\nexit 3", "Fails")
        .unwrap();

    let output = f.executor.run("broken", &[]).await;

    assert!(output.contains("Traceback: boom"));
}

#[tokio::test]
async fn test_package_root_on_module_path() {
    let f = forge(None);
    f.registry
        .forge("paths", "echo \"$PYTHONPATH\"", "Prints module path")
        .unwrap();

    let output = f.executor.run("paths", &[]).await;

    let root = f.temp.path().to_string_lossy().to_string();
    assert!(output.starts_with(&root));
}

#[tokio::test]
async fn test_missing_script_message() {
    let f = forge(None);

    let output = f.executor.run("ghost", &[]).await;

    assert!(output.starts_with("Error: Skill script not found at"));
    assert!(output.contains("ghost"));
}

#[tokio::test]
async fn test_unlaunchable_interpreter() {
    let temp = TempDir::new().unwrap();
    let skills_dir = temp.path().join("skills");
    let registry = SkillRegistry::new(&skills_dir, Arc::new(MemoryAudit::new()));
    registry.forge("hello", "print('hi')", "Greets").unwrap();

    let executor = SkillExecutor::new(ExecutorConfig {
        skills_dir,
        interpreter: temp.path().join("no-such-python"),
        package_root: temp.path().to_path_buf(),
        timeout: None,
    });

    let output = executor.run("hello", &[]).await;
    assert!(output.starts_with("Failed to execute skill:"));
}

#[tokio::test]
async fn test_timeout_kills_skill() {
    let f = forge(Some(Duration::from_millis(200)));
    f.registry.forge("slow", "sleep 5", "Sleeps").unwrap();

    let start = std::time::Instant::now();
    let output = f.executor.run("slow", &[]).await;

    assert!(output.starts_with("Error: Skill timed out"));
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_discovery_skips_incomplete_metadata() {
    let f = forge(None);
    f.registry.forge("good", "true", "Works").unwrap();

    let bad = f.registry.root().join("bad");
    std::fs::create_dir_all(&bad).unwrap();
    std::fs::write(bad.join("SKILL.md"), "---\nname: bad\n---\n\nno description field\n").unwrap();

    let unrelated = f.registry.root().join("scratch");
    std::fs::create_dir_all(&unrelated).unwrap();

    let names: Vec<String> = f.registry.discover().map(|s| s.name).collect();
    assert_eq!(names, vec!["good".to_string()]);
}

#[tokio::test]
async fn test_update_changes_what_runs() {
    let f = forge(None);
    f.registry.forge("report", "echo v1", "Reports").unwrap();
    assert_eq!(f.executor.run("report", &[]).await, "v1\n");

    f.registry.update("report", "echo v2", None).unwrap();
    assert_eq!(f.executor.run("report", &[]).await, "v2\n");
    assert_eq!(f.registry.get("report").unwrap().description, "Reports");
}
