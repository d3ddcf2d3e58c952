//! Path Resolver Integration Tests
//!
//! Exact matching, near-miss healing and ambiguity handling.

mod common;

use common::FakeDrive;
use drive_forge::audit::{EventKind, EventStatus, MemoryAudit};
use drive_forge::drive::types::TEXT_MIME;
use drive_forge::drive::{DriveClient, PathResolver, RemoteStore, RetryPolicy, SelfHealing};
use std::sync::Arc;

fn resolver_over(fake: Arc<FakeDrive>) -> (PathResolver, Arc<MemoryAudit>) {
    let audit = Arc::new(MemoryAudit::new());
    let client = DriveClient::with_policies(fake, RetryPolicy::immediate(3), Default::default());
    let store: Arc<dyn RemoteStore> = Arc::new(SelfHealing::new(client, audit.clone()));
    (PathResolver::new(store, audit.clone()), audit)
}

#[tokio::test]
async fn test_exact_path() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("projects", "Projects", "root");
    fake.add_folder("y2026", "2026", "projects");
    fake.add_file("plan", "plan.txt", TEXT_MIME, "y2026", b"");
    let (resolver, audit) = resolver_over(fake);

    let resolved = resolver.resolve("/Projects/2026/plan.txt").await.unwrap().unwrap();

    assert_eq!(resolved.id, "plan");
    assert_eq!(resolved.segments.len(), 3);
    assert!(!resolved.was_healed());
    assert!(audit.events().is_empty());
}

#[tokio::test]
async fn test_empty_path_is_root() {
    let fake = Arc::new(FakeDrive::new());
    let (resolver, _audit) = resolver_over(fake.clone());

    assert_eq!(resolver.resolve_id("/").await.unwrap().as_deref(), Some("root"));
    assert_eq!(resolver.resolve_id("").await.unwrap().as_deref(), Some("root"));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_exact_match_wins_over_fuzzy() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("budget", "Budget", "root");
    fake.add_folder("budget-old", "Budget_old", "root");
    let (resolver, audit) = resolver_over(fake);

    let id = resolver.resolve_id("/Budget").await.unwrap();

    assert_eq!(id.as_deref(), Some("budget"));
    assert!(audit.events().is_empty());
}

#[tokio::test]
async fn test_near_miss_is_healed() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("budget", "Budget2026", "root");
    fake.add_file("q1", "q1.txt", TEXT_MIME, "budget", b"");
    let (resolver, audit) = resolver_over(fake);

    let resolved = resolver.resolve("/budget/q1.txt").await.unwrap().unwrap();

    assert_eq!(resolved.id, "q1");
    assert!(resolved.was_healed());
    assert!(resolved.segments[0].healed);
    assert_eq!(resolved.segments[0].requested, "budget");
    assert_eq!(resolved.healed_path(), "/Budget2026/q1.txt");

    let events = audit.events_of(&EventKind::Recovery);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Success);
    assert!(events[0].detail.contains("Budget2026"));
}

#[tokio::test]
async fn test_ambiguous_segment_fails_with_candidates() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("p1", "Project Alpha", "root");
    fake.add_folder("p2", "Project Beta", "root");
    let (resolver, audit) = resolver_over(fake);

    let resolved = resolver.resolve("/proj").await.unwrap();

    assert!(resolved.is_none());
    let events = audit.events_of(&EventKind::Recovery);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Failure);
    assert!(events[0].detail.contains("Project Alpha"));
    assert!(events[0].detail.contains("Project Beta"));
}

#[tokio::test]
async fn test_missing_segment_fails() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("docs", "Docs", "root");
    let (resolver, audit) = resolver_over(fake);

    assert!(resolver.resolve("/Docs/missing").await.unwrap().is_none());
    assert_eq!(audit.events_of(&EventKind::Recovery)[0].status, EventStatus::Failure);
}

#[tokio::test]
async fn test_trashed_children_never_heal() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_trashed("old", "Invoices", "root");
    let (resolver, _audit) = resolver_over(fake);

    assert!(resolver.resolve("/invoice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_custom_root() {
    let fake = Arc::new(FakeDrive::new());
    fake.add_folder("shared", "Shared", "root");
    fake.add_file("f", "readme.txt", TEXT_MIME, "shared", b"");
    let (resolver, _audit) = resolver_over(fake);
    let resolver = resolver.with_root("shared");

    assert_eq!(resolver.resolve_id("readme.txt").await.unwrap().as_deref(), Some("f"));
}
