//! Trait contract tests for BuildStore.
//!
//! These tests verify the behavioral contract of the storage trait using
//! the in-memory fake. Any conforming backend must pass these.

use chrono::Utc;
use capstan_state::fakes::MemoryBuildStore;
use capstan_state::{BuildStatus, BuildStore, ProjectRecord};

// ===========================================================================
// Project persistence
// ===========================================================================

#[tokio::test]
async fn project_round_trip() {
    let store = MemoryBuildStore::new();
    let project = ProjectRecord::new("demo", "https://example.com/demo.git", "main", "make test");

    store.update_project(&project).await.unwrap();
    let loaded = store.get_project("demo").await.unwrap();

    assert_eq!(loaded, Some(project));
}

#[tokio::test]
async fn project_absent_is_none() {
    let store = MemoryBuildStore::new();
    assert!(store.get_project("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn project_update_replaces() {
    let store = MemoryBuildStore::new();
    let first = ProjectRecord::new("demo", "https://example.com/a.git", "main", "make");
    let second = ProjectRecord::new("demo", "https://example.com/b.git", "main", "make");

    store.update_project(&first).await.unwrap();
    store.update_project(&second).await.unwrap();

    let loaded = store.get_project("demo").await.unwrap().unwrap();
    assert_eq!(loaded.repository, "https://example.com/b.git");
}

// ===========================================================================
// Commit records
// ===========================================================================

#[tokio::test]
async fn init_commit_persists_pending() {
    let store = MemoryBuildStore::new();
    let commit = store
        .init_commit("demo", "abc123", "alice", Utc::now(), "first commit")
        .await
        .unwrap();

    assert_eq!(commit.status, BuildStatus::Pending);

    let loaded = store.get_commit("demo", "abc123").await.unwrap().unwrap();
    assert_eq!(loaded.status, BuildStatus::Pending);
    assert_eq!(loaded.author, "alice");
    assert_eq!(loaded.message, "first commit");
}

#[tokio::test]
async fn get_commit_absent_is_none() {
    let store = MemoryBuildStore::new();
    assert!(store.get_commit("demo", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn update_commit_persists_transition() {
    let store = MemoryBuildStore::new();
    let commit = store
        .init_commit("demo", "abc123", "alice", Utc::now(), "first commit")
        .await
        .unwrap();

    let done = commit.succeed("ok\n".to_string());
    store.update_commit(&done).await.unwrap();

    let loaded = store.get_commit("demo", "abc123").await.unwrap().unwrap();
    assert_eq!(loaded.status, BuildStatus::Success);
    assert_eq!(loaded.output, "ok\n");
    assert!(loaded.built_at.is_some());
}

#[tokio::test]
async fn init_commit_resets_terminal_record() {
    // A forced rebuild re-initializes the pair back to Pending.
    let store = MemoryBuildStore::new();
    let commit = store
        .init_commit("demo", "abc123", "alice", Utc::now(), "first commit")
        .await
        .unwrap();
    store
        .update_commit(&commit.fail("broken".to_string()))
        .await
        .unwrap();

    store
        .init_commit("demo", "abc123", "alice", Utc::now(), "first commit")
        .await
        .unwrap();

    let loaded = store.get_commit("demo", "abc123").await.unwrap().unwrap();
    assert_eq!(loaded.status, BuildStatus::Pending);
    assert!(loaded.output.is_empty());
}

#[tokio::test]
async fn commits_are_keyed_per_project() {
    let store = MemoryBuildStore::new();
    store
        .init_commit("one", "abc123", "alice", Utc::now(), "shared sha")
        .await
        .unwrap();

    assert!(store.get_commit("two", "abc123").await.unwrap().is_none());
}

// ===========================================================================
// Build slot
// ===========================================================================

#[tokio::test]
async fn build_slot_excludes_second_claim() {
    let store = MemoryBuildStore::new();

    assert!(store.try_begin_build("demo").await.unwrap());
    assert!(!store.try_begin_build("demo").await.unwrap());
}

#[tokio::test]
async fn build_slot_released_after_end() {
    let store = MemoryBuildStore::new();

    assert!(store.try_begin_build("demo").await.unwrap());
    store.end_build("demo").await.unwrap();
    assert!(store.try_begin_build("demo").await.unwrap());
}

#[tokio::test]
async fn build_slots_are_per_slug() {
    let store = MemoryBuildStore::new();

    assert!(store.try_begin_build("one").await.unwrap());
    assert!(store.try_begin_build("two").await.unwrap());
}

#[tokio::test]
async fn end_build_without_claim_is_noop() {
    let store = MemoryBuildStore::new();
    store.end_build("demo").await.unwrap();
    assert!(store.try_begin_build("demo").await.unwrap());
}
