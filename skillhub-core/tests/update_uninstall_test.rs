//! Update (force + catalog-driven repository form) and uninstall

mod common;

use common::TestHub;
use pretty_assertions::assert_eq;
use skillhub_core::{Outcome, Target};

fn target(s: &str) -> Target {
    Target::parse(s).unwrap()
}

const SKILLS: &str = "pdf@acme/tools\t10\ndocx@acme/tools\t7\nkit@beta/kit\t1\n";

#[tokio::test]
async fn test_update_bundle_refetches() {
    let t = TestHub::new();
    t.remote_bundle("acme/tools", "pdf", "# v1\n");
    t.cache.install(&target("pdf@acme/tools"), false).await.unwrap();

    t.remote_bundle("acme/tools", "pdf", "# v2\n");
    let report = t
        .cache
        .update(&target("pdf@acme/tools"), &t.catalog)
        .await
        .unwrap();

    assert!(matches!(report.entries[0].outcome, Outcome::Updated { .. }));
    assert_eq!(t.fetcher.calls(), 2);
    assert_eq!(
        std::fs::read_to_string(t.hub_path("acme/tools/pdf/SKILL.md")).unwrap(),
        "# v2\n"
    );
}

#[tokio::test]
async fn test_update_repository_follows_catalog_with_one_fetch() {
    let t = TestHub::with_catalog(SKILLS, "");
    t.remote_bundle("acme/tools", "skills/pdf", "# pdf v2\n");
    t.remote_bundle("acme/tools", "skills/docx", "# docx v2\n");
    t.remote_bundle("acme/tools", "skills/unlisted", "# not in catalog\n");

    let report = t
        .cache
        .update(&target("acme/tools"), &t.catalog)
        .await
        .unwrap();

    let labels: Vec<&str> = report.succeeded().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["pdf@acme/tools", "docx@acme/tools"]);
    assert_eq!(t.fetcher.calls(), 1);
    assert_eq!(t.cached_bundles(), vec!["acme/tools/docx", "acme/tools/pdf"]);
}

#[tokio::test]
async fn test_update_repository_reports_catalog_entries_missing_upstream() {
    let t = TestHub::with_catalog(SKILLS, "");
    t.remote_bundle("acme/tools", "skills/pdf", "# pdf\n");

    let report = t
        .cache
        .update(&target("acme/tools"), &t.catalog)
        .await
        .unwrap();

    let failed: Vec<&str> = report.failures().map(|e| e.label.as_str()).collect();
    assert_eq!(failed, vec!["docx@acme/tools"]);
    assert_eq!(report.succeeded().count(), 1);
}

#[tokio::test]
async fn test_update_repository_keeps_cached_copy_missing_upstream() {
    let t = TestHub::with_catalog(SKILLS, "");
    t.remote_bundle("acme/tools", "skills/pdf", "# pdf\n");
    let docx = t.remote_bundle("acme/tools", "skills/docx", "# docx v1\n");
    t.cache.install(&target("acme/tools"), false).await.unwrap();

    std::fs::remove_dir_all(docx).unwrap();
    let report = t
        .cache
        .update(&target("acme/tools"), &t.catalog)
        .await
        .unwrap();

    let failed: Vec<&str> = report.failures().map(|e| e.label.as_str()).collect();
    assert_eq!(failed, vec!["docx@acme/tools"]);
    assert_eq!(
        std::fs::read_to_string(t.hub_path("acme/tools/docx/SKILL.md")).unwrap(),
        "# docx v1\n"
    );
}

#[tokio::test]
async fn test_update_repository_unknown_to_catalog() {
    let t = TestHub::with_catalog(SKILLS, "");
    t.remote_bundle("zeta/kit", "a", "# a\n");

    let report = t.cache.update(&target("zeta/kit"), &t.catalog).await.unwrap();

    assert!(report.has_failures());
    assert_eq!(t.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_update_from_file() {
    let t = TestHub::with_catalog(SKILLS, "");
    t.remote_bundle("beta/kit", "", "# kit\n");
    t.remote_bundle("acme/tools", "pdf", "# pdf\n");
    let list = t.project.path().join("update.txt");
    std::fs::write(&list, "kit@beta/kit\nbroken@@\npdf@acme/tools\n").unwrap();

    let report = t.cache.update_from_file(&list, &t.catalog).await.unwrap();

    assert_eq!(report.succeeded().count(), 2);
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn test_uninstall_leaves_no_trace() {
    let t = TestHub::new();
    t.remote_bundle("acme/tools", "demo", "# demo\n");
    t.cache.install(&target("demo@acme/tools"), false).await.unwrap();

    let report = t.cache.uninstall(&target("demo@acme/tools")).await.unwrap();

    assert!(matches!(report.entries[0].outcome, Outcome::Removed { .. }));
    assert!(!t.hub_path("acme").exists());
    assert!(t.cache.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_uninstall_never_installed_is_not_found() {
    let t = TestHub::new();
    t.remote_bundle("acme/tools", "keep", "# keep\n");
    t.cache.install(&target("keep@acme/tools"), false).await.unwrap();
    let before = t.hub_listing();

    let report = t.cache.uninstall(&target("ghost@acme/tools")).await.unwrap();

    assert_eq!(report.entries[0].outcome, Outcome::NotFound);
    assert_eq!(t.hub_listing(), before);
}

#[tokio::test]
async fn test_uninstall_on_empty_hub_touches_nothing() {
    let t = TestHub::new();

    for input in ["ghost@acme/tools", "acme/tools"] {
        let report = t.cache.uninstall(&target(input)).await.unwrap();
        assert_eq!(report.entries[0].outcome, Outcome::NotFound);
    }

    assert!(t.hub_listing().is_empty());
}

#[tokio::test]
async fn test_uninstall_repository_subtree() {
    let t = TestHub::new();
    t.remote_bundle("acme/tools", "a", "# a\n");
    t.remote_bundle("acme/tools", "b", "# b\n");
    t.remote_bundle("acme/other", "c", "# c\n");
    t.cache.install(&target("acme/tools"), false).await.unwrap();
    t.cache.install(&target("acme/other"), false).await.unwrap();

    t.cache.uninstall(&target("acme/tools")).await.unwrap();

    assert_eq!(t.cached_bundles(), vec!["acme/other/c"]);
}

#[tokio::test]
async fn test_uninstall_legacy_layout() {
    let t = TestHub::new();
    let legacy = t.hub_path("old/kit");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(legacy.join("SKILL.md"), "# legacy\n").unwrap();

    let report = t.cache.uninstall(&target("kit@old/kit")).await.unwrap();

    assert!(matches!(report.entries[0].outcome, Outcome::Removed { .. }));
    assert!(!legacy.exists());
}
