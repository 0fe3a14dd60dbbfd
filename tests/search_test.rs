//! Integration tests for the per-type indexes and the search coordinator

mod common;

use common::{vulnerable_software, FailingStore, GatedStore, TestHarness};
use component_index::models::{Component, Cpe, License, Project, ServiceComponent};
use component_index::search::{check_consistency, ensure_indexes, IndexType, SearchError};
use component_index::state::InMemoryStore;
use futures::future::join_all;
use std::sync::Arc;
use tokio_test::assert_ok;
use uuid::Uuid;

fn widgets(count: usize) -> Vec<Component> {
    (0..count)
        .map(|i| Component::new(format!("widget {}", i)).with_version(format!("1.{}.0", i)))
        .collect()
}

#[tokio::test]
async fn test_add_and_remove_every_type() {
    let harness = TestHarness::new().await;

    let entities = vec![
        harness.save(Project::new("Inventory Service")).await,
        harness.save(Component::new("jackson-databind").with_group("com.fasterxml.jackson.core")).await,
        harness.save(ServiceComponent::new("payments-api").with_url("https://payments.example.com")).await,
        harness.save(License::new("Apache-2.0", "Apache License 2.0")).await,
        harness.save(Cpe::new("cpe:2.3:a:apache:commons-text:1.9:*:*:*:*:*:*:*")).await,
        harness
            .save(vulnerable_software("cpe:2.3:a:libexpat_project:libexpat:2.4.1:*:*:*:*:*:*:*"))
            .await,
    ];
    harness.commit().await;

    for entity in &entities {
        let hits = harness.uuid_hits(entity.index_type(), entity.uuid()).await;
        assert_eq!(hits, vec![entity.uuid()], "{} not found", entity.index_type());
    }

    for entity in &entities {
        assert_ok!(harness.registry.remove(entity).await);
    }
    harness.commit().await;

    for entity in &entities {
        let hits = harness.uuid_hits(entity.index_type(), entity.uuid()).await;
        assert!(hits.is_empty(), "{} still indexed", entity.index_type());
    }
}

#[tokio::test]
async fn test_component_found_by_name_token() {
    let harness = TestHarness::new().await;
    let component = harness
        .save(
            Component::new("crypto-library")
                .with_group("acme")
                .with_version("1.0.0"),
        )
        .await;
    harness.save(Component::new("image-decoder").with_group("acme")).await;
    harness.commit().await;

    let results = harness.search.search_component_index("crypto", 10).await.unwrap();
    assert_eq!(results.uuids(IndexType::Component), vec![component.uuid()]);

    let row = &results.get(IndexType::Component).unwrap()[0];
    assert_eq!(row.get("name").map(String::as_str), Some("crypto-library"));
    assert_eq!(row.get("group").map(String::as_str), Some("acme"));
    assert_eq!(row.get("version").map(String::as_str), Some("1.0.0"));
}

#[tokio::test]
async fn test_aggregate_search_limits_each_bucket() {
    let harness = TestHarness::new().await;
    for component in widgets(30) {
        harness.save(component).await;
    }
    for i in 0..30 {
        harness
            .save(License::new(format!("WIDGET-{}", i), format!("Widget License {}", i)))
            .await;
    }
    harness.save(Project::new("unrelated")).await;
    harness.commit().await;

    let results = harness.search.search_indices("widget", 5).await.unwrap();

    for index_type in IndexType::ALL {
        assert!(results.contains(index_type), "missing bucket {}", index_type);
    }
    assert_eq!(results.get(IndexType::Component).unwrap().len(), 5);
    assert_eq!(results.get(IndexType::License).unwrap().len(), 5);
    assert!(results.get(IndexType::Project).unwrap().is_empty());
    assert_eq!(results.total_hits(), 10);
}

#[tokio::test]
async fn test_blank_query_rejected() {
    let harness = TestHarness::new().await;

    let aggregate = harness.search.search_indices("   ", 10).await;
    assert!(matches!(aggregate, Err(SearchError::InvalidQuery(_))));

    let single = harness.search.search_license_index("", 10).await;
    assert!(matches!(single, Err(SearchError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_changes_visible_only_after_commit() {
    let harness = TestHarness::new().await;
    harness.save(Project::new("observatory")).await;

    let before = harness.search.search_project_index("observatory", 10).await.unwrap();
    assert!(before.get(IndexType::Project).unwrap().is_empty());

    harness.commit().await;

    let after = harness.search.search_project_index("observatory", 10).await.unwrap();
    assert_eq!(after.get(IndexType::Project).unwrap().len(), 1);
}

#[tokio::test]
async fn test_upsert_replaces_document() {
    let harness = TestHarness::new().await;
    let mut component = Component::new("alpha-parser");
    harness.save(component.clone()).await;
    harness.commit().await;

    component.name = "omega-parser".to_string();
    harness.save(component.clone()).await;
    harness.commit().await;

    assert_eq!(
        harness.uuid_hits(IndexType::Component, component.uuid).await,
        vec![component.uuid]
    );

    let renamed = harness.search.search_component_index("omega", 10).await.unwrap();
    assert_eq!(renamed.uuids(IndexType::Component), vec![component.uuid]);

    let stale = harness.search.search_component_index("alpha", 10).await.unwrap();
    assert!(stale.uuids(IndexType::Component).is_empty());
    assert_eq!(harness.registry.get(IndexType::Component).unwrap().num_docs(), 1);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let harness = TestHarness::with_batch_size(10).await;
    for component in widgets(25) {
        harness.store.insert(component);
    }

    let indexed = harness.registry.reindex(IndexType::Component, &*harness.store).await.unwrap();
    assert_eq!(indexed, 25);
    let mut first = harness
        .search
        .search_component_index("widget", 100)
        .await
        .unwrap()
        .uuids(IndexType::Component);
    first.sort();

    let indexed = harness.registry.reindex(IndexType::Component, &*harness.store).await.unwrap();
    assert_eq!(indexed, 25);
    let mut second = harness
        .search
        .search_component_index("widget", 100)
        .await
        .unwrap()
        .uuids(IndexType::Component);
    second.sort();

    assert_eq!(first.len(), 25);
    assert_eq!(first, second);
    assert_eq!(harness.registry.get(IndexType::Component).unwrap().num_docs(), 25);
}

#[tokio::test]
async fn test_reindex_drops_entities_removed_from_store() {
    let harness = TestHarness::new().await;
    let kept = harness.save(License::new("MIT", "MIT License")).await;
    let removed = harness.save(License::new("GPL-2.0", "GNU General Public License v2.0")).await;
    harness.commit().await;

    harness.store.remove(IndexType::License, &removed.uuid());
    harness.registry.reindex(IndexType::License, &*harness.store).await.unwrap();

    assert_eq!(harness.uuid_hits(IndexType::License, kept.uuid()).await, vec![kept.uuid()]);
    assert!(harness.uuid_hits(IndexType::License, removed.uuid()).await.is_empty());
}

#[tokio::test]
async fn test_failed_reindex_keeps_previous_index() {
    let harness = TestHarness::with_batch_size(10).await;
    for component in widgets(25) {
        harness.save(component).await;
    }
    harness.commit().await;

    let replacement = InMemoryStore::new();
    for i in 0..25 {
        replacement.insert(Component::new(format!("gadget {}", i)));
    }
    let failing = FailingStore::new(replacement, 1);

    let result = harness.registry.reindex(IndexType::Component, &failing).await;
    assert!(matches!(
        result,
        Err(SearchError::ReindexFailed {
            index: IndexType::Component,
            ..
        })
    ));

    let manager = harness.registry.get(IndexType::Component).unwrap();
    assert_eq!(manager.num_docs(), 25);
    let gadgets = harness.search.search_component_index("gadget", 100).await.unwrap();
    assert!(gadgets.uuids(IndexType::Component).is_empty());

    // writer is usable again after the rollback
    let late = harness.save(Component::new("late arrival")).await;
    harness.commit().await;
    assert_eq!(harness.uuid_hits(IndexType::Component, late.uuid()).await, vec![late.uuid()]);
    assert_eq!(manager.num_docs(), 26);
}

#[tokio::test]
async fn test_concurrent_reindex_rejected() {
    let harness = TestHarness::new().await;
    harness.save(Project::new("legacy")).await;
    harness.commit().await;

    let inner = InMemoryStore::new();
    inner.insert(Project::new("slow"));
    let gated = Arc::new(GatedStore::new(inner));

    let registry = harness.registry.clone();
    let store = gated.clone();
    let first = tokio::spawn(async move { registry.reindex(IndexType::Project, &*store).await });

    gated.started.notified().await;
    let second = harness.registry.reindex(IndexType::Project, &*gated).await;
    assert!(matches!(
        second,
        Err(SearchError::ReindexInProgress(IndexType::Project))
    ));

    // searches keep answering from the last commit while the rebuild runs
    let legacy = harness.search.search_project_index("legacy", 10).await.unwrap();
    assert_eq!(legacy.get(IndexType::Project).unwrap().len(), 1);
    let slow = harness.search.search_project_index("slow", 10).await.unwrap();
    assert!(slow.get(IndexType::Project).unwrap().is_empty());

    // other types are not blocked
    assert_ok!(harness.registry.reindex(IndexType::License, &*harness.store).await);

    gated.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), 1);

    let slow = harness.search.search_project_index("slow", 10).await.unwrap();
    assert_eq!(slow.get(IndexType::Project).unwrap().len(), 1);
    let legacy = harness.search.search_project_index("legacy", 10).await.unwrap();
    assert!(legacy.get(IndexType::Project).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_all_indexed() {
    let harness = TestHarness::new().await;

    let adds = widgets(20).into_iter().map(|component| {
        let registry = harness.registry.clone();
        tokio::spawn(async move { registry.add(&component.into()).await })
    });
    for added in join_all(adds).await {
        assert_ok!(added.unwrap());
    }
    harness.commit().await;

    assert_eq!(harness.registry.get(IndexType::Component).unwrap().num_docs(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_of_one_uuid_keep_one_document() {
    let harness = TestHarness::new().await;
    let component = Component::new("contended");

    let upserts = (0..20).map(|i| {
        let registry = harness.registry.clone();
        let mut renamed = component.clone();
        renamed.name = format!("contended {}", i);
        tokio::spawn(async move { registry.add(&renamed.into()).await })
    });
    for upserted in join_all(upserts).await {
        assert_ok!(upserted.unwrap());
    }
    harness.commit().await;

    assert_eq!(harness.registry.get(IndexType::Component).unwrap().num_docs(), 1);
    assert_eq!(
        harness.uuid_hits(IndexType::Component, component.uuid).await,
        vec![component.uuid]
    );
}

#[tokio::test]
async fn test_uuid_query_ignores_colliding_text_tokens() {
    let harness = TestHarness::new().await;
    let mut target = Component::new("target");
    target.uuid = Uuid::parse_str("1234abcd-4000-4000-8000-000000000001").unwrap();
    harness.save(target.clone()).await;
    harness.save(Component::new("release 4000")).await;
    harness.save(Project::new("1234abcd")).await;
    harness.commit().await;

    assert_eq!(
        harness.uuid_hits(IndexType::Component, target.uuid).await,
        vec![target.uuid]
    );
    assert!(harness.uuid_hits(IndexType::Project, target.uuid).await.is_empty());
}

#[tokio::test]
async fn test_zero_limit_returns_empty_buckets() {
    let harness = TestHarness::new().await;
    for component in widgets(3) {
        harness.save(component).await;
    }
    harness.commit().await;

    let results = harness.search.search_indices("widget", 0).await.unwrap();
    assert_eq!(results.total_hits(), 0);
    assert!(results.contains(IndexType::Component));
}

#[tokio::test]
async fn test_stats_report_committed_documents() {
    let harness = TestHarness::new().await;
    harness.save(Project::new("stats")).await;
    harness.commit().await;

    let stats = harness.registry.stats().unwrap();
    assert_eq!(stats.len(), IndexType::ALL.len());

    let project = stats
        .iter()
        .find(|s| s.index_type == IndexType::Project)
        .unwrap();
    assert_eq!(project.total_documents, 1);
    assert!(!project.dirty);
    assert!(project.last_commit.is_some());
}

#[tokio::test]
async fn test_unknown_uuid_has_no_hits() {
    let harness = TestHarness::new().await;
    harness.save(Project::new("present")).await;
    harness.commit().await;

    assert!(harness.uuid_hits(IndexType::Project, Uuid::new_v4()).await.is_empty());
}

#[tokio::test]
async fn test_ensure_indexes_rebuilds_empty_index() {
    let harness = TestHarness::new().await;
    for component in widgets(3) {
        harness.store.insert(component);
    }

    let rebuilt = ensure_indexes(&harness.registry, &*harness.store).await.unwrap();
    assert_eq!(rebuilt, vec![IndexType::Component]);
    assert_eq!(harness.registry.get(IndexType::Component).unwrap().num_docs(), 3);

    let reports = check_consistency(&harness.registry, &*harness.store, 20.0)
        .await
        .unwrap();
    assert!(reports.iter().all(|r| r.consistent));
    assert!(ensure_indexes(&harness.registry, &*harness.store)
        .await
        .unwrap()
        .is_empty());
}
