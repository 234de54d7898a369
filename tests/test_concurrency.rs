//! Concurrent ingestion against one release must not duplicate findings

mod common;

use std::sync::Arc;

use vigil::application::{IngestRequest, IngestScanUseCase};
use vigil::domain::finding::FindingStatus;
use vigil::domain::repositories::{FindingFilter, IFindingRepository};
use vigil::infrastructure::repositories::InMemoryStore;

use common::{ingest_use_case, seed_release, trivy_payload};

#[tokio::test]
async fn concurrent_identical_uploads_yield_one_finding_set() {
    let store = Arc::new(InMemoryStore::new());
    let release_id = seed_release(&store).await;
    let ingest = Arc::new(ingest_use_case(store.clone()));

    let payload = trivy_payload(&[
        ("CVE-2024-0001", "lodash"),
        ("CVE-2024-0002", "axios"),
        ("CVE-2024-0003", "minimist"),
    ]);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ingest: Arc<IngestScanUseCase> = Arc::clone(&ingest);
        let payload = payload.clone();
        tasks.push(tokio::spawn(async move {
            ingest
                .execute(IngestRequest::new(release_id, "trivy", payload))
                .await
        }));
    }

    let mut created = 0;
    let mut updated = 0;
    for task in tasks {
        let summary = task.await.unwrap().unwrap();
        created += summary.counters.created;
        updated += summary.counters.updated;
        // Identical snapshots never fix anything
        assert_eq!(summary.counters.fixed, 0);
    }

    // Each fingerprint is created exactly once across all uploads
    assert_eq!(created, 3);
    assert_eq!(updated, 7 * 3);

    let findings = store
        .list(&FindingFilter::for_release(release_id))
        .await
        .unwrap();
    assert_eq!(findings.len(), 3);
    assert!(findings.iter().all(|f| f.status == FindingStatus::Active));
}

#[tokio::test]
async fn concurrent_uploads_to_different_releases_do_not_interfere() {
    let store = Arc::new(InMemoryStore::new());
    let release_a = seed_release(&store).await;
    let release_b = seed_release(&store).await;
    let ingest = Arc::new(ingest_use_case(store.clone()));

    let payload = trivy_payload(&[("CVE-2024-0001", "lodash")]);
    let (a, b) = tokio::join!(
        ingest.execute(IngestRequest::new(release_a, "trivy", payload.clone())),
        ingest.execute(IngestRequest::new(release_b, "trivy", payload)),
    );
    assert_eq!(a.unwrap().counters.created, 1);
    assert_eq!(b.unwrap().counters.created, 1);

    // Dedup scope is the release: same fingerprint, two rows
    let a_findings = store
        .list(&FindingFilter::for_release(release_a))
        .await
        .unwrap();
    let b_findings = store
        .list(&FindingFilter::for_release(release_b))
        .await
        .unwrap();
    assert_eq!(a_findings.len(), 1);
    assert_eq!(b_findings.len(), 1);
    assert_eq!(a_findings[0].fingerprint, b_findings[0].fingerprint);
}

#[tokio::test]
async fn store_rejects_racing_insert_of_same_fingerprint() {
    use chrono::Utc;
    use uuid::Uuid;
    use vigil::domain::finding::{Finding, FindingCategory, NormalizedFinding, Severity};
    use vigil::domain::repositories::StoreError;

    let store = Arc::new(InMemoryStore::new());
    let release_id = Uuid::new_v4();
    let normalized = NormalizedFinding {
        category: FindingCategory::Sca,
        title: "race".to_string(),
        description: String::new(),
        severity: Severity::High,
        vulnerability_id: Some("CVE-2024-7777".to_string()),
        package_name: Some("lodash".to_string()),
        package_version: None,
        package_ecosystem: Some("npm".to_string()),
        fix_version: None,
        rule_id: None,
        location: None,
        line_number: None,
    };

    let a = Finding::from_observation(
        release_id,
        Uuid::new_v4(),
        "trivy",
        normalized.clone(),
        Utc::now(),
    );
    let b = Finding::from_observation(release_id, Uuid::new_v4(), "trivy", normalized, Utc::now());

    let (first, second) = tokio::join!(
        IFindingRepository::insert(store.as_ref(), a),
        IFindingRepository::insert(store.as_ref(), b),
    );
    let failures = [first, second]
        .into_iter()
        .filter(|r| matches!(r, Err(StoreError::FingerprintConflict { .. })))
        .count();
    assert_eq!(failures, 1);
}
