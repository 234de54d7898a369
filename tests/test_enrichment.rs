//! Enrichment pipeline against mocked EPSS and KEV endpoints

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil::application::{EnrichFindingsUseCase, IngestRequest};
use vigil::config::EnrichmentConfig;
use vigil::domain::repositories::{FindingFilter, IFindingRepository};
use vigil::infrastructure::feeds::epss::HttpEpssFeed;
use vigil::infrastructure::feeds::kev::HttpKevCatalog;
use vigil::infrastructure::repositories::InMemoryStore;

use common::{ingest_use_case, seed_release, trivy_payload};

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

const EPSS_CSV: &str = "#model_version:v2023.03.01,score_date:2024-06-01\n\
cve,epss,percentile\n\
CVE-2024-0001,0.94321,0.99012\n\
CVE-2024-0002,0.00042,0.05123\n";

const KEV_JSON: &str = r#"{
    "vulnerabilities": [
        {"cveID": "CVE-2024-0001", "dateAdded": "2023-05-12", "vulnerabilityName": "Lodash RCE"}
    ]
}"#;

async fn mount_feeds(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/epss"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(EPSS_CSV)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kev"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEV_JSON))
        .mount(server)
        .await;
}

fn enrichment(store: Arc<InMemoryStore>, server: &MockServer) -> EnrichFindingsUseCase {
    let timeout = Duration::from_secs(5);
    EnrichFindingsUseCase::new(
        store,
        Arc::new(HttpEpssFeed::new(&format!("{}/epss", server.uri()), timeout).unwrap()),
        Arc::new(HttpKevCatalog::new(&format!("{}/kev", server.uri()), timeout).unwrap()),
        EnrichmentConfig::default(),
    )
}

#[tokio::test]
async fn enrichment_applies_scores_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_feeds(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let release_id = seed_release(&store).await;
    ingest_use_case(store.clone())
        .execute(IngestRequest::new(
            release_id,
            "trivy",
            trivy_payload(&[
                ("CVE-2024-0001", "lodash"),
                ("CVE-2024-0002", "axios"),
                ("CVE-2024-0003", "minimist"),
            ]),
        ))
        .await
        .unwrap();

    let enrich = enrichment(store.clone(), &server);
    let summary = enrich.execute().await.unwrap();
    assert!(summary.epss_available);
    assert!(summary.kev_available);
    assert_eq!(summary.examined, 3);
    assert_eq!(summary.updated, 2);

    let findings = store
        .list(&FindingFilter::for_release(release_id))
        .await
        .unwrap();
    let by_cve = |cve: &str| {
        findings
            .iter()
            .find(|f| f.vulnerability_id.as_deref() == Some(cve))
            .unwrap()
    };

    let listed = by_cve("CVE-2024-0001");
    assert_eq!(listed.epss_score, Some(0.94321));
    assert_eq!(listed.epss_percentile, Some(0.99012));
    assert!(listed.kev_status);
    assert_eq!(
        listed.kev_date,
        NaiveDate::from_ymd_opt(2023, 5, 12)
    );
    assert!(listed.enriched_at.is_some());
    // HIGH weight 7.5, times (1 + epss), plus the KEV bonus
    assert!(listed.risk_score > 7.5 + 2.0);

    let scored = by_cve("CVE-2024-0002");
    assert_eq!(scored.epss_score, Some(0.00042));
    assert!(!scored.kev_status);

    let unknown = by_cve("CVE-2024-0003");
    assert_eq!(unknown.epss_score, None);
    assert!(!unknown.kev_status);

    // Same feeds again: nothing changes
    let summary = enrich.execute().await.unwrap();
    assert_eq!(summary.examined, 3);
    assert_eq!(summary.updated, 0);
}

#[tokio::test]
async fn delisted_cve_loses_its_intel() {
    let server = MockServer::start().await;
    mount_feeds(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let release_id = seed_release(&store).await;
    ingest_use_case(store.clone())
        .execute(IngestRequest::new(
            release_id,
            "trivy",
            trivy_payload(&[("CVE-2024-0001", "lodash")]),
        ))
        .await
        .unwrap();

    enrichment(store.clone(), &server)
        .execute()
        .await
        .unwrap();

    // The next snapshot no longer lists the CVE
    let empty = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/epss"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(gzip("cve,epss,percentile\n")),
        )
        .mount(&empty)
        .await;
    Mock::given(method("GET"))
        .and(path("/kev"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"vulnerabilities": []}"#))
        .mount(&empty)
        .await;

    let summary = enrichment(store.clone(), &empty).execute().await.unwrap();
    assert_eq!(summary.updated, 1);

    let finding = store
        .list(&FindingFilter::for_release(release_id))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(finding.epss_score, None);
    assert!(!finding.kev_status);
    assert_eq!(finding.kev_date, None);
}

#[tokio::test]
async fn failed_feed_preserves_previous_intel() {
    let server = MockServer::start().await;
    mount_feeds(&server).await;

    let store = Arc::new(InMemoryStore::new());
    let release_id = seed_release(&store).await;
    ingest_use_case(store.clone())
        .execute(IngestRequest::new(
            release_id,
            "trivy",
            trivy_payload(&[("CVE-2024-0001", "lodash")]),
        ))
        .await
        .unwrap();

    enrichment(store.clone(), &server)
        .execute()
        .await
        .unwrap();

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/epss"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&broken)
        .await;
    Mock::given(method("GET"))
        .and(path("/kev"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEV_JSON))
        .mount(&broken)
        .await;

    let summary = enrichment(store.clone(), &broken).execute().await.unwrap();
    assert!(!summary.epss_available);
    assert!(summary.kev_available);
    assert_eq!(summary.updated, 0);

    let finding = store
        .list(&FindingFilter::for_release(release_id))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(finding.epss_score, Some(0.94321));
    assert!(finding.kev_status);
}

#[tokio::test]
async fn both_feeds_down_is_a_quiet_no_op() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&broken)
        .await;

    let store = Arc::new(InMemoryStore::new());
    let summary = enrichment(store, &broken).execute().await.unwrap();
    assert!(!summary.epss_available);
    assert!(!summary.kev_available);
    assert_eq!(summary.examined, 0);
}
