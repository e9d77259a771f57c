//! Report store tests: insert, lookup, filtering, sorting and paging

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use dvs_common::config::MatchingConfig;
use dvs_common::Error;
use dvs_verify::db::{get_report, insert_report, list_reports};
use dvs_verify::models::{
    ClaimedIdentity, EvidenceFragment, ExternalEvidence, Provenance, ReportQuery, SortField,
    SortOrder, VerificationReport,
};
use dvs_verify::reconcile::reconcile_at;
use dvs_verify::services::npi_registry::parse_registry_response;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    dvs_common::db::create_tables(&pool).await.unwrap();
    pool
}

fn registry_evidence() -> ExternalEvidence {
    let body: Value = serde_json::from_str(include_str!("fixtures/npi_response.json")).unwrap();
    let mut evidence = ExternalEvidence::new();
    evidence.absorb(
        Provenance::Registry,
        EvidenceFragment {
            candidates: parse_registry_response(body).unwrap(),
            ..Default::default()
        },
    );
    evidence
}

fn claim(name: &str, specialty: &str) -> ClaimedIdentity {
    ClaimedIdentity {
        full_name: name.to_string(),
        specialty: specialty.to_string(),
        address: None,
        phone_number: Some("212-555-0199".to_string()),
        license_number: None,
        insurance_networks: vec!["Aetna".to_string(), "Cigna".to_string()],
        services_offered: None,
    }
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

fn report(name: &str, specialty: &str, minute: u32) -> VerificationReport {
    reconcile_at(
        &claim(name, specialty),
        &ExternalEvidence::new(),
        &MatchingConfig::default(),
        at(minute),
    )
}

async fn seed(pool: &SqlitePool) -> Vec<VerificationReport> {
    let reports = vec![
        report("John Smith", "Cardiology", 0),
        report("alice Brown", "Dermatology", 1),
        report("Zoe Carter", "Family Medicine", 2),
    ];
    for r in &reports {
        insert_report(pool, r).await.unwrap();
    }
    reports
}

fn names(page: &dvs_verify::models::ReportPage) -> Vec<String> {
    page.reports
        .iter()
        .filter_map(|r| r.full_name_input.clone())
        .collect()
}

#[tokio::test]
async fn test_insert_then_get_round_trips() {
    let pool = test_pool().await;
    let live = reconcile_at(
        &claim("John Smith", "Internal Medicine"),
        &registry_evidence(),
        &MatchingConfig::default(),
        at(0),
    );

    let stored = insert_report(&pool, &live).await.unwrap();
    assert_eq!(stored.verification_id, live.verification_id);

    let fetched = get_report(&pool, &live.verification_id).await.unwrap().unwrap();
    assert_eq!(fetched, stored);
    assert_eq!(fetched.full_name_scraped.as_deref(), Some("JOHN SMITH"));
    assert_eq!(fetched.full_name_scraped_from.as_deref(), Some("Registry"));
    assert_eq!(fetched.phone_number_matches, Some(true));
    assert_eq!(
        fetched.insurance_networks_input,
        Some(vec!["Aetna".to_string(), "Cigna".to_string()])
    );
    assert_eq!(
        fetched.insurance_networks_scraped,
        Some(vec!["Medicaid".to_string(), "Aetna".to_string()])
    );
    assert_eq!(fetched.address_input, None);
    assert_eq!(fetched.address_matches, None);
    assert_eq!(fetched.created_at, at(0));
}

#[tokio::test]
async fn test_get_unknown_is_none() {
    let pool = test_pool().await;
    assert!(get_report(&pool, "VER_missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_verification_id_conflicts() {
    let pool = test_pool().await;
    let live = report("John Smith", "Cardiology", 0);

    insert_report(&pool, &live).await.unwrap();
    let err = insert_report(&pool, &live).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "unexpected error {:?}", err);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctor_reports")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_default_listing_is_newest_first() {
    let pool = test_pool().await;
    seed(&pool).await;

    let page = list_reports(&pool, &ReportQuery::default()).await.unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(names(&page), vec!["Zoe Carter", "alice Brown", "John Smith"]);
    assert!(!page.has_next);
    assert!(!page.has_previous);
}

#[tokio::test]
async fn test_sort_by_name_ignores_case() {
    let pool = test_pool().await;
    seed(&pool).await;

    let query = ReportQuery {
        sort_by: SortField::Name,
        sort_order: SortOrder::Asc,
        ..Default::default()
    };
    let page = list_reports(&pool, &query).await.unwrap();
    assert_eq!(names(&page), vec!["alice Brown", "John Smith", "Zoe Carter"]);

    let query = ReportQuery {
        sort_by: SortField::Specialty,
        sort_order: SortOrder::Desc,
        ..Default::default()
    };
    let page = list_reports(&pool, &query).await.unwrap();
    assert_eq!(names(&page), vec!["Zoe Carter", "alice Brown", "John Smith"]);
}

#[tokio::test]
async fn test_filters_are_partial_and_case_insensitive() {
    let pool = test_pool().await;
    seed(&pool).await;

    let query = ReportQuery {
        name: Some("SMI".to_string()),
        ..Default::default()
    };
    let page = list_reports(&pool, &query).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(names(&page), vec!["John Smith"]);

    let query = ReportQuery {
        specialty: Some("medicine".to_string()),
        ..Default::default()
    };
    let page = list_reports(&pool, &query).await.unwrap();
    assert_eq!(names(&page), vec!["Zoe Carter"]);

    let query = ReportQuery {
        name: Some("%".to_string()),
        ..Default::default()
    };
    assert_eq!(list_reports(&pool, &query).await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_name_filter_checks_observed_value() {
    let pool = test_pool().await;
    let live = reconcile_at(
        &claim("Johnny Smith", "Internal Medicine"),
        &registry_evidence(),
        &MatchingConfig::default(),
        at(5),
    );
    insert_report(&pool, &live).await.unwrap();

    let query = ReportQuery {
        name: Some("john smith".to_string()),
        ..Default::default()
    };
    let page = list_reports(&pool, &query).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.reports[0].full_name_input.as_deref(), Some("Johnny Smith"));
    assert_eq!(page.reports[0].full_name_scraped.as_deref(), Some("JOHN SMITH"));
}

#[tokio::test]
async fn test_pagination_flags() {
    let pool = test_pool().await;
    seed(&pool).await;

    let first = list_reports(
        &pool,
        &ReportQuery {
            limit: 2,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(first.reports.len(), 2);
    assert_eq!(first.total_count, 3);
    assert!(first.has_next);
    assert!(!first.has_previous);

    let second = list_reports(
        &pool,
        &ReportQuery {
            skip: 2,
            limit: 2,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(names(&second), vec!["John Smith"]);
    assert!(!second.has_next);
    assert!(second.has_previous);
}
