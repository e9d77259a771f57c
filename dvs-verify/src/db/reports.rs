//! Report persistence
//!
//! Stores each [`VerificationReport`] as one flat `doctor_reports` row in a
//! single transaction and serves it back for lookup and paged listing.

use crate::models::{ReportPage, ReportQuery, StoredReport, VerificationReport};
use crate::utils::begin_monitored;
use dvs_common::time::{from_storage, to_storage};
use dvs_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

const COLUMNS: &str = "report_id, verification_id, \
    full_name_input, full_name_scraped, full_name_scraped_from, full_name_matches, \
    specialty_input, specialty_scraped, specialty_scraped_from, specialty_matches, \
    address_input, address_scraped, address_scraped_from, address_matches, \
    phone_number_input, phone_number_scraped, phone_number_scraped_from, phone_number_matches, \
    license_number_input, license_number_scraped, license_number_scraped_from, license_number_matches, \
    insurance_networks_input, insurance_networks_scraped, insurance_networks_scraped_from, insurance_networks_matches, \
    services_offered_input, services_offered_scraped, services_offered_scraped_from, services_offered_matches, \
    created_at, updated_at";

/// Raw row; list-valued columns hold JSON text
#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    report_id: String,
    verification_id: String,
    full_name_input: Option<String>,
    full_name_scraped: Option<String>,
    full_name_scraped_from: Option<String>,
    full_name_matches: Option<bool>,
    specialty_input: Option<String>,
    specialty_scraped: Option<String>,
    specialty_scraped_from: Option<String>,
    specialty_matches: Option<bool>,
    address_input: Option<String>,
    address_scraped: Option<String>,
    address_scraped_from: Option<String>,
    address_matches: Option<bool>,
    phone_number_input: Option<String>,
    phone_number_scraped: Option<String>,
    phone_number_scraped_from: Option<String>,
    phone_number_matches: Option<bool>,
    license_number_input: Option<String>,
    license_number_scraped: Option<String>,
    license_number_scraped_from: Option<String>,
    license_number_matches: Option<bool>,
    insurance_networks_input: Option<String>,
    insurance_networks_scraped: Option<String>,
    insurance_networks_scraped_from: Option<String>,
    insurance_networks_matches: Option<bool>,
    services_offered_input: Option<String>,
    services_offered_scraped: Option<String>,
    services_offered_scraped_from: Option<String>,
    services_offered_matches: Option<bool>,
    created_at: String,
    updated_at: String,
}

fn encode_list(list: &Option<Vec<String>>) -> Result<Option<String>> {
    list.as_ref()
        .map(|l| serde_json::to_string(l).map_err(|e| Error::Internal(format!("Encode list: {}", e))))
        .transpose()
}

fn decode_list(column: &str, text: Option<String>) -> Result<Option<Vec<String>>> {
    text.map(|t| {
        serde_json::from_str(&t).map_err(|e| Error::Internal(format!("Corrupt {} column: {}", column, e)))
    })
    .transpose()
}

impl TryFrom<ReportRow> for StoredReport {
    type Error = Error;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(StoredReport {
            report_id: row.report_id,
            verification_id: row.verification_id,
            full_name_input: row.full_name_input,
            full_name_scraped: row.full_name_scraped,
            full_name_scraped_from: row.full_name_scraped_from,
            full_name_matches: row.full_name_matches,
            specialty_input: row.specialty_input,
            specialty_scraped: row.specialty_scraped,
            specialty_scraped_from: row.specialty_scraped_from,
            specialty_matches: row.specialty_matches,
            address_input: row.address_input,
            address_scraped: row.address_scraped,
            address_scraped_from: row.address_scraped_from,
            address_matches: row.address_matches,
            phone_number_input: row.phone_number_input,
            phone_number_scraped: row.phone_number_scraped,
            phone_number_scraped_from: row.phone_number_scraped_from,
            phone_number_matches: row.phone_number_matches,
            license_number_input: row.license_number_input,
            license_number_scraped: row.license_number_scraped,
            license_number_scraped_from: row.license_number_scraped_from,
            license_number_matches: row.license_number_matches,
            insurance_networks_input: decode_list("insurance_networks_input", row.insurance_networks_input)?,
            insurance_networks_scraped: decode_list(
                "insurance_networks_scraped",
                row.insurance_networks_scraped,
            )?,
            insurance_networks_scraped_from: row.insurance_networks_scraped_from,
            insurance_networks_matches: row.insurance_networks_matches,
            services_offered_input: row.services_offered_input,
            services_offered_scraped: decode_list("services_offered_scraped", row.services_offered_scraped)?,
            services_offered_scraped_from: row.services_offered_scraped_from,
            services_offered_matches: row.services_offered_matches,
            created_at: from_storage(&row.created_at)?,
            updated_at: from_storage(&row.updated_at)?,
        })
    }
}

/// Persist a report in one transaction
///
/// A duplicate verification identifier yields [`Error::Conflict`] and
/// leaves the table untouched.
pub async fn insert_report(pool: &SqlitePool, report: &VerificationReport) -> Result<StoredReport> {
    let stored = StoredReport::from_report(report, Uuid::new_v4().to_string());
    let s = &stored;

    let placeholders = vec!["?"; 32].join(", ");
    let sql = format!("INSERT INTO doctor_reports ({}) VALUES ({})", COLUMNS, placeholders);

    let mut tx = begin_monitored(pool, "reports::insert_report").await?;
    sqlx::query(&sql)
        .bind(&s.report_id)
        .bind(&s.verification_id)
        .bind(&s.full_name_input)
        .bind(&s.full_name_scraped)
        .bind(&s.full_name_scraped_from)
        .bind(s.full_name_matches)
        .bind(&s.specialty_input)
        .bind(&s.specialty_scraped)
        .bind(&s.specialty_scraped_from)
        .bind(s.specialty_matches)
        .bind(&s.address_input)
        .bind(&s.address_scraped)
        .bind(&s.address_scraped_from)
        .bind(s.address_matches)
        .bind(&s.phone_number_input)
        .bind(&s.phone_number_scraped)
        .bind(&s.phone_number_scraped_from)
        .bind(s.phone_number_matches)
        .bind(&s.license_number_input)
        .bind(&s.license_number_scraped)
        .bind(&s.license_number_scraped_from)
        .bind(s.license_number_matches)
        .bind(encode_list(&s.insurance_networks_input)?)
        .bind(encode_list(&s.insurance_networks_scraped)?)
        .bind(&s.insurance_networks_scraped_from)
        .bind(s.insurance_networks_matches)
        .bind(&s.services_offered_input)
        .bind(encode_list(&s.services_offered_scraped)?)
        .bind(&s.services_offered_scraped_from)
        .bind(s.services_offered_matches)
        .bind(to_storage(&s.created_at))
        .bind(to_storage(&s.updated_at))
        .execute(tx.conn()?)
        .await
        .map_err(|e| Error::from_write(e, format!("verification id {} already stored", s.verification_id)))?;
    tx.commit().await?;

    info!(
        verification_id = %stored.verification_id,
        report_id = %stored.report_id,
        "Stored verification report"
    );

    Ok(stored)
}

/// Look up one report by verification identifier
pub async fn get_report(pool: &SqlitePool, verification_id: &str) -> Result<Option<StoredReport>> {
    let sql = format!("SELECT {} FROM doctor_reports WHERE verification_id = ?", COLUMNS);
    let row: Option<ReportRow> = sqlx::query_as(&sql)
        .bind(verification_id)
        .fetch_optional(pool)
        .await?;

    row.map(StoredReport::try_from).transpose()
}

/// `%term%` LIKE pattern with wildcards in `term` escaped
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Filtered, sorted page of stored reports
pub async fn list_reports(pool: &SqlitePool, query: &ReportQuery) -> Result<ReportPage> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(name) = query.name_filter() {
        clauses.push(
            "(LOWER(full_name_input) LIKE ? ESCAPE '\\' OR LOWER(full_name_scraped) LIKE ? ESCAPE '\\')",
        );
        let pattern = like_pattern(name);
        binds.push(pattern.clone());
        binds.push(pattern);
    }
    if let Some(specialty) = query.specialty_filter() {
        clauses.push(
            "(LOWER(specialty_input) LIKE ? ESCAPE '\\' OR LOWER(specialty_scraped) LIKE ? ESCAPE '\\')",
        );
        let pattern = like_pattern(specialty);
        binds.push(pattern.clone());
        binds.push(pattern);
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM doctor_reports {}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for bind in &binds {
        count_query = count_query.bind(bind);
    }
    let total_count = count_query.fetch_one(pool).await?;

    let (skip, limit) = (query.offset(), query.page_size());
    let list_sql = format!(
        "SELECT {} FROM doctor_reports {} ORDER BY {} COLLATE NOCASE {}, report_id LIMIT ? OFFSET ?",
        COLUMNS,
        where_sql,
        query.sort_by.column(),
        query.sort_order.sql()
    );

    let mut list_query = sqlx::query_as::<_, ReportRow>(&list_sql);
    for bind in &binds {
        list_query = list_query.bind(bind);
    }
    let rows = list_query.bind(limit).bind(skip).fetch_all(pool).await?;

    let reports = rows
        .into_iter()
        .map(StoredReport::try_from)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        total_count,
        returned = reports.len(),
        skip,
        limit,
        sort_by = query.sort_by.column(),
        "Listed reports"
    );

    Ok(ReportPage::new(reports, total_count, skip, limit))
}
