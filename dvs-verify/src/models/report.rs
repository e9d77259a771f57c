//! Verification reports: live, stored and paged

use super::evidence::Provenance;
use super::outcome::FieldOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Combined outcome of one verification request
///
/// Created once by the orchestrator and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub verification_id: String,
    pub timestamp: DateTime<Utc>,
    pub full_name: FieldOutcome<String>,
    pub specialty: FieldOutcome<String>,
    pub address: FieldOutcome<String>,
    pub phone_number: FieldOutcome<String>,
    pub license_number: FieldOutcome<String>,
    pub insurance_networks: FieldOutcome<Vec<String>>,
    pub services_offered: FieldOutcome<String, Vec<String>>,
}

// ============================================================================
// Stored form
// ============================================================================

/// Flat report row as persisted in `doctor_reports`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReport {
    pub report_id: String,
    pub verification_id: String,

    pub full_name_input: Option<String>,
    pub full_name_scraped: Option<String>,
    pub full_name_scraped_from: Option<String>,
    pub full_name_matches: Option<bool>,

    pub specialty_input: Option<String>,
    pub specialty_scraped: Option<String>,
    pub specialty_scraped_from: Option<String>,
    pub specialty_matches: Option<bool>,

    pub address_input: Option<String>,
    pub address_scraped: Option<String>,
    pub address_scraped_from: Option<String>,
    pub address_matches: Option<bool>,

    pub phone_number_input: Option<String>,
    pub phone_number_scraped: Option<String>,
    pub phone_number_scraped_from: Option<String>,
    pub phone_number_matches: Option<bool>,

    pub license_number_input: Option<String>,
    pub license_number_scraped: Option<String>,
    pub license_number_scraped_from: Option<String>,
    pub license_number_matches: Option<bool>,

    pub insurance_networks_input: Option<Vec<String>>,
    pub insurance_networks_scraped: Option<Vec<String>>,
    pub insurance_networks_scraped_from: Option<String>,
    pub insurance_networks_matches: Option<bool>,

    pub services_offered_input: Option<String>,
    pub services_offered_scraped: Option<Vec<String>>,
    pub services_offered_scraped_from: Option<String>,
    pub services_offered_matches: Option<bool>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn label(from: Option<Provenance>) -> Option<String> {
    from.map(|p| p.as_str().to_string())
}

impl StoredReport {
    /// Flatten a live report into its stored row
    pub fn from_report(report: &VerificationReport, report_id: String) -> Self {
        let r = report;
        Self {
            report_id,
            verification_id: r.verification_id.clone(),

            full_name_input: r.full_name.input_value().cloned(),
            full_name_scraped: r.full_name.observed_value().cloned(),
            full_name_scraped_from: label(r.full_name.observed_from()),
            full_name_matches: r.full_name.matches().as_option(),

            specialty_input: r.specialty.input_value().cloned(),
            specialty_scraped: r.specialty.observed_value().cloned(),
            specialty_scraped_from: label(r.specialty.observed_from()),
            specialty_matches: r.specialty.matches().as_option(),

            address_input: r.address.input_value().cloned(),
            address_scraped: r.address.observed_value().cloned(),
            address_scraped_from: label(r.address.observed_from()),
            address_matches: r.address.matches().as_option(),

            phone_number_input: r.phone_number.input_value().cloned(),
            phone_number_scraped: r.phone_number.observed_value().cloned(),
            phone_number_scraped_from: label(r.phone_number.observed_from()),
            phone_number_matches: r.phone_number.matches().as_option(),

            license_number_input: r.license_number.input_value().cloned(),
            license_number_scraped: r.license_number.observed_value().cloned(),
            license_number_scraped_from: label(r.license_number.observed_from()),
            license_number_matches: r.license_number.matches().as_option(),

            insurance_networks_input: r.insurance_networks.input_value().cloned(),
            insurance_networks_scraped: r.insurance_networks.observed_value().cloned(),
            insurance_networks_scraped_from: label(r.insurance_networks.observed_from()),
            insurance_networks_matches: r.insurance_networks.matches().as_option(),

            services_offered_input: r.services_offered.input_value().cloned(),
            services_offered_scraped: r.services_offered.observed_value().cloned(),
            services_offered_scraped_from: label(r.services_offered.observed_from()),
            services_offered_matches: r.services_offered.matches().as_option(),

            created_at: r.timestamp,
            updated_at: r.timestamp,
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Specialty,
    #[default]
    CreatedAt,
}

impl SortField {
    /// Column the listing query orders by
    pub fn column(self) -> &'static str {
        match self {
            SortField::Name => "full_name_input",
            SortField::Specialty => "specialty_input",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for report listing
#[derive(Debug, Clone, Deserialize)]
pub struct ReportQuery {
    /// Partial, case-insensitive match on claimed or observed name
    pub name: Option<String>,
    /// Partial, case-insensitive match on claimed or observed specialty
    pub specialty: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            name: None,
            specialty: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ReportQuery {
    /// Offset clamped to be non-negative
    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    /// Page size clamped to `1..=MAX_PAGE_LIMIT`
    pub fn page_size(&self) -> i64 {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    /// Trimmed name filter, if any
    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Trimmed specialty filter, if any
    pub fn specialty_filter(&self) -> Option<&str> {
        self.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One page of stored reports
#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    pub reports: Vec<StoredReport>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl ReportPage {
    pub fn new(reports: Vec<StoredReport>, total_count: i64, skip: i64, limit: i64) -> Self {
        let has_next = skip + (reports.len() as i64) < total_count;
        Self {
            reports,
            total_count,
            skip,
            limit,
            has_next,
            has_previous: skip > 0,
        }
    }
}
