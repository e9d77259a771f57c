//! Claimed identity: the attribute values submitted for verification

use serde::{Deserialize, Serialize};
use thiserror::Error;

const FULL_NAME_MAX: usize = 100;
const SPECIALTY_MAX: usize = 50;
const ADDRESS_MAX: usize = 200;
const LICENSE_MAX: usize = 50;
const SERVICES_MAX: usize = 500;

/// Input validation failure, reported before reconciliation runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {constraint}")]
pub struct ValidationError {
    /// Request field name as the caller spelled it
    pub field: &'static str,
    /// Human readable description of the violated constraint
    pub constraint: String,
}

impl ValidationError {
    fn new(field: &'static str, constraint: impl Into<String>) -> Self {
        Self {
            field,
            constraint: constraint.into(),
        }
    }
}

/// Verification request body as received over HTTP
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub full_name: String,
    pub specialty: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub insurance_networks: Option<Vec<String>>,
    #[serde(default)]
    pub services_offered: Option<String>,
}

/// Validated claimed identity
///
/// `full_name` always holds at least two whitespace separated tokens.
/// Optional fields are `None` when the caller left them out or blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedIdentity {
    pub full_name: String,
    pub specialty: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub license_number: Option<String>,
    pub insurance_networks: Vec<String>,
    pub services_offered: Option<String>,
}

impl TryFrom<VerificationRequest> for ClaimedIdentity {
    type Error = ValidationError;

    fn try_from(req: VerificationRequest) -> Result<Self, Self::Error> {
        let full_name = req.full_name.trim().to_string();
        check_length("fullName", &full_name, 2, FULL_NAME_MAX)?;
        if full_name.split_whitespace().count() < 2 {
            return Err(ValidationError::new(
                "fullName",
                "must contain at least first and last name",
            ));
        }

        let specialty = req.specialty.trim().to_string();
        check_length("specialty", &specialty, 2, SPECIALTY_MAX)?;

        let address = optional_text("address", req.address, ADDRESS_MAX)?;
        let license_number = optional_text("licenseNumber", req.license_number, LICENSE_MAX)?;
        let services_offered = optional_text("servicesOffered", req.services_offered, SERVICES_MAX)?;

        let phone_number = blank_to_none(req.phone_number);
        if let Some(phone) = &phone_number {
            validate_phone(phone)?;
        }

        let mut insurance_networks: Vec<String> = Vec::new();
        for network in req.insurance_networks.unwrap_or_default() {
            let network = network.trim();
            if !network.is_empty() && !insurance_networks.iter().any(|n| n == network) {
                insurance_networks.push(network.to_string());
            }
        }

        Ok(Self {
            full_name,
            specialty,
            address,
            phone_number,
            license_number,
            insurance_networks,
            services_offered,
        })
    }
}

/// Phone strings may only contain digits plus `-`, `(`, `)`, spaces and `+`
fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let stripped: String = phone
        .chars()
        .filter(|c| !matches!(c, '-' | '(' | ')' | ' ' | '+'))
        .collect();

    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("phoneNumber", "invalid phone number format"));
    }

    Ok(())
}

fn check_length(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::new(field, format!("must be at least {} characters", min)));
    }
    if len > max {
        return Err(ValidationError::new(field, format!("must be at most {} characters", max)));
    }
    Ok(())
}

fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match blank_to_none(value) {
        Some(text) => {
            check_length(field, &text, 1, max)?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
