//! Reference catalogs served read-only to clients

/// Medical specialties offered for selection
pub const SPECIALTIES: &[&str] = &[
    "Allergy and Immunology",
    "Anesthesiology",
    "Cardiology",
    "Dermatology",
    "Emergency Medicine",
    "Endocrinology",
    "Family Medicine",
    "Gastroenterology",
    "General Surgery",
    "Geriatric Medicine",
    "Hematology",
    "Infectious Disease",
    "Internal Medicine",
    "Nephrology",
    "Neurology",
    "Obstetrics and Gynecology",
    "Oncology",
    "Ophthalmology",
    "Orthopedic Surgery",
    "Otolaryngology (ENT)",
    "Pathology",
    "Pediatrics",
    "Physical Medicine and Rehabilitation",
    "Plastic Surgery",
    "Psychiatry",
    "Pulmonology",
    "Radiology",
    "Rheumatology",
    "Sports Medicine",
    "Urology",
    "Vascular Surgery",
];

/// Insurance networks offered for selection
pub const INSURANCE_NETWORKS: &[&str] = &[
    "Aetna",
    "Anthem Blue Cross",
    "Blue Cross Blue Shield",
    "Cigna",
    "Humana",
    "Kaiser Permanente",
    "Medicare",
    "Medicaid",
    "UnitedHealthcare",
    "Oscar Health",
    "Molina Healthcare",
    "Centene",
    "WellCare",
    "Magellan Health",
    "Tricare",
];

/// Search key for a catalog entry: lowercase, parenthesized abbreviation dropped
pub fn search_key(entry: &str) -> String {
    entry
        .split('(')
        .next()
        .unwrap_or(entry)
        .trim()
        .to_lowercase()
}
