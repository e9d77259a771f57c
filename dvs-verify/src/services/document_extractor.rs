//! Document field extraction
//!
//! Recovers text from an uploaded document (literal text-show strings of a
//! PDF, with FlateDecode streams inflated first, or plain UTF-8), then
//! applies field patterns to guess
//! the claimed-identity values. Every field is always present in the result;
//! fields that could not be found are empty strings.

use std::io::{Cursor, Read};

use super::catalog::{search_key, INSURANCE_NETWORKS, SPECIALTIES};
use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

const PDF_MAGIC: &[u8] = b"%PDF";
const STREAM: &[u8] = b"stream";
const ENDSTREAM: &[u8] = b"endstream";

/// Upper bound on the inflated size of a single content stream
const MAX_INFLATED_BYTES: u64 = 16 * 1024 * 1024;

/// Document extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document is empty")]
    Empty,

    /// Neither a PDF nor UTF-8 text
    #[error("Unsupported document format")]
    UnsupportedFormat,
}

/// Best-guess field values, serialized with the request field names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub full_name: String,
    pub specialty: String,
    pub address: String,
    pub phone_number: String,
    pub license_number: String,
    pub npi_number: String,
    pub insurance_networks: String,
    pub services_offered: String,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extraction patterns are valid")
}

// PDF content operators
static SHOW_TEXT: Lazy<Regex> = Lazy::new(|| regex(r"\(((?:[^()\\]|\\.)*)\)\s*Tj"));
static SHOW_ARRAY: Lazy<Regex> = Lazy::new(|| regex(r"\[((?:[^\]\\]|\\.)*)\]\s*TJ"));
static ARRAY_STRING: Lazy<Regex> = Lazy::new(|| regex(r"\(((?:[^()\\]|\\.)*)\)"));

// Field patterns
static NAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?im)^\s*(?:full\s+name|name|doctor|physician|provider)\s*[:\-]\s*(?:dr\.?\s+)?(.+?)\s*$")
});
static NAME_TITLE: Lazy<Regex> =
    Lazy::new(|| regex(r"\bDr\.?\s+([A-Z][a-zA-Z'\-]+(?:\s+[A-Z]\.)?(?:\s+[A-Z][a-zA-Z'\-]+)+)"));
static SPECIALTY_LABEL: Lazy<Regex> =
    Lazy::new(|| regex(r"(?im)^\s*(?:specialty|speciality|specialization)\s*[:\-]\s*(.+?)\s*$"));
static ADDRESS_LABEL: Lazy<Regex> =
    Lazy::new(|| regex(r"(?im)^\s*(?:practice\s+)?address\s*[:\-]\s*(.+?)\s*$"));
static STREET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    regex(
        r"(?i)\b\d+\s+[A-Za-z0-9 .]+?\b(?:street|st|avenue|ave|road|rd|boulevard|blvd|drive|dr|lane|ln|way|court|ct|parkway|pkwy)\b\.?(?:[^\n]*?\b[A-Z]{2}\s+\d{5}(?:-\d{4})?)?",
    )
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| regex(r"(?:\+1[\s.\-]?)?\(?\b\d{3}\)?[\s.\-]?\d{3}[\s.\-]\d{4}\b"));
static LICENSE: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\blicen[cs]e\s*(?:no\.?|number|#)?\s*[:\-]?\s*([A-Z0-9][A-Z0-9\-]{3,})")
});
static NPI: Lazy<Regex> =
    Lazy::new(|| regex(r"(?i)\bNPI\b\s*(?:no\.?|number|#)?\s*[:\-]?\s*(\d{10})\b"));
static SERVICES_LABEL: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?im)^\s*(?:services(?:\s+offered)?|procedures)\s*[:\-]\s*(.+?)\s*$")
});

// ============================================================================
// Text recovery
// ============================================================================

fn unescape_pdf_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('r') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Cursor::new(data)).take(MAX_INFLATED_BYTES);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    Ok(inflated)
}

/// Document bytes with FlateDecode streams replaced by their inflated data
///
/// Streams that fail to inflate are dropped; other streams are kept as is.
fn inflate_streams(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut cursor = 0;

    while let Some(keyword) = find(bytes, STREAM, cursor) {
        if bytes[..keyword].ends_with(b"end") {
            let next = keyword + STREAM.len();
            out.extend_from_slice(&bytes[cursor..next]);
            cursor = next;
            continue;
        }

        let mut data_start = keyword + STREAM.len();
        if bytes[data_start..].starts_with(b"\r\n") {
            data_start += 2;
        } else if bytes[data_start..].starts_with(b"\n") {
            data_start += 1;
        }
        let Some(data_end) = find(bytes, ENDSTREAM, data_start) else {
            break;
        };

        // Stream dictionary: everything since the last object header
        let header = &bytes[cursor..keyword];
        let dict_start = header
            .windows(3)
            .rposition(|window| window == b"obj")
            .unwrap_or(0);
        let compressed = find(&header[dict_start..], b"/FlateDecode", 0).is_some();

        out.extend_from_slice(&bytes[cursor..data_start]);
        let data = &bytes[data_start..data_end];
        if compressed {
            match inflate(data) {
                Ok(inflated) => {
                    out.extend_from_slice(&inflated);
                    out.push(b'\n');
                }
                Err(e) => debug!(error = %e, offset = data_start, "Skipping undecodable PDF stream"),
            }
        } else {
            out.extend_from_slice(data);
        }
        out.extend_from_slice(ENDSTREAM);
        cursor = data_end + ENDSTREAM.len();
    }

    out.extend_from_slice(&bytes[cursor..]);
    out
}

/// Text-show strings of a PDF, one line per operator
fn pdf_text(bytes: &[u8]) -> String {
    let expanded = inflate_streams(bytes);
    let content = String::from_utf8_lossy(&expanded);
    let mut pieces: Vec<(usize, String)> = Vec::new();

    for caps in SHOW_TEXT.captures_iter(&content) {
        if let Some(m) = caps.get(1) {
            pieces.push((m.start(), unescape_pdf_string(m.as_str())));
        }
    }
    for caps in SHOW_ARRAY.captures_iter(&content) {
        if let Some(m) = caps.get(1) {
            let joined: String = ARRAY_STRING
                .captures_iter(m.as_str())
                .filter_map(|c| c.get(1))
                .map(|s| unescape_pdf_string(s.as_str()))
                .collect();
            pieces.push((m.start(), joined));
        }
    }

    pieces.sort_by_key(|(pos, _)| *pos);
    pieces
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recover plain text from document bytes
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Empty);
    }

    if bytes.starts_with(PDF_MAGIC) {
        let text = pdf_text(bytes);
        if text.trim().is_empty() {
            warn!(bytes = bytes.len(), "No literal text recovered from PDF");
        }
        return Ok(text);
    }

    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ExtractionError::UnsupportedFormat)
}

// ============================================================================
// Field patterns
// ============================================================================

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Catalog entries mentioned in `text`, in order of first mention
fn catalog_mentions(text: &str, catalog: &[&str]) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<(usize, &str)> = catalog
        .iter()
        .filter_map(|entry| lower.find(&search_key(entry)).map(|pos| (pos, *entry)))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, entry)| entry.to_string()).collect()
}

/// Apply field patterns to recovered text
pub fn extract_fields_from_text(text: &str) -> ExtractedFields {
    let full_name = first_capture(&NAME_LABEL, text)
        .or_else(|| first_capture(&NAME_TITLE, text))
        .unwrap_or_default();

    let specialty = first_capture(&SPECIALTY_LABEL, text)
        .or_else(|| catalog_mentions(text, SPECIALTIES).into_iter().next())
        .unwrap_or_default();

    let address = first_capture(&ADDRESS_LABEL, text)
        .or_else(|| STREET_ADDRESS.find(text).map(|m| m.as_str().trim().to_string()))
        .unwrap_or_default();

    let phone_number = PHONE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let license_number = first_capture(&LICENSE, text).unwrap_or_default();
    let npi_number = first_capture(&NPI, text).unwrap_or_default();
    let insurance_networks = catalog_mentions(text, INSURANCE_NETWORKS).join(", ");
    let services_offered = first_capture(&SERVICES_LABEL, text).unwrap_or_default();

    ExtractedFields {
        full_name,
        specialty,
        address,
        phone_number,
        license_number,
        npi_number,
        insurance_networks,
        services_offered,
    }
}

/// Recover text from `bytes` and extract field guesses
pub fn extract_fields(bytes: &[u8]) -> Result<ExtractedFields, ExtractionError> {
    let text = extract_text(bytes)?;
    let fields = extract_fields_from_text(&text);
    debug!(
        chars = text.len(),
        name_found = !fields.full_name.is_empty(),
        npi_found = !fields.npi_number.is_empty(),
        "Document fields extracted"
    );
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: &str = "\
Provider Credential Summary
Name: Dr. John A. Smith
Specialty: Cardiology
Address: 100 Main Street, Springfield, IL 62701
Phone: (212) 555-0199
License No: AB1234
NPI: 1234567890
Accepted plans include Aetna, Medicare and Blue Cross Blue Shield.
Services Offered: Echocardiography, stress testing
";

    #[test]
    fn test_labeled_text() {
        let fields = extract_fields(LETTER.as_bytes()).unwrap();
        assert_eq!(fields.full_name, "John A. Smith");
        assert_eq!(fields.specialty, "Cardiology");
        assert_eq!(fields.address, "100 Main Street, Springfield, IL 62701");
        assert_eq!(fields.phone_number, "(212) 555-0199");
        assert_eq!(fields.license_number, "AB1234");
        assert_eq!(fields.npi_number, "1234567890");
        assert_eq!(fields.insurance_networks, "Aetna, Medicare, Blue Cross Blue Shield");
        assert_eq!(fields.services_offered, "Echocardiography, stress testing");
    }

    #[test]
    fn test_unlabeled_text_uses_fallback_patterns() {
        let text = "Referral to Dr. Jane Doe (Dermatology) at 5 Oak Ave, Chicago, IL 60601.";
        let fields = extract_fields_from_text(text);
        assert_eq!(fields.full_name, "Jane Doe");
        assert_eq!(fields.specialty, "Dermatology");
        assert!(fields.address.starts_with("5 Oak Ave"), "{}", fields.address);
        assert_eq!(fields.npi_number, "");
        assert_eq!(fields.license_number, "");
    }

    #[test]
    fn test_pdf_literal_strings() {
        let pdf = b"%PDF-1.4\n1 0 obj << /Length 120 >> stream\nBT /F1 12 Tf 72 720 Td (Name: Dr. Jane Doe) Tj 0 -14 Td [(Spec) -20 (ialty: Dermatology)] TJ 0 -14 Td (NPI: 1987654321) Tj ET\nendstream endobj\n%%EOF";
        let text = extract_text(pdf).unwrap();
        assert_eq!(text, "Name: Dr. Jane Doe\nSpecialty: Dermatology\nNPI: 1987654321");

        let fields = extract_fields(pdf).unwrap();
        assert_eq!(fields.full_name, "Jane Doe");
        assert_eq!(fields.specialty, "Dermatology");
        assert_eq!(fields.npi_number, "1987654321");
        assert_eq!(fields.phone_number, "");
    }

    #[test]
    fn test_pdf_flate_streams_inflated() {
        use flate2::{write::ZlibEncoder, Compression};
        use std::io::Write;

        let content = b"BT /F1 12 Tf 72 720 Td (Name: Dr. Jane Doe) Tj 0 -14 Td (Phone: 312-555-0142) Tj ET";
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut pdf = b"%PDF-1.5\n4 0 obj << /Length 99 /Filter /FlateDecode >> stream\r\n".to_vec();
        pdf.extend_from_slice(&compressed);
        pdf.extend_from_slice(b"\r\nendstream endobj\n5 0 obj << /Length 30 >> stream\nBT (NPI: 1987654321) Tj ET\nendstream endobj\n%%EOF");

        let fields = extract_fields(&pdf).unwrap();
        assert_eq!(fields.full_name, "Jane Doe");
        assert_eq!(fields.phone_number, "312-555-0142");
        assert_eq!(fields.npi_number, "1987654321");
    }

    #[test]
    fn test_pdf_undecodable_stream_skipped() {
        let pdf = b"%PDF-1.5\n1 0 obj << /Filter /FlateDecode >> stream\n\x01\x02garbage\nendstream endobj\n2 0 obj << >> stream\nBT (License No: MD55555) Tj ET\nendstream endobj";
        let fields = extract_fields(pdf).unwrap();
        assert_eq!(fields.license_number, "MD55555");
        assert_eq!(fields.full_name, "");
    }

    #[test]
    fn test_pdf_escapes() {
        assert_eq!(unescape_pdf_string(r"a\(b\)c\\d"), r"a(b)c\d");
    }

    #[test]
    fn test_all_keys_present() {
        let json = serde_json::to_value(extract_fields_from_text("nothing useful")).unwrap();
        for key in [
            "fullName",
            "specialty",
            "address",
            "phoneNumber",
            "licenseNumber",
            "npiNumber",
            "insuranceNetworks",
            "servicesOffered",
        ] {
            assert_eq!(json[key], "", "{} should be an empty string", key);
        }
    }

    #[test]
    fn test_rejects_empty_and_binary() {
        assert!(matches!(extract_fields(b""), Err(ExtractionError::Empty)));
        assert!(matches!(
            extract_fields(&[0xff, 0xfe, 0x00, 0x81]),
            Err(ExtractionError::UnsupportedFormat)
        ));
    }
}
