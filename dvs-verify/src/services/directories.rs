//! Public provider directory scraping
//!
//! Best-effort extraction from two HTML directory search pages. Only the
//! first listing on each page is used. Parsing is synchronous and happens
//! after the body is fully read, so no HTML document is held across an
//! await point.

use super::evidence_gatherer::{EvidenceSource, SourceError};
use crate::models::evidence::non_blank;
use crate::models::{EvidenceFragment, Provenance};
use dvs_common::config::SourcesConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

static US_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\d{3}\)\s*\d{3}-\d{4}").expect("phone pattern is valid"));

static LISTING: Lazy<Selector> = Lazy::new(|| {
    selector(
        r#"div[class*="provider"], article[class*="provider"], li[class*="provider"],
           div[class*="doctor"], article[class*="doctor"], li[class*="doctor"],
           div[class*="listing"], article[class*="listing"], li[class*="listing"]"#,
    )
});

static ADDRESS: Lazy<Selector> = Lazy::new(|| {
    selector(
        r#"span[class*="address"], div[class*="address"], address,
           span[class*="location"], div[class*="location"]"#,
    )
});

static HEADING: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, [class*=\"name\"]"));

static SERVICE: Lazy<Selector> = Lazy::new(|| {
    selector(
        r#"span[class*="specialty"], div[class*="specialty"],
           span[class*="service"], div[class*="service"]"#,
    )
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("directory selectors are valid CSS")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fields pulled from the first listing of a directory page
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DirectoryListing {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub services: Vec<String>,
}

/// Parse a directory search page; `None` when no listing is present
pub fn parse_listing(html: &str) -> Option<DirectoryListing> {
    let document = Html::parse_document(html);
    let listing = document.select(&LISTING).next()?;

    let text = element_text(listing);
    let phone = US_PHONE.find(&text).map(|m| m.as_str().to_string());
    let address = listing
        .select(&ADDRESS)
        .map(element_text)
        .find(|t| !t.is_empty());
    let name = listing
        .select(&HEADING)
        .map(element_text)
        .find(|t| !t.is_empty());

    let mut services: Vec<String> = Vec::new();
    for service in listing.select(&SERVICE).map(element_text) {
        if !service.is_empty() && !services.contains(&service) {
            services.push(service);
        }
    }

    Some(DirectoryListing {
        name,
        phone,
        address,
        services,
    })
}

/// Directory-backed evidence source
pub struct DirectorySource {
    http_client: reqwest::Client,
    healthgrades_url: String,
    webmd_url: String,
}

impl DirectorySource {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            healthgrades_url: config.healthgrades_search_url.clone(),
            webmd_url: config.webmd_search_url.clone(),
        })
    }

    async fn fetch_page(&self, url: &str, params: &[(&str, String)]) -> Result<String, SourceError> {
        let response = self.http_client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(status.as_u16(), url.to_string()));
        }
        Ok(response.text().await?)
    }
}

/// Combine the two directory listings
///
/// The first page supplies contact details and the name; services from
/// both pages are concatenated, falling back to the searched specialty.
pub fn combine_listings(
    primary: Option<DirectoryListing>,
    secondary: Option<DirectoryListing>,
    specialty: &str,
) -> EvidenceFragment {
    let mut fragment = EvidenceFragment::default();

    let fallback_service = non_blank(Some(specialty));
    for (index, listing) in [primary, secondary].into_iter().enumerate() {
        let Some(listing) = listing else { continue };

        if index == 0 {
            fragment.name = non_blank(listing.name.as_deref());
            fragment.address = non_blank(listing.address.as_deref());
        }
        if fragment.phone.is_none() {
            fragment.phone = non_blank(listing.phone.as_deref());
        }

        if listing.services.is_empty() {
            fragment.services.extend(fallback_service.clone());
        } else {
            fragment.services.extend(listing.services);
        }
    }

    fragment
}

#[async_trait::async_trait]
impl EvidenceSource for DirectorySource {
    fn name(&self) -> &'static str {
        "Directories"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Directories
    }

    async fn fetch(&self, name: &str, specialty: &str) -> Result<EvidenceFragment, SourceError> {
        let what = format!("{} {}", name, specialty).trim().to_string();
        let healthgrades = self
            .fetch_page(&self.healthgrades_url, &[("what", what), ("where", String::new())])
            .await;
        let webmd = self
            .fetch_page(
                &self.webmd_url,
                &[("query", name.to_string()), ("specialty", specialty.to_string())],
            )
            .await;

        let (primary, secondary) = match (healthgrades, webmd) {
            (Err(first), Err(_)) => return Err(first),
            (a, b) => (a, b),
        };

        let primary = match primary {
            Ok(html) => parse_listing(&html),
            Err(e) => {
                warn!(page = "healthgrades", error = %e, "Directory page unavailable");
                None
            }
        };
        let secondary = match secondary {
            Ok(html) => parse_listing(&html),
            Err(e) => {
                warn!(page = "webmd", error = %e, "Directory page unavailable");
                None
            }
        };

        debug!(
            primary_listing = primary.is_some(),
            secondary_listing = secondary.is_some(),
            "Directory pages parsed"
        );

        Ok(combine_listings(primary, secondary, specialty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="search-header">Results</div>
          <article class="provider-card">
            <h3>Dr. John Smith, MD</h3>
            <div class="provider-address">100 Main Street, Springfield, IL 62701</div>
            <p>Call (212) 555-0199 for appointments</p>
            <span class="specialty-tag">Cardiology</span>
            <span class="service-item">Echocardiography</span>
            <span class="service-item">Cardiology</span>
          </article>
          <article class="provider-card">
            <h3>Someone Else</h3>
          </article>
        </body></html>
    "#;

    #[test]
    fn test_parse_first_listing() {
        let listing = parse_listing(PAGE).unwrap();
        assert_eq!(listing.name.as_deref(), Some("Dr. John Smith, MD"));
        assert_eq!(listing.phone.as_deref(), Some("(212) 555-0199"));
        assert_eq!(
            listing.address.as_deref(),
            Some("100 Main Street, Springfield, IL 62701")
        );
        assert_eq!(listing.services, vec!["Cardiology", "Echocardiography"]);
    }

    #[test]
    fn test_page_without_listing() {
        assert!(parse_listing("<html><body><p>No results</p></body></html>").is_none());
    }

    #[test]
    fn test_combine_falls_back_to_specialty() {
        let primary = DirectoryListing {
            phone: Some("(212) 555-0199".to_string()),
            address: Some("100 Main Street".to_string()),
            ..Default::default()
        };
        let secondary = DirectoryListing {
            phone: Some("(999) 555-0000".to_string()),
            services: vec!["Stress tests".to_string()],
            ..Default::default()
        };

        let fragment = combine_listings(Some(primary), Some(secondary), "Cardiology");
        assert_eq!(fragment.phone.as_deref(), Some("(212) 555-0199"));
        assert_eq!(fragment.address.as_deref(), Some("100 Main Street"));
        assert_eq!(fragment.services, vec!["Cardiology", "Stress tests"]);
    }

    #[test]
    fn test_combine_nothing_found() {
        let fragment = combine_listings(None, None, "Cardiology");
        assert!(fragment.is_empty());
    }
}
