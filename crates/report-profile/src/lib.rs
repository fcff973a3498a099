#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Scraped company profile provider.
//!
//! Implements [`ProfileProvider`] by fetching two pages:
//!
//! - the company website, for the introduction paragraph
//!   (`div.intro_content p`)
//! - a finance-portal profile page, for labeled contact fields
//!   (`div#profile-1 p`)
//!
//! Field labels are locale text configured per instance, defaulting to the
//! Vietnamese portal labels the generator was built around.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use report_core::error::{ReportError, Result};
use report_core::{ContactInfo, ProfileProvider, Provider};

/// Browser-like user agent; the portal rejects default client strings.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static INTRO_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.intro_content p").expect("valid intro selector"));

static PROFILE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#profile-1 p").expect("valid profile selector"));

/// Locale labels of the contact fields on the portal page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactLabels {
    /// Label of the address field.
    pub address: String,
    /// Label of the phone field.
    pub phone: String,
    /// Label of the website field.
    pub website: String,
}

impl Default for ContactLabels {
    fn default() -> Self {
        Self {
            address: "Địa chỉ".to_string(),
            phone: "Điện thoại".to_string(),
            website: "Website".to_string(),
        }
    }
}

/// Company profile provider scraping a company site and a finance portal.
#[derive(Debug)]
pub struct SiteProfileProvider {
    client: reqwest::Client,
    intro_url: String,
    portal_url: String,
    labels: ContactLabels,
}

impl SiteProfileProvider {
    /// Creates a provider for the given company-site and portal URLs.
    #[must_use]
    pub fn new(intro_url: impl Into<String>, portal_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            intro_url: intro_url.into(),
            portal_url: portal_url.into(),
            labels: ContactLabels::default(),
        }
    }

    /// Overrides the contact field labels.
    #[must_use]
    pub fn with_labels(mut self, labels: ContactLabels) -> Self {
        self.labels = labels;
        self
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReportError::Network(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))
    }
}

impl Provider for SiteProfileProvider {
    fn name(&self) -> &str {
        "Web Profile"
    }

    fn description(&self) -> &str {
        "Company intro and contact fields scraped from the company site and a finance portal"
    }
}

#[async_trait]
impl ProfileProvider for SiteProfileProvider {
    async fn intro(&self) -> Result<String> {
        let body = self.fetch(&self.intro_url).await?;
        extract_intro(&body)
            .ok_or_else(|| ReportError::Parse(format!("no intro paragraph at {}", self.intro_url)))
    }

    async fn contact_info(&self) -> Result<ContactInfo> {
        let body = self.fetch(&self.portal_url).await?;
        let info = extract_contacts(&body, &self.labels);
        if info == ContactInfo::default() {
            return Err(ReportError::Parse(format!(
                "no contact fields at {}",
                self.portal_url
            )));
        }
        Ok(info)
    }
}

/// Pulls the first introduction paragraph out of a company page.
#[must_use]
pub fn extract_intro(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let paragraph = document.select(&INTRO_SELECTOR).next()?;
    let text = collapse_whitespace(&paragraph.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Pulls the labeled contact fields out of a portal profile page.
///
/// Each profile paragraph is matched against the configured labels; the
/// value is the text after the label's colon. Website values get a scheme
/// prefixed when the page carries a bare host.
#[must_use]
pub fn extract_contacts(html: &str, labels: &ContactLabels) -> ContactInfo {
    let document = Html::parse_document(html);
    let mut info = ContactInfo::default();

    for paragraph in document.select(&PROFILE_SELECTOR) {
        let text = collapse_whitespace(&paragraph.text().collect::<String>());
        if text.is_empty() {
            continue;
        }

        if info.address.is_none() && text.contains(&labels.address) {
            info.address = field_value(&text);
        } else if info.phone.is_none() && text.contains(&labels.phone) {
            info.phone = field_value(&text);
        } else if info.website.is_none() && text.contains(&labels.website) {
            info.website = field_value(&text).map(|value| {
                if value.starts_with("http") {
                    value
                } else {
                    format!("http://{value}")
                }
            });
        }
    }

    info
}

/// The value part of a `Label: value` line.
fn field_value(text: &str) -> Option<String> {
    let value = text.rsplit(':').next()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_intro() {
        let html = r#"
            <html><body>
              <div class="intro_content">
                <p>  A retailer of   consumer electronics. </p>
                <p>Second paragraph.</p>
              </div>
            </body></html>"#;
        assert_eq!(
            extract_intro(html).unwrap(),
            "A retailer of consumer electronics."
        );
    }

    #[test]
    fn test_extract_intro_missing() {
        assert_eq!(extract_intro("<html><body></body></html>"), None);
    }

    #[test]
    fn test_extract_contacts() {
        let html = r#"
            <html><body>
              <div id="profile-1">
                <p>Địa chỉ: 128 Tran Quang Khai</p>
                <p>Điện thoại: +84-28-3812-5960</p>
                <p>Website: www.mwg.vn</p>
              </div>
            </body></html>"#;
        let info = extract_contacts(html, &ContactLabels::default());
        assert_eq!(info.address.as_deref(), Some("128 Tran Quang Khai"));
        assert_eq!(info.phone.as_deref(), Some("+84-28-3812-5960"));
        assert_eq!(info.website.as_deref(), Some("http://www.mwg.vn"));
    }

    #[test]
    fn test_extract_contacts_missing_fields() {
        let info = extract_contacts("<div id=\"profile-1\"></div>", &ContactLabels::default());
        assert_eq!(info, ContactInfo::default());
    }
}
