//! Cross-check of QR payload URLs against the parsed invoice number.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    static ref SCRIPT_STYLE: Regex =
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
}

/// Default bound on each link fetch. No retries.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A payload that failed the cross-check, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidLink {
    pub url: String,
    pub reason: String,
}

/// Partition of the input payloads; every payload lands in exactly one side.
#[derive(Debug, Clone, Default)]
pub struct LinkVerification {
    pub valid: Vec<String>,
    pub invalid: Vec<InvalidLink>,
}

/// Fetches code payload URLs and classifies them by whether the response
/// mentions the parsed invoice number.
#[derive(Debug, Clone)]
pub struct LinkVerifier {
    client: reqwest::Client,
    timeout: Duration,
}

impl LinkVerifier {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Check every payload against the invoice number. Classification:
    /// valid if the case-folded invoice number is a substring of the
    /// fetched response's plain text; invalid otherwise, including fetch
    /// and decode errors (annotated with the error).
    pub async fn verify(
        &self,
        payloads: &[String],
        invoice_number: Option<&str>,
    ) -> LinkVerification {
        let mut outcome = LinkVerification::default();

        let needle = match invoice_number {
            Some(number) if !number.trim().is_empty() => number.trim().to_lowercase(),
            _ => {
                outcome.invalid = payloads
                    .iter()
                    .map(|url| InvalidLink {
                        url: url.clone(),
                        reason: "no invoice number extracted".to_string(),
                    })
                    .collect();
                return outcome;
            }
        };

        for url in payloads {
            match self.fetch_text(url).await {
                Ok(body) => {
                    let haystack = strip_markup(&body).to_lowercase();
                    if haystack.contains(&needle) {
                        outcome.valid.push(url.clone());
                    } else {
                        outcome.invalid.push(InvalidLink {
                            url: url.clone(),
                            reason: "invoice number not present in response".to_string(),
                        });
                    }
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "link fetch failed");
                    outcome.invalid.push(InvalidLink {
                        url: url.clone(),
                        reason: format!("fetch failed: {e}"),
                    });
                }
            }
        }

        outcome
    }

    async fn fetch_text(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .text()
            .await
    }
}

impl Default for LinkVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip script/style blocks and remaining tags, leaving plain text.
fn strip_markup(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(html, " ");
    TAG.replace_all(&without_blocks, " ").to_string()
}
