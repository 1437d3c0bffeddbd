//! Report page fetching from the upstream vehicle data host.
//!
//! The host serves its report pages to browsers, so the client sends a
//! desktop browser profile. Unknown registrations do not come back as HTTP
//! 404: the host answers 200 with a placeholder page, so not-found detection
//! is a content check on the body rather than a status check.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Phrases the host puts on its placeholder page when no report exists.
/// Compared case-insensitively against the whole body.
const NOT_FOUND_MARKERS: &[&str] = &[
    "registration number not found",
    "vehicle not found",
    "no vehicle found",
    "no data available for this registration",
    "check the registration number and try again",
];

#[derive(Debug, Error)]
pub enum FetchError {
    /// The host answered but has no report for this registration.
    #[error("no report exists for {identifier}")]
    NotFound { identifier: String },
    /// The host answered with a status the report flow cannot use.
    #[error("unexpected status {status} from report host")]
    Status { status: u16 },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Source of raw report markup for a registration. The HTTP client is the
/// production implementation; tests substitute canned ones.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch_report(&self, identifier: &str) -> Result<String, FetchError>;
}

/// Fetches report pages over HTTP with a browser request profile.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher against `config.base_url`. No request timeout is
    /// applied unless the configuration asks for one.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ReportFetcher for HttpFetcher {
    async fn fetch_report(&self, identifier: &str) -> Result<String, FetchError> {
        let url = report_url(&self.base_url, identifier);
        debug!(identifier, %url, "fetching vehicle report page");

        let response = self
            .client
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-GB,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(identifier, bytes = body.len(), "report page received");

        if is_not_found_page(&body) {
            return Err(FetchError::NotFound {
                identifier: identifier.to_string(),
            });
        }
        Ok(body)
    }
}

fn report_url(base_url: &str, identifier: &str) -> String {
    format!("{}/cardetails/{}", base_url.trim_end_matches('/'), identifier)
}

fn is_not_found_page(body: &str) -> bool {
    let lowered = body.to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m))
}
