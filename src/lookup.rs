//! Lookup orchestration: store check, fetch, extract, persist.
//!
//! ## Flow
//!
//! A lookup runs at most one pass over four stages:
//!
//! 1. Store check. Unless a refresh is forced, a stored record younger than
//!    the freshness window is returned as-is and flagged as cached.
//! 2. Fetch. A miss, a stale record and a forced refresh all fall through
//!    to one fetch of the live report page. Nothing is retried.
//! 3. Extract. Best-effort field extraction; a partial report is a normal
//!    outcome, not an error.
//! 4. Persist. A full-replace write, timestamped by the store.
//!
//! Concurrent lookups of the same identifier may each fetch; that is
//! accepted. Every write is a complete record, so racing writers settle on
//! whichever finished last rather than a merged document.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::{self, ExtractError};
use crate::fetch::{FetchError, ReportFetcher};
use crate::record::{normalize_identifier, VehicleRecord};
use crate::store::{StoreError, VehicleStore};

/// Result of a successful lookup. Serializes as the record itself with a
/// `cached` flag alongside its fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOutcome {
    #[serde(flatten)]
    pub record: VehicleRecord,
    /// True when the record came straight from the store.
    pub cached: bool,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no report exists for {identifier}")]
    NotFound { identifier: String },
    #[error("report fetch failed: {0}")]
    Transport(#[source] FetchError),
    #[error("report markup could not be used: {0}")]
    Parse(#[from] ExtractError),
    #[error("record store failure: {0}")]
    Store(#[from] StoreError),
}

impl LookupError {
    /// Stable machine-readable failure kind, for response payloads and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Transport(_) => "transport_error",
            Self::Parse(_) => "parse_error",
            Self::Store(_) => "storage_error",
        }
    }
}

impl From<FetchError> for LookupError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { identifier } => Self::NotFound { identifier },
            other => Self::Transport(other),
        }
    }
}

/// Orchestrates lookups against one store and one report source.
pub struct LookupService {
    store: Arc<VehicleStore>,
    fetcher: Arc<dyn ReportFetcher>,
    freshness_window: Duration,
}

impl LookupService {
    pub fn new(
        store: Arc<VehicleStore>,
        fetcher: Arc<dyn ReportFetcher>,
        freshness_window: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            freshness_window,
        }
    }

    /// Look up a vehicle, serving from the store when the record is fresh
    /// and refetching otherwise. `force_refresh` skips the store check and
    /// always fetches. The identifier may arrive in any casing or spacing;
    /// it is normalized here before anything else sees it.
    pub async fn lookup(
        &self,
        identifier: &str,
        force_refresh: bool,
    ) -> Result<LookupOutcome, LookupError> {
        let identifier = normalize_identifier(identifier);
        match self.lookup_inner(&identifier, force_refresh).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(%identifier, reason = err.reason(), "vehicle lookup failed: {err}");
                Err(err)
            }
        }
    }

    async fn lookup_inner(
        &self,
        identifier: &str,
        force_refresh: bool,
    ) -> Result<LookupOutcome, LookupError> {
        if force_refresh {
            debug!(identifier, "forced refresh, skipping store check");
        } else if let Some(record) = self.store.get(identifier)? {
            if self.is_fresh(&record, Utc::now()) {
                debug!(identifier, "fresh record served from store");
                return Ok(LookupOutcome {
                    record,
                    cached: true,
                });
            }
            debug!(identifier, "stored record is stale, refetching");
        }

        let html = self.fetcher.fetch_report(identifier).await?;
        let report = extract::extract_report(&html, identifier)?;
        info!(
            identifier,
            fields = report.field_count(),
            "vehicle report extracted"
        );

        let record = self.store.upsert(&report)?;
        Ok(LookupOutcome {
            record,
            cached: false,
        })
    }

    /// Extract and persist a record from markup supplied by the caller,
    /// bypassing the network entirely. Used for offline imports of saved
    /// report pages.
    pub fn import_html(
        &self,
        identifier: &str,
        html: &str,
    ) -> Result<VehicleRecord, LookupError> {
        let identifier = normalize_identifier(identifier);
        let report = extract::extract_report(html, &identifier)?;
        let record = self.store.upsert(&report)?;
        info!(
            %identifier,
            fields = record.report.field_count(),
            "vehicle report imported from supplied markup"
        );
        Ok(record)
    }

    fn is_fresh(&self, record: &VehicleRecord, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(record.last_updated) < self.freshness_window
    }
}
