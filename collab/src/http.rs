//! REST-backed [`CaseSource`].
//!
//! Routes, relative to the configured base URL:
//!
//! - `GET  /api/annotations/{case_id}`: every annotation on the case
//! - `GET  /api/annotations/versions/{case_id}`: the case's version list
//! - `POST /api/annotations/snapshot/{case_id}`: persist a full case snapshot
//!
//! Response parsing lives in free functions so it can be tested without a
//! server.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use annotate::doc::Annotation;
use annotate::engine::CaseSnapshot;
use annotate::version::AnnotationVersion;
use reqwest::Url;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::source::{CaseSource, PeerSet, group_by_peer};

pub struct HttpSource {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpSource {
    /// Build a client for `config.base_url` with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// fails to build.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let base_url = parse_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| SyncError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Persist the full annotation set for a case.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails or the backend rejects it.
    pub async fn save_snapshot(&self, snapshot: &CaseSnapshot) -> Result<(), SyncError> {
        let url = snapshot_url(&self.base_url, &snapshot.case_id)?;
        let response = self
            .http
            .post(url)
            .json(snapshot)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status { status: status.as_u16(), body });
        }
        debug!(case_id = %snapshot.case_id, count = snapshot.annotations.len(), "snapshot saved");
        Ok(())
    }

    async fn get_text(&self, url: Url) -> Result<String, SyncError> {
        let response = self.http.get(url).send().await.map_err(|e| SyncError::Request(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| SyncError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(SyncError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl CaseSource for HttpSource {
    async fn fetch_peers(&self, case_id: &str, user_id: &str) -> Result<Vec<PeerSet>, SyncError> {
        let url = annotations_url(&self.base_url, case_id)?;
        let text = self.get_text(url).await?;
        Ok(group_by_peer(parse_annotations(&text)?, user_id))
    }

    async fn fetch_versions(&self, case_id: &str) -> Result<Vec<AnnotationVersion>, SyncError> {
        let url = versions_url(&self.base_url, case_id)?;
        let text = self.get_text(url).await?;
        parse_versions(&text)
    }
}

// =============================================================================
// URLS
// =============================================================================

fn parse_base_url(raw: &str) -> Result<Url, SyncError> {
    let url = Url::parse(raw).map_err(|e| SyncError::InvalidBaseUrl { url: raw.to_string(), reason: e.to_string() })?;
    if url.cannot_be_a_base() {
        return Err(SyncError::InvalidBaseUrl { url: raw.to_string(), reason: "not a hierarchical URL".into() });
    }
    Ok(url)
}

fn annotations_url(base: &Url, case_id: &str) -> Result<Url, SyncError> {
    endpoint(base, &["api", "annotations", case_id])
}

fn versions_url(base: &Url, case_id: &str) -> Result<Url, SyncError> {
    endpoint(base, &["api", "annotations", "versions", case_id])
}

fn snapshot_url(base: &Url, case_id: &str) -> Result<Url, SyncError> {
    endpoint(base, &["api", "annotations", "snapshot", case_id])
}

/// Append percent-encoded path `segments` to `base`.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SyncError> {
    let mut url = base.clone();
    {
        let Ok(mut path) = url.path_segments_mut() else {
            return Err(SyncError::InvalidBaseUrl { url: base.to_string(), reason: "not a hierarchical URL".into() });
        };
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse an annotation list, dropping entries whose coordinates don't match
/// their kind. One bad peer record shouldn't blank the whole overlay.
fn parse_annotations(json: &str) -> Result<Vec<Annotation>, SyncError> {
    let raw: Vec<Annotation> = serde_json::from_str(json).map_err(|e| SyncError::Parse(e.to_string()))?;
    Ok(raw
        .into_iter()
        .filter(|ann| match ann.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %ann.id, error = %e, "skipping malformed peer annotation");
                false
            }
        })
        .collect())
}

fn parse_versions(json: &str) -> Result<Vec<AnnotationVersion>, SyncError> {
    serde_json::from_str(json).map_err(|e| SyncError::Parse(e.to_string()))
}
