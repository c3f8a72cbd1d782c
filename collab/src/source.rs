//! Where peer annotations and versions come from.
//!
//! `CaseSource` is the seam between the poller and the network so the poller
//! can be driven by an in-memory source in tests.

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;

use std::collections::BTreeMap;

use annotate::doc::Annotation;
use annotate::version::AnnotationVersion;

use crate::error::SyncError;

/// Overlay colors handed out to peers in sorted peer-ID order. Red is left
/// out because it is the local annotator's default.
pub const PEER_PALETTE: &[&str] = &["#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#f97316", "#06b6d4"];

/// One peer's annotation set, ready for `Engine::add_peer_annotations`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerSet {
    pub peer_id: String,
    pub annotations: Vec<Annotation>,
    pub color: String,
}

/// Overlay color for the peer at `rank` in sorted peer-ID order.
#[must_use]
pub fn peer_color(rank: usize) -> &'static str {
    PEER_PALETTE[rank % PEER_PALETTE.len()]
}

/// Split a case's annotations into one set per author, skipping `local_user`.
///
/// Sets come back sorted by peer ID with colors assigned by that order, so a
/// peer keeps its color across polls as long as the peer roster is stable.
#[must_use]
pub fn group_by_peer(annotations: Vec<Annotation>, local_user: &str) -> Vec<PeerSet> {
    let mut by_peer: BTreeMap<String, Vec<Annotation>> = BTreeMap::new();
    for ann in annotations {
        if ann.user_id == local_user {
            continue;
        }
        by_peer.entry(ann.user_id.clone()).or_default().push(ann);
    }
    by_peer
        .into_iter()
        .enumerate()
        .map(|(rank, (peer_id, annotations))| PeerSet { peer_id, annotations, color: peer_color(rank).to_string() })
        .collect()
}

/// Backend that can answer peer and version queries for a case.
#[async_trait::async_trait]
pub trait CaseSource: Send + Sync {
    /// Every other user's annotations on `case_id`, grouped per peer.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the backend is unreachable or answers with
    /// something other than an annotation list.
    async fn fetch_peers(&self, case_id: &str, user_id: &str) -> Result<Vec<PeerSet>, SyncError>;

    /// The version list for `case_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the backend is unreachable or answers with
    /// something other than a version list.
    async fn fetch_versions(&self, case_id: &str) -> Result<Vec<AnnotationVersion>, SyncError>;
}
