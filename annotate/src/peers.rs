//! Read-only peer overlays keyed by peer (user) id.
//!
//! Peers are rendered for comparison only; nothing here feeds back into the
//! local editable list. Entries live in a `BTreeMap`, so iteration order is
//! the sorted peer id and toggling one peer never moves another.

#[cfg(test)]
#[path = "peers_test.rs"]
mod peers_test;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::doc::Annotation;

/// One peer's annotation set and how to draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerOverlay {
    pub annotations: Vec<Annotation>,
    pub color: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PeerOverlays {
    peers: BTreeMap<String, PeerOverlay>,
}

impl PeerOverlays {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer. A refreshed peer keeps its visibility flag;
    /// a new peer starts visible.
    pub fn upsert(&mut self, peer_id: &str, annotations: Vec<Annotation>, color: &str) {
        if let Some(entry) = self.peers.get_mut(peer_id) {
            entry.annotations = annotations;
            color.clone_into(&mut entry.color);
            return;
        }
        self.peers.insert(
            peer_id.to_string(),
            PeerOverlay { annotations, color: color.to_string(), visible: true },
        );
    }

    /// Set one peer's visibility. Returns false for an unknown peer.
    pub fn set_visible(&mut self, peer_id: &str, visible: bool) -> bool {
        let Some(entry) = self.peers.get_mut(peer_id) else {
            debug!(%peer_id, "visibility change for unknown peer ignored");
            return false;
        };
        entry.visible = visible;
        true
    }

    /// Flip one peer's visibility. Returns the new flag, or `None` for an unknown peer.
    pub fn toggle(&mut self, peer_id: &str) -> Option<bool> {
        let entry = self.peers.get_mut(peer_id)?;
        entry.visible = !entry.visible;
        Some(entry.visible)
    }

    pub fn remove(&mut self, peer_id: &str) -> Option<PeerOverlay> {
        self.peers.remove(peer_id)
    }

    #[must_use]
    pub fn get(&self, peer_id: &str) -> Option<&PeerOverlay> {
        self.peers.get(peer_id)
    }

    /// Visible peers in peer-id order.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &PeerOverlay)> {
        self.peers
            .iter()
            .filter(|(_, overlay)| overlay.visible)
            .map(|(id, overlay)| (id.as_str(), overlay))
    }

    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, PeerOverlay> {
        &self.peers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
