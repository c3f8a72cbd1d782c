//! Background poller that keeps peer overlays and versions fresh.
//!
//! DESIGN
//! ======
//! One tokio task per open case. Each cycle fetches peers and versions, sends
//! a [`SyncUpdate`] over a bounded channel, then sleeps for a random interval
//! in `[poll_min_ms, poll_max_ms]` so many open viewers don't hit the backend
//! in lockstep. The host owns the engine and applies updates itself, which
//! keeps the engine single-threaded.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures are never retried within a cycle. A failed peer fetch is
//! replaced by demo peers (or nothing, if `fallback_mock` is off); a failed
//! version fetch leaves the engine's versions untouched. Either way the update
//! carries a `notice` for a non-blocking banner.
//!
//! Shutdown is checked at every await point: after `stop()` or a drop of the
//! [`Poller`], no further updates are sent.

#[cfg(test)]
#[path = "poller_test.rs"]
mod poller_test;

use std::time::Duration;

use annotate::engine::Engine;
use annotate::version::AnnotationVersion;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::mock::mock_peers;
use crate::source::{CaseSource, PeerSet};

const UPDATE_QUEUE_CAPACITY: usize = 4;

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncUpdate {
    pub peers: Vec<PeerSet>,
    /// `None` when the version fetch failed and the current list should stay.
    pub versions: Option<Vec<AnnotationVersion>>,
    /// Human-readable note when fallback data was used.
    pub notice: Option<String>,
}

impl SyncUpdate {
    /// Push this update into `engine`'s peer overlays and version list.
    ///
    /// Peers absent from the update are removed; peers still present keep
    /// their visibility toggle. Versions are merged, so ones saved locally
    /// survive a poll that doesn't carry them yet. The local editable list is
    /// never touched.
    pub fn apply(&self, engine: &mut Engine) {
        let stale: Vec<String> = engine
            .store
            .peers()
            .as_map()
            .keys()
            .filter(|id| !self.peers.iter().any(|p| &p.peer_id == *id))
            .cloned()
            .collect();
        for id in stale {
            engine.remove_peer(&id);
        }
        for peer in &self.peers {
            engine.add_peer_annotations(&peer.peer_id, peer.annotations.clone(), &peer.color);
        }
        if let Some(versions) = &self.versions {
            engine.merge_remote_versions(versions.clone());
        }
    }
}

/// Handle to a running poll task.
pub struct Poller {
    updates: mpsc::Receiver<SyncUpdate>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Wait for the next update. Returns `None` once the task has exited.
    pub async fn recv(&mut self) -> Option<SyncUpdate> {
        self.updates.recv().await
    }

    /// Take an update if one is already queued.
    pub fn try_recv(&mut self) -> Option<SyncUpdate> {
        match self.updates.try_recv() {
            Ok(update) => Some(update),
            Err(_) => None,
        }
    }

    /// Signal shutdown and wait for the task to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            if tx.send(()).is_err() {
                debug!("poller task already finished");
            }
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start polling `source` for `case_id` on behalf of `user_id`.
///
/// The first fetch happens immediately; later ones follow the jittered
/// interval from `config`.
pub fn spawn_poller<S>(source: S, case_id: &str, user_id: &str, config: &SyncConfig) -> Poller
where
    S: CaseSource + 'static,
{
    let case_id = case_id.to_string();
    let user_id = user_id.to_string();
    let (min_ms, max_ms) = (config.poll_min_ms, config.poll_max_ms.max(config.poll_min_ms));
    let fallback_mock = config.fallback_mock;
    let (tx, rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    info!(%case_id, min_ms, max_ms, fallback_mock, "collaborator poller started");

    let task = tokio::spawn(async move {
        loop {
            let update = tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                update = poll_once(&source, &case_id, &user_id, fallback_mock) => update,
            };
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                sent = tx.send(update) => {
                    if sent.is_err() {
                        debug!(%case_id, "update receiver dropped");
                        break;
                    }
                }
            }
            let wait = next_delay(min_ms, max_ms);
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                () = tokio::time::sleep(wait) => {}
            }
        }
        info!(%case_id, "collaborator poller stopped");
    });

    Poller { updates: rx, shutdown: Some(shutdown_tx), task: Some(task) }
}

/// Run one fetch cycle, substituting fallback data on failure.
pub async fn poll_once<S>(source: &S, case_id: &str, user_id: &str, fallback_mock: bool) -> SyncUpdate
where
    S: CaseSource + ?Sized,
{
    let mut notices = Vec::new();

    let peers = match source.fetch_peers(case_id, user_id).await {
        Ok(peers) => peers,
        Err(e) => {
            warn!(%case_id, error = %e, fallback_mock, "peer fetch failed; using fallback");
            notices.push(if fallback_mock {
                "Peer annotations unavailable; showing demo data."
            } else {
                "Peer annotations unavailable."
            });
            if fallback_mock { mock_peers(case_id) } else { Vec::new() }
        }
    };

    let versions = match source.fetch_versions(case_id).await {
        Ok(versions) => Some(versions),
        Err(e) => {
            warn!(%case_id, error = %e, "version fetch failed; keeping current versions");
            notices.push("Version history could not be refreshed.");
            None
        }
    };

    debug!(%case_id, peers = peers.len(), versions = versions.as_ref().map_or(0, Vec::len), "poll cycle complete");
    SyncUpdate { peers, versions, notice: (!notices.is_empty()).then(|| notices.join(" ")) }
}

fn next_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}
