use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use annotate::doc::{Annotation, AnnotationKind, Coordinates};
use tokio::time::Instant;

use super::*;
use crate::error::SyncError;
use crate::mock::MOCK_PEER_ID;
use crate::source::group_by_peer;

// =============================================================
// Fake source
// =============================================================

#[derive(Default)]
struct FakeSource {
    annotations: Vec<Annotation>,
    versions: Vec<AnnotationVersion>,
    fail_peers: bool,
    fail_versions: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CaseSource for FakeSource {
    async fn fetch_peers(&self, _case_id: &str, user_id: &str) -> Result<Vec<PeerSet>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_peers {
            return Err(SyncError::Status { status: 503, body: "down".into() });
        }
        Ok(group_by_peer(self.annotations.clone(), user_id))
    }

    async fn fetch_versions(&self, _case_id: &str) -> Result<Vec<AnnotationVersion>, SyncError> {
        if self.fail_versions {
            return Err(SyncError::Request("connection reset".into()));
        }
        Ok(self.versions.clone())
    }
}

fn ann(id: &str, user: &str) -> Annotation {
    Annotation {
        id: id.into(),
        case_id: "case-1".into(),
        user_id: user.into(),
        kind: AnnotationKind::Rectangle,
        coordinates: Coordinates::Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
        color: "#ff0000".into(),
        label: None,
        locked: None,
        visible: None,
        created_at: 0,
        updated_at: 0,
    }
}

fn version(id: &str, annotation_id: &str, number: u32) -> AnnotationVersion {
    AnnotationVersion {
        id: id.into(),
        annotation_id: annotation_id.into(),
        user_id: "u1".into(),
        version: number,
        kind: AnnotationKind::Rectangle,
        coordinates: Coordinates::Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
        color: "#ff0000".into(),
        label: None,
        change_description: None,
        created_at: 0,
    }
}

fn fast_config() -> SyncConfig {
    SyncConfig { poll_min_ms: 8_000, poll_max_ms: 10_000, ..SyncConfig::default() }
}

// =============================================================
// poll_once
// =============================================================

#[tokio::test]
async fn poll_once_passes_through_backend_data() {
    let source = FakeSource {
        annotations: vec![ann("a1", "me"), ann("a2", "peer-b")],
        versions: vec![version("v1", "a1", 1)],
        ..FakeSource::default()
    };
    let update = poll_once(&source, "case-1", "me", true).await;
    assert_eq!(update.peers.len(), 1);
    assert_eq!(update.peers[0].peer_id, "peer-b");
    assert_eq!(update.versions.as_ref().map(Vec::len), Some(1));
    assert_eq!(update.notice, None);
}

#[tokio::test]
async fn failed_peer_fetch_falls_back_to_demo_peers() {
    let source = FakeSource { fail_peers: true, ..FakeSource::default() };
    let update = poll_once(&source, "case-1", "me", true).await;
    assert_eq!(update.peers.len(), 1);
    assert_eq!(update.peers[0].peer_id, MOCK_PEER_ID);
    assert!(update.peers[0].annotations.iter().all(|a| a.case_id == "case-1"));
    assert!(update.notice.unwrap().contains("demo"));
}

#[tokio::test]
async fn failed_peer_fetch_without_mock_is_empty() {
    let source = FakeSource { fail_peers: true, ..FakeSource::default() };
    let update = poll_once(&source, "case-1", "me", false).await;
    assert!(update.peers.is_empty());
    assert!(update.notice.is_some());
}

#[tokio::test]
async fn failed_version_fetch_keeps_versions() {
    let source = FakeSource { fail_versions: true, ..FakeSource::default() };
    let update = poll_once(&source, "case-1", "me", true).await;
    assert_eq!(update.versions, None);
    assert!(update.notice.unwrap().contains("Version history"));
}

// =============================================================
// SyncUpdate::apply
// =============================================================

#[test]
fn apply_fills_overlays_without_touching_local_list() {
    let mut engine = Engine::new("case-1", "me");
    let own = engine
        .create_annotation(AnnotationKind::Circle, Coordinates::Circle { x: 5.0, y: 5.0, radius: 2.0 }, None)
        .unwrap();
    let update = SyncUpdate {
        peers: group_by_peer(vec![ann("p1", "peer-a"), ann("p2", "peer-b")], "me"),
        versions: Some(vec![version("v1", &own.id, 1)]),
        notice: None,
    };
    update.apply(&mut engine);
    assert_eq!(engine.annotations(), std::slice::from_ref(&own));
    let view = engine.view();
    assert_eq!(view.peer_annotations.len(), 2);
    assert_eq!(view.versions.len(), 1);
}

#[test]
fn reapply_keeps_visibility_and_drops_departed_peers() {
    let mut engine = Engine::new("case-1", "me");
    let first = SyncUpdate {
        peers: group_by_peer(vec![ann("p1", "peer-a"), ann("p2", "peer-b")], "me"),
        versions: None,
        notice: None,
    };
    first.apply(&mut engine);
    engine.set_peer_visibility("peer-a", false);

    let second = SyncUpdate { peers: group_by_peer(vec![ann("p1", "peer-a")], "me"), versions: None, notice: None };
    second.apply(&mut engine);
    let peers = engine.view().peer_annotations;
    assert_eq!(peers.len(), 1);
    assert!(!peers["peer-a"].visible);
}

#[test]
fn apply_without_versions_leaves_log_alone() {
    let mut engine = Engine::new("case-1", "me");
    let id = engine
        .create_annotation(AnnotationKind::Circle, Coordinates::Circle { x: 5.0, y: 5.0, radius: 2.0 }, None)
        .unwrap()
        .id;
    engine.save_version(&id, None).unwrap();
    SyncUpdate { peers: Vec::new(), versions: None, notice: Some("offline".into()) }.apply(&mut engine);
    assert_eq!(engine.view().versions.len(), 1);
}

#[test]
fn poll_keeps_locally_saved_versions() {
    let mut engine = Engine::new("case-1", "me");
    let id = engine
        .create_annotation(AnnotationKind::Circle, Coordinates::Circle { x: 5.0, y: 5.0, radius: 2.0 }, None)
        .unwrap()
        .id;
    let saved = engine.save_version(&id, Some("v1".into())).unwrap();

    SyncUpdate { peers: Vec::new(), versions: Some(Vec::new()), notice: None }.apply(&mut engine);
    assert_eq!(engine.view().versions, std::slice::from_ref(&saved));

    let mut remote = version("r1", &id, 1);
    remote.created_at = saved.created_at - 1;
    SyncUpdate { peers: Vec::new(), versions: Some(vec![remote]), notice: None }.apply(&mut engine);
    let numbers: Vec<(String, u32)> = engine.view().versions.iter().map(|v| (v.id.clone(), v.version)).collect();
    assert_eq!(numbers, vec![("r1".to_string(), 1), (saved.id.clone(), 2)]);
}

#[test]
fn poll_does_not_resurrect_locally_deleted_versions() {
    let mut engine = Engine::new("case-1", "me");
    let update = SyncUpdate { peers: Vec::new(), versions: Some(vec![version("v1", "a1", 1)]), notice: None };
    update.apply(&mut engine);
    assert!(engine.delete_version("v1"));
    update.apply(&mut engine);
    assert!(engine.view().versions.is_empty());
}

// =============================================================
// spawn_poller
// =============================================================

#[tokio::test(start_paused = true)]
async fn first_update_is_immediate_then_jittered() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = FakeSource { calls: calls.clone(), ..FakeSource::default() };
    let mut poller = spawn_poller(source, "case-1", "me", &fast_config());

    let start = Instant::now();
    assert!(poller.recv().await.is_some());
    assert_eq!(start.elapsed(), Duration::ZERO);

    let start = Instant::now();
    assert!(poller.recv().await.is_some());
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(8_000), "waited {waited:?}");
    assert!(waited <= Duration::from_millis(10_010), "waited {waited:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_ends_polling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = FakeSource { calls: calls.clone(), ..FakeSource::default() };
    let mut poller = spawn_poller(source, "case-1", "me", &fast_config());
    assert!(poller.recv().await.is_some());
    poller.stop().await;

    let before = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn drop_aborts_polling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = FakeSource { calls: calls.clone(), ..FakeSource::default() };
    let mut poller = spawn_poller(source, "case-1", "me", &fast_config());
    assert!(poller.recv().await.is_some());
    drop(poller);

    let before = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn failures_still_produce_updates() {
    let source = FakeSource { fail_peers: true, fail_versions: true, ..FakeSource::default() };
    let mut poller = spawn_poller(source, "case-1", "me", &fast_config());
    let update = poller.recv().await.unwrap();
    assert_eq!(update.peers[0].peer_id, MOCK_PEER_ID);
    assert_eq!(update.versions, None);
    poller.stop().await;
}
