use super::*;

fn base(raw: &str) -> Url {
    parse_base_url(raw).unwrap()
}

// =============================================================
// URLs
// =============================================================

#[test]
fn endpoint_appends_segments() {
    let url = endpoint(&base("http://127.0.0.1:8000"), &["api", "annotations", "case-1"]).unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/annotations/case-1");
}

#[test]
fn endpoint_keeps_base_prefix_and_drops_trailing_slash() {
    let url = endpoint(&base("https://host.test/backend/"), &["api", "annotations", "c", "versions"]).unwrap();
    assert_eq!(url.as_str(), "https://host.test/backend/api/annotations/c/versions");
}

#[test]
fn endpoint_percent_encodes_case_ids() {
    let url = endpoint(&base("http://h.test"), &["api", "annotations", "a b/c"]).unwrap();
    assert_eq!(url.as_str(), "http://h.test/api/annotations/a%20b%2Fc");
}

#[test]
fn routes_match_backend() {
    let b = base("http://127.0.0.1:8000/");
    assert_eq!(annotations_url(&b, "case-1").unwrap().as_str(), "http://127.0.0.1:8000/api/annotations/case-1");
    assert_eq!(versions_url(&b, "case-1").unwrap().as_str(), "http://127.0.0.1:8000/api/annotations/versions/case-1");
    assert_eq!(
        snapshot_url(&b, "case-1").unwrap().as_str(),
        "http://127.0.0.1:8000/api/annotations/snapshot/case-1"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(matches!(parse_base_url("not a url"), Err(SyncError::InvalidBaseUrl { .. })));
    assert!(matches!(parse_base_url("mailto:someone@example.test"), Err(SyncError::InvalidBaseUrl { .. })));
}

#[test]
fn new_source_uses_configured_base() {
    let cfg = SyncConfig { base_url: "http://pacs.test:9000".into(), ..SyncConfig::default() };
    let source = HttpSource::new(&cfg).unwrap();
    assert_eq!(source.base_url().host_str(), Some("pacs.test"));
    assert_eq!(source.base_url().port(), Some(9000));
}

// =============================================================
// Parsing
// =============================================================

#[test]
fn parse_annotations_skips_malformed_entries() {
    let json = r##"[
        {"id": "a1", "caseId": "c", "userId": "u2", "type": "circle",
         "coordinates": {"x": 250, "y": 150, "radius": 30}, "color": "#ef4444", "label": "Lesion Area"},
        {"id": "a2", "caseId": "c", "userId": "u2", "type": "rectangle",
         "coordinates": {"x": 1, "y": 1, "radius": 3}, "color": "#3b82f6"}
    ]"##;
    let anns = parse_annotations(json).unwrap();
    assert_eq!(anns.len(), 1);
    assert_eq!(anns[0].id, "a1");
    assert_eq!(anns[0].label.as_deref(), Some("Lesion Area"));
}

#[test]
fn parse_annotations_rejects_non_list() {
    assert!(matches!(parse_annotations(r#"{"error": "nope"}"#), Err(SyncError::Parse(_))));
}

#[test]
fn parse_versions_reads_camel_case() {
    let json = r##"[
        {"id": "v1", "annotationId": "a1", "userId": "u2", "version": 1, "type": "rectangle",
         "coordinates": {"x": 0, "y": 0, "width": 10, "height": 5}, "color": "#000000",
         "changeDescription": "first pass", "createdAt": 1700000000000}
    ]"##;
    let versions = parse_versions(json).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].annotation_id, "a1");
    assert_eq!(versions[0].change_description.as_deref(), Some("first pass"));
}

// =============================================================
// Transport
// =============================================================

#[tokio::test]
async fn unreachable_backend_is_a_request_error() {
    let cfg = SyncConfig {
        base_url: "http://127.0.0.1:9".into(),
        connect_timeout_secs: 1,
        request_timeout_secs: 2,
        ..SyncConfig::default()
    };
    let source = HttpSource::new(&cfg).unwrap();
    let err = source.fetch_versions("case-1").await.unwrap_err();
    assert!(matches!(err, SyncError::Request(_)), "got {err:?}");
}

#[tokio::test]
async fn snapshot_to_unreachable_backend_fails() {
    let cfg = SyncConfig { base_url: "http://127.0.0.1:9".into(), connect_timeout_secs: 1, ..SyncConfig::default() };
    let source = HttpSource::new(&cfg).unwrap();
    let engine = annotate::engine::Engine::new("case-1", "u1");
    let err = source.save_snapshot(&engine.case_snapshot(1)).await.unwrap_err();
    assert!(matches!(err, SyncError::Request(_)), "got {err:?}");
}
