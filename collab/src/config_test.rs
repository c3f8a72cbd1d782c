use std::collections::HashMap;

use super::*;

fn config_from(pairs: &[(&str, &str)]) -> SyncConfig {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    SyncConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn defaults_when_unset() {
    assert_eq!(config_from(&[]), SyncConfig::default());
}

#[test]
fn parses_overrides() {
    let cfg = config_from(&[
        ("ANNOTATE_BASE_URL", "https://pacs.example.test/"),
        ("ANNOTATE_POLL_MIN_MS", "500"),
        ("ANNOTATE_POLL_MAX_MS", "900"),
        ("ANNOTATE_FALLBACK_MOCK", "false"),
        ("ANNOTATE_REQUEST_TIMEOUT_SECS", "5"),
    ]);
    assert_eq!(cfg.base_url, "https://pacs.example.test");
    assert_eq!((cfg.poll_min_ms, cfg.poll_max_ms), (500, 900));
    assert!(!cfg.fallback_mock);
    assert_eq!(cfg.request_timeout_secs, 5);
    assert_eq!(cfg.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
}

#[test]
fn garbage_values_fall_back_to_defaults() {
    let cfg = config_from(&[("ANNOTATE_POLL_MIN_MS", "soon"), ("ANNOTATE_FALLBACK_MOCK", "maybe")]);
    assert_eq!(cfg.poll_min_ms, DEFAULT_POLL_MIN_MS);
    assert!(cfg.fallback_mock);
}

#[test]
fn inverted_bounds_collapse_to_min() {
    let cfg = config_from(&[("ANNOTATE_POLL_MIN_MS", "3000"), ("ANNOTATE_POLL_MAX_MS", "1000")]);
    assert_eq!((cfg.poll_min_ms, cfg.poll_max_ms), (3000, 3000));
}

#[test]
fn zero_interval_is_raised() {
    let cfg = config_from(&[("ANNOTATE_POLL_MIN_MS", "0"), ("ANNOTATE_POLL_MAX_MS", "0")]);
    assert_eq!((cfg.poll_min_ms, cfg.poll_max_ms), (1, 1));
}

#[test]
fn flag_accepts_common_spellings() {
    assert!(!config_from(&[("ANNOTATE_FALLBACK_MOCK", "0")]).fallback_mock);
    assert!(!config_from(&[("ANNOTATE_FALLBACK_MOCK", "OFF")]).fallback_mock);
    assert!(config_from(&[("ANNOTATE_FALLBACK_MOCK", "yes")]).fallback_mock);
}
