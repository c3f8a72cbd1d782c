//! Collaborator feed for the annotation engine.
//!
//! Fetches other users' annotation sets and the case's version list from the
//! backend on a jittered timer and hands each result to the host as a
//! [`poller::SyncUpdate`]. Updates only ever touch the engine's read-only peer
//! overlays and version list; the local editable annotations are never merged
//! with remote data.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `SyncConfig` parsed from `ANNOTATE_*` environment variables |
//! | [`error`] | `SyncError` |
//! | [`source`] | `CaseSource` trait, `PeerSet`, peer grouping and colors |
//! | [`http`] | reqwest-backed `CaseSource` against the annotation REST API |
//! | [`mock`] | Demo peer data substituted when a fetch fails |
//! | [`poller`] | Background polling task, `Poller` handle, `SyncUpdate` |

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod poller;
pub mod source;

pub use config::SyncConfig;
pub use error::SyncError;
pub use http::HttpSource;
pub use poller::{Poller, SyncUpdate, spawn_poller};
pub use source::{CaseSource, PeerSet};
