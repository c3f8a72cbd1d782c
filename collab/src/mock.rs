//! Demo peer data shown when the backend can't be reached, so the comparison
//! panel still has something to render.

use annotate::doc::{Annotation, AnnotationKind, Coordinates};

use crate::source::{PeerSet, peer_color};

pub const MOCK_PEER_ID: &str = "demo-peer";

/// A single demo peer with two reference annotations on `case_id`.
#[must_use]
pub fn mock_peers(case_id: &str) -> Vec<PeerSet> {
    let annotation = |id: &str, kind, coordinates, color: &str, label: &str| Annotation {
        id: id.to_string(),
        case_id: case_id.to_string(),
        user_id: MOCK_PEER_ID.to_string(),
        kind,
        coordinates,
        color: color.to_string(),
        label: Some(label.to_string()),
        locked: None,
        visible: Some(true),
        created_at: 0,
        updated_at: 0,
    };
    vec![PeerSet {
        peer_id: MOCK_PEER_ID.to_string(),
        annotations: vec![
            annotation(
                "demo-ann-1",
                AnnotationKind::Circle,
                Coordinates::Circle { x: 250.0, y: 150.0, radius: 30.0 },
                "#ef4444",
                "Lesion Area",
            ),
            annotation(
                "demo-ann-2",
                AnnotationKind::Rectangle,
                Coordinates::Rect { x: 350.0, y: 200.0, width: 40.0, height: 25.0 },
                "#3b82f6",
                "Ventricle",
            ),
        ],
        color: peer_color(0).to_string(),
    }]
}
