use super::*;
use crate::doc::Coordinates;

fn make(kind: AnnotationKind, coordinates: Coordinates) -> Annotation {
    Annotation {
        id: crate::doc::new_id(),
        case_id: "c".into(),
        user_id: "u".into(),
        kind,
        coordinates,
        color: "#000".into(),
        label: None,
        locked: None,
        visible: None,
        created_at: 0,
        updated_at: 0,
    }
}

fn rect(x: f64, y: f64, width: f64, height: f64) -> Annotation {
    make(AnnotationKind::Rectangle, Coordinates::Rect { x, y, width, height })
}

fn path(kind: AnnotationKind, pts: &[(f64, f64)]) -> Annotation {
    make(kind, Coordinates::Path { points: pts.iter().map(|&(x, y)| Point::new(x, y)).collect() })
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// point_in_shape: rectangle / text
// =============================================================

#[test]
fn rect_hits_inside_and_border() {
    let r = rect(10.0, 10.0, 100.0, 50.0);
    assert!(point_in_shape(pt(50.0, 30.0), &r));
    assert!(point_in_shape(pt(10.0, 10.0), &r));
    assert!(point_in_shape(pt(110.0, 60.0), &r));
    assert!(!point_in_shape(pt(111.0, 30.0), &r));
    assert!(!point_in_shape(pt(50.0, 9.0), &r));
}

#[test]
fn text_uses_its_box() {
    let t = make(
        AnnotationKind::Text,
        Coordinates::Text { x: 0.0, y: 0.0, width: 40.0, height: 20.0, text: "x".into() },
    );
    assert!(point_in_shape(pt(39.0, 19.0), &t));
    assert!(!point_in_shape(pt(41.0, 10.0), &t));
}

#[test]
fn hidden_annotation_never_hits() {
    let mut r = rect(0.0, 0.0, 100.0, 100.0);
    r.visible = Some(false);
    assert!(!point_in_shape(pt(50.0, 50.0), &r));
}

// =============================================================
// point_in_shape: circle
// =============================================================

#[test]
fn circle_hits_within_radius() {
    let c = make(AnnotationKind::Circle, Coordinates::Circle { x: 50.0, y: 50.0, radius: 20.0 });
    assert!(point_in_shape(pt(50.0, 50.0), &c));
    assert!(point_in_shape(pt(70.0, 50.0), &c));
    assert!(!point_in_shape(pt(65.0, 65.0), &c));
}

// =============================================================
// point_in_shape: polygon
// =============================================================

#[test]
fn polygon_even_odd() {
    let square = path(AnnotationKind::Polygon, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
    assert!(point_in_shape(pt(50.0, 50.0), &square));
    assert!(!point_in_shape(pt(150.0, 50.0), &square));
    assert!(!point_in_shape(pt(-1.0, 50.0), &square));
}

#[test]
fn polygon_concave_notch_is_outside() {
    // U shape: notch between x=40..60 from y=0..60
    let u = path(
        AnnotationKind::Polygon,
        &[(0.0, 0.0), (40.0, 0.0), (40.0, 60.0), (60.0, 60.0), (60.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
    );
    assert!(point_in_shape(pt(20.0, 20.0), &u));
    assert!(!point_in_shape(pt(50.0, 20.0), &u));
    assert!(point_in_shape(pt(50.0, 80.0), &u));
}

#[test]
fn polygon_edge_point_is_deterministic() {
    let square = path(AnnotationKind::Polygon, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]);
    let first = point_in_shape(pt(0.0, 50.0), &square);
    for _ in 0..10 {
        assert_eq!(point_in_shape(pt(0.0, 50.0), &square), first);
    }
}

#[test]
fn polygon_with_too_few_points_never_hits() {
    let single = path(AnnotationKind::Polygon, &[(5.0, 5.0)]);
    assert!(!point_in_shape(pt(5.0, 5.0), &single));
}

// =============================================================
// point_in_shape: freehand
// =============================================================

#[test]
fn freehand_hits_near_segment() {
    let stroke = path(AnnotationKind::Freehand, &[(0.0, 0.0), (100.0, 0.0)]);
    assert!(point_in_shape(pt(50.0, 9.0), &stroke));
    assert!(!point_in_shape(pt(50.0, 11.0), &stroke));
}

#[test]
fn freehand_hits_near_final_point() {
    let stroke = path(AnnotationKind::Freehand, &[(200.0, 200.0)]);
    assert!(point_in_shape(pt(205.0, 205.0), &stroke));
    assert!(!point_in_shape(pt(220.0, 200.0), &stroke));
}

#[test]
fn freehand_open_path_does_not_fill() {
    let l_shape = path(AnnotationKind::Freehand, &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]);
    assert!(!point_in_shape(pt(40.0, 60.0), &l_shape));
}

// =============================================================
// resize_handle_at
// =============================================================

#[test]
fn resize_handle_finds_all_eight() {
    let r = rect(10.0, 10.0, 100.0, 50.0);
    let cases = [
        ((10.0, 10.0), ResizeAnchor::Nw),
        ((60.0, 10.0), ResizeAnchor::N),
        ((110.0, 10.0), ResizeAnchor::Ne),
        ((110.0, 35.0), ResizeAnchor::E),
        ((110.0, 60.0), ResizeAnchor::Se),
        ((60.0, 60.0), ResizeAnchor::S),
        ((10.0, 60.0), ResizeAnchor::Sw),
        ((10.0, 35.0), ResizeAnchor::W),
    ];
    for ((x, y), expected) in cases {
        assert_eq!(resize_handle_at(pt(x, y), &r), Some(expected), "at ({x}, {y})");
    }
}

#[test]
fn resize_handle_tolerance() {
    let r = rect(10.0, 10.0, 100.0, 50.0);
    assert_eq!(resize_handle_at(pt(115.0, 65.0), &r), Some(ResizeAnchor::Se));
    assert_eq!(resize_handle_at(pt(60.0, 35.0), &r), None);
}

#[test]
fn non_rectangles_have_no_handles() {
    let c = make(AnnotationKind::Circle, Coordinates::Circle { x: 50.0, y: 50.0, radius: 20.0 });
    assert_eq!(resize_handle_at(pt(50.0, 50.0), &c), None);
    let t = make(
        AnnotationKind::Text,
        Coordinates::Text { x: 0.0, y: 0.0, width: 40.0, height: 20.0, text: String::new() },
    );
    assert_eq!(resize_handle_at(pt(0.0, 0.0), &t), None);
}

#[test]
fn opposite_is_an_involution() {
    for h in ResizeAnchor::ALL {
        assert_eq!(h.opposite().opposite(), h);
        assert_ne!(h.opposite(), h);
    }
}

#[test]
fn edge_handles_move_one_axis() {
    assert!(ResizeAnchor::N.moves_y() && !ResizeAnchor::N.moves_x());
    assert!(ResizeAnchor::E.moves_x() && !ResizeAnchor::E.moves_y());
    assert!(ResizeAnchor::Se.moves_x() && ResizeAnchor::Se.moves_y());
}

// =============================================================
// topmost_hit
// =============================================================

#[test]
fn topmost_hit_prefers_last_drawn() {
    let below = rect(0.0, 0.0, 100.0, 100.0);
    let above = rect(50.0, 50.0, 100.0, 100.0);
    let list = vec![below.clone(), above.clone()];
    assert_eq!(topmost_hit(pt(75.0, 75.0), &list), Some(&above.id));
    assert_eq!(topmost_hit(pt(25.0, 25.0), &list), Some(&below.id));
    assert_eq!(topmost_hit(pt(300.0, 300.0), &list), None);
}
