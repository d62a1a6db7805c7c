use std::path::PathBuf;

use cnc_core::{
    document::{Entity, PolylineKind},
    geometry::Point2,
};
use cnc_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

fn assert_point(actual: Point2, x: f64, y: f64) {
    assert!((actual.x() - x).abs() < 1e-9, "x: {actual}");
    assert!((actual.y() - y).abs() < 1e-9, "y: {actual}");
}

#[test]
fn load_basic_entities() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");

    assert_eq!(doc.current_layer(), Some("CUT"));
    assert_eq!(doc.layer_names(), vec!["0", "CUT", "HOLES"]);
    assert_eq!(doc.len(), 9);

    let kinds: Vec<&str> = doc.entities().map(|(_, entity)| entity.kind_name()).collect();
    assert_eq!(
        kinds,
        vec![
            "POINT",
            "POINT",
            "LINE",
            "LINE",
            "ARC",
            "CIRCLE",
            "LWPOLYLINE",
            "POLYLINE",
            "VERTEX",
        ]
    );
}

#[test]
fn arc_angles_stay_in_degrees() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");
    let arc = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Arc(arc) => Some(arc),
            _ => None,
        })
        .expect("未找到圆弧");

    assert_point(arc.center, 20.0, 20.0);
    assert!((arc.radius - 10.0).abs() < 1e-9);
    assert!((arc.start_angle - 0.0).abs() < 1e-9);
    assert!((arc.end_angle - 90.0).abs() < 1e-9);
    assert_eq!(arc.layer, "CUT");
}

#[test]
fn light_polyline_keeps_bulge_and_closed_flag() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");
    let polyline = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Polyline(polyline) if polyline.kind == PolylineKind::Light => Some(polyline),
            _ => None,
        })
        .expect("未找到 LWPOLYLINE");

    assert!(polyline.is_closed);
    assert_eq!(polyline.vertices.len(), 3);
    assert_point(polyline.vertices[1].position, 10.0, 20.0);
    assert!((polyline.vertices[1].bulge - 1.0).abs() < 1e-9);
    assert!(polyline.vertices[0].bulge.abs() < 1e-9);
    assert!(polyline.vertices[2].bulge.abs() < 1e-9);
}

#[test]
fn heavy_polyline_collects_vertices_until_seqend() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");
    let polyline = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Polyline(polyline) if polyline.kind == PolylineKind::Heavy => Some(polyline),
            _ => None,
        })
        .expect("未找到 POLYLINE");

    assert!(!polyline.is_closed);
    assert_eq!(polyline.layer, "CUT");
    assert_eq!(polyline.vertices.len(), 3);
    assert!((polyline.vertices[1].bulge + 0.5).abs() < 1e-9);
    assert_point(polyline.vertices[2].position, 60.0, 10.0);

    let vertex = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Vertex(vertex) => Some(vertex),
            _ => None,
        })
        .expect("SEQEND 之后的独立 VERTEX");
    assert_point(vertex.position, 70.0, 70.0);
    assert_eq!(vertex.layer, "HOLES");
}

#[test]
fn mesh_polylines_are_skipped() {
    let doc = DxfFacade::new()
        .load(&fixture("mesh_polyline.dxf"))
        .expect("读取 DXF 失败");
    assert_eq!(doc.len(), 1);
    assert!(matches!(doc.entities().next(), Some((_, Entity::Line(_)))));
    assert!(doc.current_layer().is_none());
}

#[test]
fn binary_dxf_is_unsupported() {
    let err = DxfFacade::new()
        .load(&fixture("binary.dxf"))
        .expect_err("二进制 DXF 不应被接受");
    assert!(matches!(err, IoError::UnsupportedFeature(_)));
}

#[test]
fn missing_file_reports_path() {
    let err = DxfFacade::new()
        .load(&fixture("does_not_exist.dxf"))
        .expect_err("文件不存在");
    match err {
        IoError::ReadError { path, .. } => assert!(path.ends_with("does_not_exist.dxf")),
        other => panic!("unexpected error {other:?}"),
    }
}
