//! 图纸实体到可连接图元的转换。

use std::f64::consts::PI;

use tracing::debug;

use cnc_core::{
    document::{Arc, Circle, Document, Entity, EntityId, Polyline},
    geometry::{Bounds2D, Point2},
    linkable::{Curve, Linkable, Path, Point, Segment},
};

/// bulge 绝对值小于该值时按直线处理。
const STRAIGHT_BULGE: f64 = 1e-9;

/// 转换结果：图元集合与它们的整体包围盒（为空时没有包围盒）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub linkables: Vec<Linkable>,
    pub bounds: Option<Bounds2D>,
}

impl Conversion {
    pub fn from_linkables(linkables: Vec<Linkable>) -> Self {
        let bounds = linkables
            .iter()
            .map(Linkable::bounds)
            .reduce(|acc, bounds| acc.merge([bounds]));
        Self { linkables, bounds }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.linkables.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.linkables.len()
    }

    /// 拆分为钻孔点和其余图形，各自重新计算包围盒。
    pub fn partition(self) -> (Conversion, Conversion) {
        let (points, shapes): (Vec<_>, Vec<_>) =
            self.linkables.into_iter().partition(Linkable::is_point);
        (
            Conversion::from_linkables(points),
            Conversion::from_linkables(shapes),
        )
    }
}

/// 转换文档中的实体。`layers` 为空表示不过滤图层。
pub fn convert(document: &Document, layers: &[String]) -> Conversion {
    let mut linkables = Vec::new();
    let mut bounds: Option<Bounds2D> = None;
    let mut filtered = 0usize;

    for (id, entity) in document.entities() {
        if !layers.is_empty() && !layers.iter().any(|layer| layer == entity.layer_name()) {
            filtered += 1;
            continue;
        }
        let Some(linkable) = convert_entity(id, entity) else {
            debug!(id = id.get(), kind = entity.kind_name(), "实体无法加工，已跳过");
            continue;
        };
        let entity_bounds = linkable.bounds();
        bounds = Some(match bounds {
            Some(current) => current.merge([entity_bounds]),
            None => entity_bounds,
        });
        linkables.push(linkable);
    }

    debug!(
        converted = linkables.len(),
        filtered,
        "实体转换完成"
    );
    Conversion { linkables, bounds }
}

/// 单个实体的转换；无法加工的实体返回 `None`。
pub fn convert_entity(id: EntityId, entity: &Entity) -> Option<Linkable> {
    let name = format!("#{} / Layer {}", id.get(), entity.layer_name());
    match entity {
        Entity::Point(point) | Entity::Vertex(point) => {
            Some(Point::new(name, point.position).into())
        }
        Entity::Line(line) => Some(Segment::new(name, line.start, line.end).into()),
        Entity::Arc(arc) => Some(arc_curve(name, arc).into()),
        Entity::Circle(circle) => Some(circle_path(&name, circle).into()),
        Entity::Polyline(polyline) => polyline_path(&name, polyline).map(Linkable::from),
    }
}

/// DXF 圆弧按逆时针从起始角扫到终止角；两角重合时是整圆。
///
/// 整圆的终点直接取起点，`Curve::sweep` 依靠两点完全相同来识别整圆。
pub fn arc_curve(name: impl Into<String>, arc: &Arc) -> Curve {
    let start = on_circle(arc.center, arc.radius, arc.start_angle.to_radians());
    let sweep = (arc.end_angle + 360.0 - arc.start_angle).rem_euclid(360.0);
    let full_turn = sweep <= 0.0;
    let end = if full_turn {
        start
    } else {
        on_circle(arc.center, arc.radius, arc.end_angle.to_radians())
    };
    Curve::new(name, start, end, arc.center, arc.radius, full_turn)
}

/// 整圆拆成两个互补的逆时针半圆，便于像普通路径一样反向。
pub fn circle_path(name: &str, circle: &Circle) -> Path {
    let right = on_circle(circle.center, circle.radius, 0.0);
    let left = on_circle(circle.center, circle.radius, PI);
    let mut path = Path::with_first(
        Curve::new(
            format!("{name} (1/2)"),
            right,
            left,
            circle.center,
            circle.radius,
            false,
        )
        .into(),
    );
    path.push(
        Curve::new(
            format!("{name} (2/2)"),
            left,
            right,
            circle.center,
            circle.radius,
            false,
        )
        .into(),
    );
    path
}

/// 多段线逐边转换；闭合多段线补上最后一个顶点回到首顶点的边。
pub fn polyline_path(name: &str, polyline: &Polyline) -> Option<Path> {
    let vertices = &polyline.vertices;
    if vertices.len() < 2 {
        debug!(
            polyline = name,
            vertices = vertices.len(),
            "多段线顶点不足，已跳过"
        );
        return None;
    }

    let mut edges: Vec<Linkable> = vertices
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            bulge_edge(
                format!("{name} #{index}"),
                pair[0].position,
                pair[1].position,
                pair[0].bulge,
            )
        })
        .collect();

    if polyline.is_closed {
        let (first, last) = (&vertices[0], &vertices[vertices.len() - 1]);
        if !last.position.approx_eq(first.position) {
            edges.push(bulge_edge(
                format!("{name} #{}", edges.len()),
                last.position,
                first.position,
                last.bulge,
            ));
        }
    }

    Path::new(edges)
}

/// 由弦和 bulge 求出线段或圆弧。bulge 为正表示逆时针。
pub fn bulge_edge(name: String, start: Point2, end: Point2, bulge: f64) -> Linkable {
    let chord = end.as_vec2() - start.as_vec2();
    let length = chord.length();
    if bulge.abs() < STRAIGHT_BULGE || length <= f64::EPSILON {
        return Segment::new(name, start, end).into();
    }

    let magnitude = bulge.abs();
    let radius = length * (1.0 + magnitude * magnitude) / (4.0 * magnitude);
    let apothem = length * (1.0 - magnitude * magnitude) / (4.0 * magnitude);
    let left_normal = chord.perp() / length;
    let midpoint = (start.as_vec2() + end.as_vec2()) * 0.5;
    let center = midpoint + left_normal * apothem * bulge.signum();

    Curve::new(
        name,
        start,
        end,
        Point2::from_vec(center),
        radius,
        bulge < 0.0,
    )
    .into()
}

#[inline]
fn on_circle(center: Point2, radius: f64, angle: f64) -> Point2 {
    Point2::new(
        center.x() + radius * angle.cos(),
        center.y() + radius * angle.sin(),
    )
}
