pub mod linkable;
pub mod origin;

pub mod errors {
    use thiserror::Error;

    /// 文本形式的坐标、区域解析失败。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ParseError {
        #[error("坐标格式应为 x,y（实际：\"{0}\"）")]
        Coordinates(String),
        #[error("区域格式应为 x0,y0,x1,y1（实际：\"{0}\"）")]
        Area(String),
        #[error("数值 \"{0}\" 无法解析")]
        Number(String),
    }
}

pub mod geometry {
    use std::fmt;
    use std::str::FromStr;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::errors::ParseError;

    /// 两点平方距离小于该值即视为重合。
    pub const COINCIDENCE_TOLERANCE: f64 = 1e-5;

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        pub const ORIGIN: Point2 = Point2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        /// 平方距离，即排序时使用的“权重”。
        #[inline]
        pub fn distance_squared(self, other: Point2) -> f64 {
            self.0.distance_squared(other.0)
        }

        /// 容差意义下的相等，阈值见 [`COINCIDENCE_TOLERANCE`]。
        #[inline]
        pub fn approx_eq(self, other: Point2) -> bool {
            self.distance_squared(other) < COINCIDENCE_TOLERANCE
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    impl fmt::Display for Point2 {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({:.3}, {:.3})", self.x(), self.y())
        }
    }

    impl FromStr for Point2 {
        type Err = ParseError;

        /// 解析 `x,y` 形式的坐标，允许空白。
        fn from_str(raw: &str) -> Result<Self, Self::Err> {
            let parts: Vec<&str> = raw.split(',').collect();
            if parts.len() != 2 {
                return Err(ParseError::Coordinates(raw.to_string()));
            }
            let x = parse_number(parts[0])?;
            let y = parse_number(parts[1])?;
            Ok(Self::new(x, y))
        }
    }

    /// 二维向量，目前主要表示刀具原点偏移。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，保证 `min <= max`（分量意义下）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        /// 由任意两个对角点构造，自动按分量排序。
        #[inline]
        pub fn new(a: Point2, b: Point2) -> Self {
            Self {
                min: Point2::from_vec(a.as_vec2().min(b.as_vec2())),
                max: Point2::from_vec(a.as_vec2().max(b.as_vec2())),
            }
        }

        /// 退化为单点的包围盒。
        #[inline]
        pub fn from_point(point: Point2) -> Self {
            Self {
                min: point,
                max: point,
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 合并若干包围盒：最小值取分量最小，最大值取分量最大。
        pub fn merge(mut self, others: impl IntoIterator<Item = Bounds2D>) -> Self {
            for other in others {
                self.include_bounds(&other);
            }
            self
        }

        #[inline]
        pub fn contains(&self, point: Point2) -> bool {
            point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }
    }

    impl fmt::Display for Bounds2D {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "[{}, {}]", self.min, self.max)
        }
    }

    impl FromStr for Bounds2D {
        type Err = ParseError;

        /// 解析 `x0,y0,x1,y1`，也接受 `[(x0, y0), (x1, y1)]` 这种显示格式。
        fn from_str(raw: &str) -> Result<Self, Self::Err> {
            let cleaned: String = raw
                .chars()
                .filter(|ch| !matches!(ch, '[' | ']' | '(' | ')'))
                .collect();
            let parts: Vec<&str> = cleaned.split(',').collect();
            if parts.len() != 4 {
                return Err(ParseError::Area(raw.to_string()));
            }
            let mut values = [0.0; 4];
            for (slot, part) in values.iter_mut().zip(&parts) {
                *slot = parse_number(part)?;
            }
            Ok(Self::new(
                Point2::new(values[0], values[1]),
                Point2::new(values[2], values[3]),
            ))
        }
    }

    fn parse_number(raw: &str) -> Result<f64, ParseError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| ParseError::Number(raw.trim().to_string()))
    }

}

pub mod document {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::Point2;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于命名或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    /// 图纸中的原始实体，几何参数保持 DXF 原样（角度为度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Point(Point),
        Vertex(Point),
        Line(Line),
        Arc(Arc),
        Circle(Circle),
        Polyline(Polyline),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Point(point) | Entity::Vertex(point) => &point.layer,
                Entity::Line(line) => &line.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Polyline(polyline) => &polyline.layer,
            }
        }

        /// DXF 实体类型名，用于日志与统计。
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Point(_) => "POINT",
                Entity::Vertex(_) => "VERTEX",
                Entity::Line(_) => "LINE",
                Entity::Arc(_) => "ARC",
                Entity::Circle(_) => "CIRCLE",
                Entity::Polyline(polyline) => match polyline.kind {
                    PolylineKind::Heavy => "POLYLINE",
                    PolylineKind::Light => "LWPOLYLINE",
                },
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Point {
        pub position: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以度储存，按 DXF 约定逆时针从起始角扫到终止角。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum PolylineKind {
        /// `POLYLINE` + `VERTEX` 序列。
        Heavy,
        /// `LWPOLYLINE`。
        Light,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub kind: PolylineKind,
        pub layer: String,
    }

    /// 多段线顶点。`bulge` 描述从该顶点到下一顶点的弧度：0 为直线，正值为逆时针。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_layer: Option<String>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        /// 设置默认图层（DXF 头部 `$CLAYER`）。
        pub fn set_current_layer(&mut self, name: impl Into<String>) {
            let name = name.into();
            self.ensure_layer(&name);
            self.current_layer = Some(name);
        }

        #[inline]
        pub fn current_layer(&self) -> Option<&str> {
            self.current_layer.as_deref()
        }

        pub fn add_point(&mut self, position: Point2, layer: impl Into<String>) -> EntityId {
            let layer = layer.into();
            self.add_entity(Entity::Point(Point { position, layer }))
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.add_entity(Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer,
            }))
        }

        /// 添加圆弧，角度单位为度。
        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let collected = vertices
                .into_iter()
                .map(PolylineVertex::new)
                .collect::<Vec<_>>();
            self.add_polyline_with_vertices(collected, is_closed, PolylineKind::Light, layer)
        }

        pub fn add_polyline_with_vertices<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            kind: PolylineKind,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            let layer = layer.into();
            self.add_entity(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                kind,
                layer,
            }))
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// 按名称排序的图层名，便于稳定输出。
        pub fn layer_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.layers.keys().cloned().collect();
            names.sort();
            names
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
            self.entities.iter().map(|(id, entity)| (*id, entity))
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            id
        }
    }

}
