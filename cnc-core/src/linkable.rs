//! 可连接图元：钻孔点、线段、圆弧与路径。
//!
//! 四种变体共享同一组能力：起止端点、原地反向、与其他图元的连接权重以及包围盒。
//! 排序器只通过 [`Linkable`] 操作它们，不关心具体形状。

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds2D, Point2};

/// 钻孔目标点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    pub coordinates: Point2,
}

impl Point {
    pub fn new(name: impl Into<String>, coordinates: Point2) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub fn new(name: impl Into<String>, start: Point2, end: Point2) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn revert(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }

    pub fn bounds(&self) -> Bounds2D {
        Bounds2D::new(self.start, self.end)
    }
}

/// 圆弧。`clockwise` 为真时按顺时针（G2）从起点走到终点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub name: String,
    pub start: Point2,
    pub end: Point2,
    pub center: Point2,
    pub radius: f64,
    pub clockwise: bool,
}

impl Curve {
    pub fn new(
        name: impl Into<String>,
        start: Point2,
        end: Point2,
        center: Point2,
        radius: f64,
        clockwise: bool,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            center,
            radius,
            clockwise,
        }
    }

    /// 半径为 0 的圆弧退化为直线移动。
    #[inline]
    pub fn is_straight(&self) -> bool {
        self.radius.abs() <= f64::EPSILON
    }

    pub fn revert(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.clockwise = !self.clockwise;
    }

    /// 逆时针方向上的扫角（弧度）。
    ///
    /// 只有起止点完全相同才视为整圆；容差相等只用于路径连接，
    /// 极短的圆弧仍按实际扫角计算。
    pub fn sweep(&self) -> f64 {
        let (from, to) = self.counter_clockwise_ends();
        if from == to {
            return TAU;
        }
        (angle_around(self.center, to) - angle_around(self.center, from)).rem_euclid(TAU)
    }

    /// 紧致包围盒：先取弦的包围盒，再把圆弧扫过的每个轴向极值点纳入。
    pub fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::new(self.start, self.end);
        if self.is_straight() {
            return bounds;
        }

        let radius = self.radius.abs();
        let (from, _) = self.counter_clockwise_ends();
        let from_angle = angle_around(self.center, from);
        let sweep = self.sweep();
        let center = self.center;

        for (cardinal, extreme) in [
            (0.0, Point2::new(center.x() + radius, center.y())),
            (FRAC_PI_2, Point2::new(center.x(), center.y() + radius)),
            (PI, Point2::new(center.x() - radius, center.y())),
            (3.0 * FRAC_PI_2, Point2::new(center.x(), center.y() - radius)),
        ] {
            if (cardinal - from_angle).rem_euclid(TAU) <= sweep {
                bounds.include_point(extreme);
            }
        }
        bounds
    }

    fn counter_clockwise_ends(&self) -> (Point2, Point2) {
        if self.clockwise {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }
}

#[inline]
fn angle_around(center: Point2, point: Point2) -> f64 {
    let delta = point.as_vec2() - center.as_vec2();
    delta.y.atan2(delta.x)
}

/// 一段连续、无需抬刀的加工轨迹，至少包含一个元素。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    elements: Vec<Linkable>,
}

impl Path {
    /// 空序列不能构成路径。
    pub fn new(elements: Vec<Linkable>) -> Option<Self> {
        if elements.is_empty() {
            None
        } else {
            Some(Self { elements })
        }
    }

    pub fn with_first(first: Linkable) -> Self {
        Self {
            elements: vec![first],
        }
    }

    pub fn push(&mut self, element: Linkable) {
        self.elements.push(element);
    }

    #[inline]
    pub fn elements(&self) -> &[Linkable] {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn start(&self) -> Point2 {
        self.elements
            .first()
            .map(Linkable::start)
            .unwrap_or_default()
    }

    pub fn end(&self) -> Point2 {
        self.elements.last().map(Linkable::end).unwrap_or_default()
    }

    pub fn revert(&mut self) {
        self.elements.reverse();
        for element in &mut self.elements {
            element.revert();
        }
    }

    pub fn bounds(&self) -> Bounds2D {
        self.elements
            .iter()
            .fold(Bounds2D::empty(), |acc, element| acc.merge([element.bounds()]))
    }

    /// 展开嵌套路径后的叶子图元数量。
    pub fn leaf_count(&self) -> usize {
        self.elements
            .iter()
            .map(|element| match element {
                Linkable::Path(inner) => inner.leaf_count(),
                _ => 1,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Linkable {
    Point(Point),
    Segment(Segment),
    Curve(Curve),
    Path(Path),
}

impl Linkable {
    pub fn start(&self) -> Point2 {
        match self {
            Linkable::Point(point) => point.coordinates,
            Linkable::Segment(segment) => segment.start,
            Linkable::Curve(curve) => curve.start,
            Linkable::Path(path) => path.start(),
        }
    }

    pub fn end(&self) -> Point2 {
        match self {
            Linkable::Point(point) => point.coordinates,
            Linkable::Segment(segment) => segment.end,
            Linkable::Curve(curve) => curve.end,
            Linkable::Path(path) => path.end(),
        }
    }

    pub fn revert(&mut self) {
        match self {
            Linkable::Point(_) => {}
            Linkable::Segment(segment) => segment.revert(),
            Linkable::Curve(curve) => curve.revert(),
            Linkable::Path(path) => path.revert(),
        }
    }

    /// 从本图元终点到 `other` 起点、终点的平方距离。
    #[inline]
    pub fn weight(&self, other: &Linkable) -> [f64; 2] {
        weight_from(self.end(), other)
    }

    pub fn bounds(&self) -> Bounds2D {
        match self {
            Linkable::Point(point) => Bounds2D::from_point(point.coordinates),
            Linkable::Segment(segment) => segment.bounds(),
            Linkable::Curve(curve) => curve.bounds(),
            Linkable::Path(path) => path.bounds(),
        }
    }

    /// 图元名称；路径没有自己的名字。
    pub fn name(&self) -> Option<&str> {
        match self {
            Linkable::Point(point) => Some(&point.name),
            Linkable::Segment(segment) => Some(&segment.name),
            Linkable::Curve(curve) => Some(&curve.name),
            Linkable::Path(_) => None,
        }
    }

    #[inline]
    pub fn is_point(&self) -> bool {
        matches!(self, Linkable::Point(_))
    }
}

/// 从任意参考点到 `other` 起点、终点的平方距离。
#[inline]
pub fn weight_from(reference: Point2, other: &Linkable) -> [f64; 2] {
    [
        reference.distance_squared(other.start()),
        reference.distance_squared(other.end()),
    ]
}

impl From<Point> for Linkable {
    fn from(value: Point) -> Self {
        Linkable::Point(value)
    }
}

impl From<Segment> for Linkable {
    fn from(value: Segment) -> Self {
        Linkable::Segment(value)
    }
}

impl From<Curve> for Linkable {
    fn from(value: Curve) -> Self {
        Linkable::Curve(value)
    }
}

impl From<Path> for Linkable {
    fn from(value: Path) -> Self {
        Linkable::Path(value)
    }
}
