//! 平面铣削（铣平）的走刀轨迹。
//!
//! 这里只生成 XY 航点序列，深度与输出由调用方负责。

use std::fmt;
use std::str::FromStr;

use cnc_core::geometry::{Bounds2D, Point2};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceMethod {
    /// 沿 X 方向往返，每行上移一个步距。
    #[default]
    Zigzag,
    /// 由外向内的逆时针矩形螺旋。
    Spiral,
    /// 由外向内的顺时针矩形螺旋。
    SpiralInverted,
    /// 由中心向外的顺时针螺旋。
    SpiralFromCenter,
    /// 由中心向外的逆时针螺旋。
    SpiralFromCenterInverted,
}

impl SurfaceMethod {
    pub const ALL: [SurfaceMethod; 5] = [
        SurfaceMethod::Zigzag,
        SurfaceMethod::Spiral,
        SurfaceMethod::SpiralInverted,
        SurfaceMethod::SpiralFromCenter,
        SurfaceMethod::SpiralFromCenterInverted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceMethod::Zigzag => "zigzag",
            SurfaceMethod::Spiral => "spiral",
            SurfaceMethod::SpiralInverted => "spiral-inverted",
            SurfaceMethod::SpiralFromCenter => "spiral-from-center",
            SurfaceMethod::SpiralFromCenterInverted => "spiral-from-center-inverted",
        }
    }
}

impl fmt::Display for SurfaceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurfaceMethod {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownSurfaceMethod(wanted.to_string()))
    }
}

/// 生成覆盖 `area` 的航点，第一个点即下刀位置，所有点都在区域内。
pub fn waypoints(
    area: &Bounds2D,
    step: f64,
    method: SurfaceMethod,
) -> Result<Vec<Point2>, EngineError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(EngineError::InvalidSurface(format!(
            "步距必须为正数（实际：{step}）"
        )));
    }
    if area.is_empty() || area.width() <= 0.0 || area.height() <= 0.0 {
        return Err(EngineError::InvalidSurface(format!("区域 {area} 面积为 0")));
    }

    let points = match method {
        SurfaceMethod::Zigzag => zigzag(area, step),
        SurfaceMethod::Spiral => spiral(area, step, false),
        SurfaceMethod::SpiralInverted => spiral(area, step, true),
        SurfaceMethod::SpiralFromCenter => {
            let mut points = spiral(area, step, false);
            points.reverse();
            points
        }
        SurfaceMethod::SpiralFromCenterInverted => {
            let mut points = spiral(area, step, true);
            points.reverse();
            points
        }
    };
    Ok(points)
}

fn zigzag(area: &Bounds2D, step: f64) -> Vec<Point2> {
    let (min, max) = (area.min(), area.max());
    // 最后一行贴着上边界
    let rows = (area.height() / step - 1e-9).ceil().max(0.0) as usize;
    let mut points = vec![min];
    let mut at_left = true;
    for row in 0..=rows {
        let y = (min.y() + row as f64 * step).min(max.y());
        let current_x = if at_left { min.x() } else { max.x() };
        push_distinct(&mut points, Point2::new(current_x, y));
        at_left = !at_left;
        let target_x = if at_left { min.x() } else { max.x() };
        push_distinct(&mut points, Point2::new(target_x, y));
    }
    points
}

/// 从左下角开始向内收缩的矩形螺旋；`clockwise` 为真时先沿左边向上。
fn spiral(area: &Bounds2D, step: f64, clockwise: bool) -> Vec<Point2> {
    let (mut x0, mut y0) = (area.min().x(), area.min().y());
    let (mut x1, mut y1) = (area.max().x(), area.max().y());
    let mut points = vec![area.min()];

    while x0 < x1 && y0 < y1 {
        if clockwise {
            push_distinct(&mut points, Point2::new(x0, y1));
            x0 = (x0 + step).min(x1);
            push_distinct(&mut points, Point2::new(x1, y1));
            y1 = (y1 - step).max(y0);
            if x0 < x1 {
                push_distinct(&mut points, Point2::new(x1, y0));
                x1 = (x1 - step).max(x0);
            }
            if y0 < y1 {
                push_distinct(&mut points, Point2::new(x0, y0));
                y0 = (y0 + step).min(y1);
            }
        } else {
            push_distinct(&mut points, Point2::new(x1, y0));
            y0 = (y0 + step).min(y1);
            push_distinct(&mut points, Point2::new(x1, y1));
            x1 = (x1 - step).max(x0);
            if y0 < y1 {
                push_distinct(&mut points, Point2::new(x0, y1));
                y1 = (y1 - step).max(y0);
            }
            if x0 < x1 {
                push_distinct(&mut points, Point2::new(x0, y0));
                x0 = (x0 + step).min(x1);
            }
        }
    }

    // 剩下的区域已退化为线段或点，补走一遍
    push_distinct(&mut points, Point2::new(x0, y0));
    push_distinct(&mut points, Point2::new(x1, y1));
    points
}

fn push_distinct(points: &mut Vec<Point2>, point: Point2) {
    if points.last().is_none_or(|last| !last.approx_eq(point)) {
        points.push(point);
    }
}
