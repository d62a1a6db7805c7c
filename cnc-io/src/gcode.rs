//! gcode 文本输出。
//!
//! 几何始终保持图纸坐标，偏移量只在写出时扣除。

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

use cnc_core::{
    geometry::{Point2, Vector2},
    linkable::{Curve, Linkable, Path, Point, Segment},
};

#[derive(Debug, Error)]
pub enum GcodeError {
    #[error("failed to write gcode: {0}")]
    Io(#[from] io::Error),
}

/// 单次写出使用的加工参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcodeOptions {
    /// 切削深度（mm，正值表示向下）。
    pub depth: f64,
    /// 进给速度（mm/min）。
    pub feed: f64,
    /// 安全抬刀高度（mm）。
    pub security_z: f64,
    pub offset: Vector2,
    pub skip_tool_down: bool,
    pub skip_tool_up: bool,
}

impl Default for GcodeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            feed: 60.0,
            security_z: 5.0,
            offset: Vector2::ZERO,
            skip_tool_down: false,
            skip_tool_up: false,
        }
    }
}

impl GcodeOptions {
    /// 路径内部元素：不单独下刀、不单独抬刀。
    #[inline]
    pub fn chained(mut self) -> Self {
        self.skip_tool_down = true;
        self.skip_tool_up = true;
        self
    }

    fn x(&self, point: Point2) -> f64 {
        tidy(point.x() - self.offset.x())
    }

    fn y(&self, point: Point2) -> f64 {
        tidy(point.y() - self.offset.y())
    }

    fn cut_z(&self) -> f64 {
        tidy(-self.depth)
    }
}

/// 坐标按三位小数输出；舍入后为零的值写成 `0.000` 而不是 `-0.000`。
#[inline]
fn tidy(value: f64) -> f64 {
    if (value * 1000.0).round() == 0.0 { 0.0 } else { value }
}

/// 程序头：绝对坐标、毫米单位、抬到安全高度，然后是自定义脚本。
pub fn write_preamble<W: Write + ?Sized>(
    out: &mut W,
    security_z: f64,
    before_script: &str,
) -> Result<(), GcodeError> {
    write!(out, "G90\nG21\nG0 Z{:.1}\n", security_z)?;
    write_script(out, before_script)
}

pub fn write_postamble<W: Write + ?Sized>(
    out: &mut W,
    after_script: &str,
) -> Result<(), GcodeError> {
    write_script(out, after_script)
}

fn write_script<W: Write + ?Sized>(out: &mut W, script: &str) -> Result<(), GcodeError> {
    let script = script.trim_end();
    if !script.is_empty() {
        writeln!(out, "{script}")?;
    }
    Ok(())
}

pub fn write_linkable<W: Write + ?Sized>(
    out: &mut W,
    linkable: &Linkable,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    match linkable {
        Linkable::Point(point) => write_point(out, point, options),
        Linkable::Segment(segment) => write_segment(out, segment, options),
        Linkable::Curve(curve) => write_curve(out, curve, options),
        Linkable::Path(path) => write_path(out, path, options),
    }
}

/// 钻孔：快速定位、下刀、抬刀。
pub fn write_point<W: Write + ?Sized>(
    out: &mut W,
    point: &Point,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    let position = point.coordinates;
    write!(
        out,
        ";------ Point {}\nG0 X{:.3} Y{:.3}\nG1 Z{:.3} F{:.3}; Tool down\nG0 Z{:.3}; Tool up\n",
        point.name,
        options.x(position),
        options.y(position),
        options.cut_z(),
        options.feed,
        options.security_z,
    )?;
    Ok(())
}

pub fn write_segment<W: Write + ?Sized>(
    out: &mut W,
    segment: &Segment,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    writeln!(out, ";------ Segment {}", segment.name)?;
    tool_down(out, segment.start, options)?;
    linear_move(out, segment.end, options)?;
    tool_up(out, options)
}

/// 顺时针输出 G2，逆时针输出 G3；I/J 为圆心相对起点的增量。
pub fn write_curve<W: Write + ?Sized>(
    out: &mut W,
    curve: &Curve,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    writeln!(out, ";------ Curve {}", curve.name)?;
    tool_down(out, curve.start, options)?;
    if curve.is_straight() {
        linear_move(out, curve.end, options)?;
    } else {
        let code = if curve.clockwise { 2 } else { 3 };
        let offset = curve.start.vector_to(curve.center);
        writeln!(
            out,
            "G{code} X{:.3} Y{:.3} I{:.3} J{:.3} F{:.3}",
            options.x(curve.end),
            options.y(curve.end),
            tidy(offset.x()),
            tidy(offset.y()),
            options.feed,
        )?;
    }
    tool_up(out, options)
}

/// 整条路径只下刀、抬刀各一次。
pub fn write_path<W: Write + ?Sized>(
    out: &mut W,
    path: &Path,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    tool_down(out, path.start(), options)?;
    let inner = options.chained();
    for element in path.elements() {
        write_linkable(out, element, &inner)?;
    }
    tool_up(out, options)
}

fn tool_down<W: Write + ?Sized>(
    out: &mut W,
    start: Point2,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    if options.skip_tool_down {
        return Ok(());
    }
    write!(
        out,
        "G0 X{:.3} Y{:.3}\nG1 Z{:.3} F{:.3}; Tool down\n",
        options.x(start),
        options.y(start),
        options.cut_z(),
        options.feed,
    )?;
    Ok(())
}

fn tool_up<W: Write + ?Sized>(out: &mut W, options: &GcodeOptions) -> Result<(), GcodeError> {
    if options.skip_tool_up {
        return Ok(());
    }
    writeln!(out, "G0 Z{:.3}; Tool up", options.security_z)?;
    Ok(())
}

fn linear_move<W: Write + ?Sized>(
    out: &mut W,
    target: Point2,
    options: &GcodeOptions,
) -> Result<(), GcodeError> {
    writeln!(
        out,
        "G1 X{:.3} Y{:.3} F{:.3}",
        options.x(target),
        options.y(target),
        options.feed,
    )?;
    Ok(())
}

/// 跟踪刀具位置、累计行程与预计耗时，并输出 G1 移动。
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    position: Point2,
    z: f64,
    distance: f64,
    duration: Duration,
}

impl Machine {
    pub fn new(position: Point2, z: f64) -> Self {
        Self {
            position,
            z,
            distance: 0.0,
            duration: Duration::ZERO,
        }
    }

    /// 累计行程（mm）。
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn move_to_xy<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        target: Point2,
        feed: f64,
    ) -> Result<(), GcodeError> {
        self.account(self.position.distance(target), feed);
        self.position = target;
        writeln!(
            out,
            "G1 X{:.3} Y{:.3} F{:.0}",
            tidy(target.x()),
            tidy(target.y()),
            feed
        )?;
        Ok(())
    }

    pub fn move_to_z<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        z: f64,
        feed: f64,
    ) -> Result<(), GcodeError> {
        self.account((self.z - z).abs(), feed);
        self.z = z;
        writeln!(out, "G1 Z{:.3} F{:.0}", tidy(z), feed)?;
        Ok(())
    }

    fn account(&mut self, distance: f64, feed: f64) {
        self.distance += distance;
        if feed > 0.0 {
            self.duration += Duration::from_secs_f64(distance * 60.0 / feed);
        }
    }
}
