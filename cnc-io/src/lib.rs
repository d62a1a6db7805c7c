pub mod gcode;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use cnc_core::{
    document::{Arc, Circle, Document, Entity, Line, Point, Polyline, PolylineKind, PolylineVertex},
    geometry::Point2,
};

const DEFAULT_LAYER: &str = "0";
const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

const POLYLINE_CLOSED: i32 = 0x01;
const POLYLINE_POLYGON_MESH: i32 = 0x10;
const POLYLINE_POLYFACE_MESH: i32 = 0x40;
const VERTEX_SPLINE_FRAME: i32 = 0x10;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// ASCII DXF 读取入口，只提取加工需要的二维图元。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        DxfParser::new(source)
            .parse()
            .map_err(|err| IoError::InvalidDocument(err.message))
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.starts_with(BINARY_SENTINEL) {
            return Err(IoError::UnsupportedFeature(format!(
                "二进制 DXF 暂不支持：{}",
                path.display()
            )));
        }
        // 老版本 DXF 常见 ANSI 编码，非 UTF-8 字节替换后继续解析。
        let text = String::from_utf8_lossy(&bytes);
        let document = self.parse_str(&text)?;
        debug!(
            path = %path.display(),
            entities = document.len(),
            "DXF 解析完成"
        );
        Ok(document)
    }
}

#[derive(Debug)]
struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            match code {
                0 => {}
                999 => continue,
                other => {
                    return Err(DxfError::invalid(format!(
                        "意外的组码 {other}（期望 0 表示 SECTION/EOF）"
                    )));
                }
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "TABLES" => self.parse_tables(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    /// 只关心 `$CLAYER`：变量名（组码 9）之后紧跟图层名（组码 8）。
    fn parse_header(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let mut awaiting_layer = false;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some((9, variable)) => awaiting_layer = variable.trim() == "$CLAYER",
                Some((8, layer)) if awaiting_layer => {
                    document.set_current_layer(layer.trim());
                    awaiting_layer = false;
                }
                Some(_) => {}
                None => return Err(DxfError::invalid("HEADER 段未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDSEC" => break,
                    "LAYER" => {
                        let record = self.read_body("LAYER")?;
                        match record.text(2) {
                            Some(name) => document.ensure_layer(name),
                            None => debug!("LAYER 记录缺少名称（组码 2），已忽略"),
                        }
                    }
                    _ => {}
                },
                Some(_) => {}
                None => return Err(DxfError::invalid("TABLES 段未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "POLYLINE" => self.parse_polyline(document)?,
                "POINT" => {
                    let body = self.read_body("POINT")?;
                    document.add_entity(Entity::Point(point_entity(&body)?));
                }
                "VERTEX" => {
                    let body = self.read_body("VERTEX")?;
                    document.add_entity(Entity::Vertex(point_entity(&body)?));
                }
                "LINE" => {
                    let body = self.read_body("LINE")?;
                    document.add_entity(line_entity(&body)?);
                }
                "ARC" => {
                    let body = self.read_body("ARC")?;
                    document.add_entity(arc_entity(&body)?);
                }
                "CIRCLE" => {
                    let body = self.read_body("CIRCLE")?;
                    document.add_entity(circle_entity(&body)?);
                }
                "LWPOLYLINE" => {
                    let body = self.read_body("LWPOLYLINE")?;
                    document.add_entity(lwpolyline_entity(&body)?);
                }
                other => {
                    debug!(kind = other, "跳过不参与加工的实体");
                    self.skip_entity_body()?;
                }
            }
        }
        Ok(())
    }

    /// `POLYLINE` 头之后是若干 `VERTEX`，以 `SEQEND` 收尾。
    fn parse_polyline(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let header = self.read_body("POLYLINE")?;
        let flags = header.int(70, "标志")?.unwrap_or(0);
        let layer = header.layer();
        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        let body = self.read_body("VERTEX")?;
                        let vertex_flags = body.int(70, "顶点标志")?.unwrap_or(0);
                        if vertex_flags & VERTEX_SPLINE_FRAME != 0 {
                            continue;
                        }
                        let position = body.point(10, 20, "顶点")?;
                        let bulge = body.optional_real(42, "bulge")?.unwrap_or(0.0);
                        vertices.push(PolylineVertex::with_bulge(position, bulge));
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value))?;
                        break;
                    }
                },
                Some((code, _)) => {
                    return Err(DxfError::invalid(format!(
                        "POLYLINE 顶点序列遇到组码 {code}（期望 0）"
                    )));
                }
                None => return Err(DxfError::invalid("POLYLINE 未正确结束")),
            }
        }

        if flags & (POLYLINE_POLYGON_MESH | POLYLINE_POLYFACE_MESH) != 0 {
            debug!(layer = %layer, flags, "跳过网格类型的 POLYLINE");
            return Ok(());
        }

        document.add_entity(Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & POLYLINE_CLOSED != 0,
            kind: PolylineKind::Heavy,
            layer,
        }));
        Ok(())
    }

    /// 读取实体的全部组码，直到下一个组码 0（回退给调用者）。
    fn read_body(&mut self, kind: &'static str) -> Result<EntityBody, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value))?;
                    break;
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(EntityBody { kind, pairs })
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value))?;
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

/// 单个实体的组码集合。
struct EntityBody {
    kind: &'static str,
    pairs: Vec<(i32, String)>,
}

impl EntityBody {
    fn layer(&self) -> String {
        self.text(8)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_LAYER)
            .to_string()
    }

    fn text(&self, code: i32) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, value)| value.trim())
    }

    /// 组码至多出现一次。
    fn single(&self, code: i32, what: &str) -> Result<Option<&str>, DxfError> {
        let mut values = self
            .pairs
            .iter()
            .filter(|(candidate, _)| *candidate == code)
            .map(|(_, value)| value.as_str());
        let first = values.next();
        if values.next().is_some() {
            return Err(DxfError::invalid(format!(
                "{} 遇到重复的{what}（组码 {code}）",
                self.kind
            )));
        }
        Ok(first)
    }

    fn optional_real(&self, code: i32, what: &str) -> Result<Option<f64>, DxfError> {
        self.single(code, what)?
            .map(|raw| parse_f64(raw, &format!("{} {what}", self.kind)))
            .transpose()
    }

    fn real(&self, code: i32, what: &str) -> Result<f64, DxfError> {
        self.optional_real(code, what)?.ok_or_else(|| {
            DxfError::invalid(format!("{} 缺少{what}（组码 {code}）", self.kind))
        })
    }

    fn int(&self, code: i32, what: &str) -> Result<Option<i32>, DxfError> {
        self.single(code, what)?
            .map(|raw| parse_i32(raw, &format!("{} {what}", self.kind)))
            .transpose()
    }

    fn point(&self, x_code: i32, y_code: i32, what: &str) -> Result<Point2, DxfError> {
        let x = self.real(x_code, &format!("{what} X"))?;
        let y = self.real(y_code, &format!("{what} Y"))?;
        Ok(Point2::new(x, y))
    }
}

fn point_entity(body: &EntityBody) -> Result<Point, DxfError> {
    Ok(Point {
        position: body.point(10, 20, "位置")?,
        layer: body.layer(),
    })
}

fn line_entity(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Line(Line {
        start: body.point(10, 20, "起点")?,
        end: body.point(11, 21, "终点")?,
        layer: body.layer(),
    }))
}

fn circle_entity(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Circle(Circle {
        center: body.point(10, 20, "圆心")?,
        radius: body.real(40, "半径")?,
        layer: body.layer(),
    }))
}

/// 角度保留为度，转换阶段再换算。
fn arc_entity(body: &EntityBody) -> Result<Entity, DxfError> {
    Ok(Entity::Arc(Arc {
        center: body.point(10, 20, "圆心")?,
        radius: body.real(40, "半径")?,
        start_angle: body.real(50, "起始角")?,
        end_angle: body.real(51, "终止角")?,
        layer: body.layer(),
    }))
}

fn lwpolyline_entity(body: &EntityBody) -> Result<Entity, DxfError> {
    let flags = body.int(70, "标志")?.unwrap_or(0);
    let mut vertices: Vec<PolylineVertex> = Vec::new();
    let mut pending_x: Option<f64> = None;
    for (code, value) in &body.pairs {
        match code {
            10 => {
                let x = parse_f64(value, "LWPOLYLINE 顶点 X")?;
                if pending_x.replace(x).is_some() {
                    return Err(DxfError::invalid(
                        "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                    ));
                }
            }
            20 => {
                let x = pending_x.take().ok_or_else(|| {
                    DxfError::invalid("LWPOLYLINE 顶点缺少对应的 X（组码 10）")
                })?;
                let y = parse_f64(value, "LWPOLYLINE 顶点 Y")?;
                vertices.push(PolylineVertex::new(Point2::new(x, y)));
            }
            42 => {
                let bulge = parse_f64(value, "LWPOLYLINE 顶点 bulge")?;
                let vertex = vertices.last_mut().ok_or_else(|| {
                    DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                })?;
                vertex.bulge = bulge;
            }
            _ => {}
        }
    }

    if pending_x.is_some() {
        return Err(DxfError::invalid(
            "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
        ));
    }

    Ok(Entity::Polyline(Polyline {
        vertices,
        is_closed: flags & POLYLINE_CLOSED != 0,
        kind: PolylineKind::Light,
        layer: body.layer(),
    }))
}

/// 组码/值成对读取，支持回退一对。
struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) -> Result<(), DxfError> {
        if self.buffer.is_some() {
            return Err(DxfError::invalid(format!(
                "第 {} 行附近重复回退组码",
                self.line_number
            )));
        }
        self.buffer = Some(pair);
        Ok(())
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities_section(body: &str) -> String {
        format!("0\nSECTION\n2\nENTITIES\n{body}0\nENDSEC\n0\nEOF\n")
    }

    #[test]
    fn missing_group_is_reported() {
        let source = entities_section("0\nLINE\n8\n0\n10\n1.0\n20\n2.0\n11\n3.0\n");
        let err = DxfFacade::new()
            .parse_str(&source)
            .expect_err("LINE 缺少终点 Y");
        match err {
            IoError::InvalidDocument(message) => {
                assert!(message.contains("组码 21"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_group_is_reported() {
        let source = entities_section("0\nCIRCLE\n10\n1\n10\n2\n20\n0\n40\n1\n");
        assert!(matches!(
            DxfFacade::new().parse_str(&source),
            Err(IoError::InvalidDocument(_))
        ));
    }

    #[test]
    fn unparsable_number_is_reported() {
        let source = entities_section("0\nPOINT\n10\nabc\n20\n0\n");
        assert!(matches!(
            DxfFacade::new().parse_str(&source),
            Err(IoError::InvalidDocument(_))
        ));
    }

    #[test]
    fn unknown_entities_are_skipped() {
        let source = entities_section(
            "0\nTEXT\n8\nNOTES\n10\n0\n20\n0\n1\nhello\n0\nPOINT\n10\n4\n20\n5\n",
        );
        let document = DxfFacade::new().parse_str(&source).expect("parse");
        assert_eq!(document.len(), 1);
        let (_, entity) = document.entities().next().expect("point");
        match entity {
            Entity::Point(point) => {
                assert_eq!(point.position, Point2::new(4.0, 5.0));
                assert_eq!(point.layer, "0");
            }
            other => panic!("unexpected entity {other:?}"),
        }
    }

    #[test]
    fn crlf_and_padded_codes_are_accepted() {
        let source = "  0\r\nSECTION\r\n  2\r\nENTITIES\r\n  0\r\nPOINT\r\n 10\r\n1.5\r\n 20\r\n2.5\r\n  0\r\nENDSEC\r\n  0\r\nEOF\r\n";
        let document = DxfFacade::new().parse_str(source).expect("parse");
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn truncated_file_is_invalid() {
        let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\n";
        assert!(matches!(
            DxfFacade::new().parse_str(source),
            Err(IoError::InvalidDocument(_))
        ));
    }
}
