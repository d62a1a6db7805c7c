use std::io::Write;

use cnc_core::document::{Entity, PolylineKind};
use cnc_engine::convert::convert;
use cnc_engine::job::Job;

use crate::errors::FrontendError;

/// 单个图层内各类实体的数量。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCounts {
    pub points: usize,
    pub lines: usize,
    pub circles: usize,
    pub arcs: usize,
    pub polylines: usize,
    pub light_polylines: usize,
    pub vertices: usize,
}

impl LayerCounts {
    pub fn count<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut counts = Self::default();
        for entity in entities {
            match entity {
                Entity::Point(_) => counts.points += 1,
                Entity::Vertex(_) => counts.vertices += 1,
                Entity::Line(_) => counts.lines += 1,
                Entity::Circle(_) => counts.circles += 1,
                Entity::Arc(_) => counts.arcs += 1,
                Entity::Polyline(polyline) => match polyline.kind {
                    PolylineKind::Heavy => counts.polylines += 1,
                    PolylineKind::Light => counts.light_polylines += 1,
                },
            }
        }
        counts
    }

    fn labelled(&self) -> [(&'static str, usize); 7] {
        [
            ("Points", self.points),
            ("Lines", self.lines),
            ("Circles", self.circles),
            ("Arcs", self.arcs),
            ("Polylines", self.polylines),
            ("Light polylines", self.light_polylines),
            ("Vertices", self.vertices),
        ]
    }
}

/// 输出图层列表、默认图层、每层实体统计与包围盒。
pub fn describe<W: Write + ?Sized>(out: &mut W, job: &Job) -> Result<(), FrontendError> {
    let document = job.document();
    writeln!(out, "{} layer(s) found:", document.layers().count())?;

    for layer in job.selected_layers() {
        let marker = if document.current_layer() == Some(layer.as_str()) {
            " [default]"
        } else {
            ""
        };
        writeln!(out, "\t* {layer}{marker}")?;

        let counts = LayerCounts::count(
            document
                .entities()
                .map(|(_, entity)| entity)
                .filter(|entity| entity.layer_name() == layer),
        );
        for (label, value) in counts.labelled() {
            if value > 0 {
                writeln!(out, "\t\t{label}: {value}")?;
            }
        }

        if let Some(bounds) = convert(document, std::slice::from_ref(&layer)).bounds {
            writeln!(out, "\t\tBox {bounds}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cnc_core::document::Document;
    use cnc_core::geometry::Point2;

    use super::*;

    fn sample() -> Document {
        let mut document = Document::new();
        document.set_current_layer("CUT");
        document.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "CUT");
        document.add_arc(Point2::new(0.0, 0.0), 5.0, 0.0, 90.0, "CUT");
        document.add_polyline(
            [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
            false,
            "CUT",
        );
        document.add_point(Point2::new(3.0, 4.0), "HOLES");
        document.add_point(Point2::new(5.0, 6.0), "HOLES");
        document
    }

    fn render(job: &Job) -> String {
        let mut buffer = Vec::new();
        describe(&mut buffer, job).expect("describe");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn lists_every_layer_with_counts() {
        let output = render(&Job::new(sample(), Vec::new()));
        let expected = "\
3 layer(s) found:
\t* 0
\t* CUT [default]
\t\tLines: 1
\t\tArcs: 1
\t\tLight polylines: 1
\t\tBox [(0.000, 0.000), (10.000, 5.000)]
\t* HOLES
\t\tPoints: 2
\t\tBox [(3.000, 4.000), (5.000, 6.000)]
";
        assert_eq!(output, expected);
    }

    #[test]
    fn configured_layers_restrict_listing() {
        let output = render(&Job::new(sample(), vec!["HOLES".to_string()]));
        assert!(output.starts_with("3 layer(s) found:\n\t* HOLES\n"));
        assert!(!output.contains("CUT"));
    }
}
