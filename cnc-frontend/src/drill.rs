use std::io::Write;

use tracing::info;

use cnc_config::MachiningConfig;
use cnc_engine::job::Job;
use cnc_io::gcode::{GcodeOptions, write_linkable, write_postamble, write_preamble};

use crate::errors::FrontendError;

/// 钻孔：每一刀深度下按最近邻顺序走遍所有点。
pub fn drill<W: Write + ?Sized>(
    out: &mut W,
    job: &Job,
    config: &MachiningConfig,
) -> Result<(), FrontendError> {
    let plan = job.drill_plan();
    let depths = config.pass_depths();
    let offset = config.origin.resolve(plan.bounds.as_ref());
    info!(points = plan.len(), passes = depths.len(), "生成钻孔程序");

    write_preamble(out, config.security_z, &config.before_script)?;
    for (pass, depth) in depths.iter().enumerate() {
        let options = GcodeOptions {
            depth: *depth,
            feed: config.feed,
            security_z: config.security_z,
            offset,
            ..GcodeOptions::default()
        };
        for (index, point) in plan.items.iter().enumerate() {
            write!(
                out,
                ";\n;=== Drilling #{index} {}/{} ===\n",
                pass + 1,
                depths.len()
            )?;
            write_linkable(out, point, &options)?;
        }
    }
    write_postamble(out, &config.after_script)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use cnc_core::document::Document;
    use cnc_core::geometry::Point2;
    use cnc_core::origin::Origin;

    use super::*;

    fn render(job: &Job, config: &MachiningConfig) -> String {
        let mut buffer = Vec::new();
        drill(&mut buffer, job, config).expect("drill");
        String::from_utf8(buffer).expect("utf8")
    }

    fn holes() -> Job {
        let mut document = Document::new();
        document.add_point(Point2::new(10.0, 0.0), "HOLES");
        document.add_point(Point2::new(2.0, 3.0), "HOLES");
        document.add_line(Point2::new(0.0, 0.0), Point2::new(5.0, 5.0), "CUT");
        Job::new(document, Vec::new())
    }

    #[test]
    fn points_are_drilled_nearest_first() {
        let output = render(&holes(), &MachiningConfig::default());
        assert!(output.starts_with("G90\nG21\nG0 Z5.0\n"));
        let first = output.find("G0 X2.000 Y3.000").expect("first hole");
        let second = output.find("G0 X10.000 Y0.000").expect("second hole");
        assert!(first < second);
        assert!(output.contains(";=== Drilling #0 1/1 ===\n;------ Point"));
        assert!(output.contains("G1 Z-1.000 F60.000; Tool down\nG0 Z5.000; Tool up\n"));
        assert!(!output.contains("Segment"));
        assert!(output.ends_with("G0X0Y0\n"));
    }

    #[test]
    fn every_pass_revisits_every_point() {
        let config = MachiningConfig {
            deepness: 12.0,
            deep_per_try: 5.0,
            ..MachiningConfig::default()
        };
        let output = render(&holes(), &config);
        assert_eq!(output.matches(";------ Point").count(), 6);
        assert!(output.contains(";=== Drilling #1 3/3 ==="));
        assert!(output.contains("G1 Z-10.000"));
        assert!(output.contains("G1 Z-12.000"));
    }

    #[test]
    fn relative_origin_uses_point_box() {
        let config = MachiningConfig {
            origin: Origin::relative(1.0, 1.0),
            ..MachiningConfig::default()
        };
        let output = render(&holes(), &config);
        // 点的包围盒最小角为 (2,0)，偏移量为 (3,1)
        assert!(output.contains("G0 X-1.000 Y2.000"));
        assert!(output.contains("G0 X7.000 Y-1.000"));
    }
}
