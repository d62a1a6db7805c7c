use std::io::Write;

use tracing::info;

use cnc_config::MachiningConfig;
use cnc_engine::job::Job;
use cnc_io::gcode::{GcodeOptions, write_path, write_postamble, write_preamble};

use crate::errors::FrontendError;

/// 雕刻：相连图形聚合成路径后逐条加工，每条路径按分层深度重复。
pub fn engrave<W: Write + ?Sized>(
    out: &mut W,
    job: &Job,
    config: &MachiningConfig,
) -> Result<(), FrontendError> {
    let plan = job.engrave_plan();
    let depths = config.pass_depths();
    let offset = config.origin.resolve(plan.bounds.as_ref());
    info!(paths = plan.len(), passes = depths.len(), "生成雕刻程序");

    write_preamble(out, config.security_z, &config.before_script)?;
    for (index, path) in plan.items.iter().enumerate() {
        for (pass, depth) in depths.iter().enumerate() {
            let options = GcodeOptions {
                depth: *depth,
                feed: config.feed,
                security_z: config.security_z,
                offset,
                ..GcodeOptions::default()
            };
            write!(
                out,
                ";--- Path #{index} {}/{} ---\n",
                pass + 1,
                depths.len()
            )?;
            write_path(out, path, &options)?;
        }
    }
    write_postamble(out, &config.after_script)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use cnc_core::document::Document;
    use cnc_core::geometry::Point2;

    use super::*;

    fn render(job: &Job, config: &MachiningConfig) -> String {
        let mut buffer = Vec::new();
        engrave(&mut buffer, job, config).expect("engrave");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn connected_lines_are_cut_in_one_plunge() {
        let mut document = Document::new();
        document.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
        document.add_line(Point2::new(10.0, 0.0), Point2::new(10.0, 10.0), "0");
        document.add_point(Point2::new(50.0, 50.0), "0");
        let output = render(&Job::new(document, Vec::new()), &MachiningConfig::default());

        let expected = "\
G90
G21
G0 Z5.0
;--- Path #0 1/1 ---
G0 X0.000 Y0.000
G1 Z-1.000 F60.000; Tool down
;------ Segment #0 / Layer 0
G1 X10.000 Y0.000 F60.000
;------ Segment #1 / Layer 0
G1 X10.000 Y10.000 F60.000
G0 Z5.000; Tool up
G0X0Y0
";
        assert_eq!(output, expected);
    }

    #[test]
    fn passes_repeat_each_path() {
        let mut document = Document::new();
        document.add_circle(Point2::new(0.0, 0.0), 2.0, "0");
        document.add_line(Point2::new(10.0, 0.0), Point2::new(20.0, 0.0), "0");
        let config = MachiningConfig {
            deepness: 2.0,
            deep_per_try: 1.0,
            after_script: String::new(),
            ..MachiningConfig::default()
        };
        let output = render(&Job::new(document, Vec::new()), &config);

        assert_eq!(output.matches("; Tool down").count(), 4);
        assert!(output.contains(";--- Path #0 2/2 ---"));
        assert!(output.contains(";--- Path #1 1/2 ---"));
        assert_eq!(output.matches("G3 ").count(), 4);
        assert!(output.ends_with("; Tool up\n"));
    }
}
