use std::io::Write;
use std::time::Duration;

use tracing::info;

use cnc_config::MachiningConfig;
use cnc_core::geometry::Bounds2D;
use cnc_engine::surface::{SurfaceMethod, waypoints};
use cnc_io::gcode::{Machine, write_postamble, write_preamble};

use crate::errors::FrontendError;

/// 铣平矩形区域。区域坐标直接作为机床坐标输出，不做原点偏移。
///
/// 每一刀的深度为 `deep_start` 加上分层深度；总行程与预计耗时写入 `report`。
pub fn surface<W, R>(
    out: &mut W,
    report: &mut R,
    area: &Bounds2D,
    step: f64,
    method: SurfaceMethod,
    config: &MachiningConfig,
) -> Result<(), FrontendError>
where
    W: Write + ?Sized,
    R: Write + ?Sized,
{
    let route = waypoints(area, step, method)?;
    let depths = config.pass_depths();
    info!(
        area = %area,
        step,
        method = %method,
        passes = depths.len(),
        "生成铣平程序"
    );

    write_preamble(out, config.security_z, &config.before_script)?;

    let mut distance = 0.0;
    let mut duration = Duration::ZERO;
    for (pass, depth) in depths.iter().enumerate() {
        write!(out, ";\n;=== Surface {}/{} ===\n", pass + 1, depths.len())?;
        let Some((&entry, rest)) = route.split_first() else {
            continue;
        };
        write!(
            out,
            "G0 Z{:.1}\nG0 X{:.3} Y{:.3}\n",
            config.security_z,
            entry.x(),
            entry.y()
        )?;

        let mut machine = Machine::new(entry, config.security_z);
        machine.move_to_z(out, -(config.deep_start + depth), config.feed)?;
        for waypoint in rest {
            machine.move_to_xy(out, *waypoint, config.feed)?;
        }
        distance += machine.distance();
        duration += machine.duration();
    }

    writeln!(out, "G0 Z{:.1}", config.security_z)?;
    write_postamble(out, &config.after_script)?;

    write!(
        report,
        "; Total distance: {distance:.1} mm\n; Total time: {}\n",
        format_duration(duration)
    )?;
    Ok(())
}

/// 按秒取整后输出为 `1h2m3s` 形式。
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
