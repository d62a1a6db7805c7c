use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cnc_config::{AppConfig, MachiningConfig};
use cnc_core::geometry::Bounds2D;
use cnc_core::origin::Origin;
use cnc_engine::surface::SurfaceMethod;
use cnc_frontend::{drill::drill, engrave::engrave, info::describe, process_files, surface};

#[derive(Parser)]
#[command(name = "cnc-drilling", version, about = "Generate gcode from DXF drawings")]
struct Cli {
    /// Configuration file (defaults to $CNC_CONFIG, then ./config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drill every point of the drawings
    Drill {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        machining: MachiningArgs,
    },
    /// Engrave lines, arcs, circles and polylines as connected paths
    Engrave {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        machining: MachiningArgs,
    },
    /// Surface a rectangular area
    Surface {
        /// Area to surface: minX,minY,maxX,maxY
        #[arg(short, long)]
        area: Bounds2D,
        /// Distance between two passes in the XY plane (mm)
        #[arg(short, long)]
        step: Option<f64>,
        /// zigzag, spiral, spiral-inverted, spiral-from-center, spiral-from-center-inverted
        #[arg(short, long)]
        method: Option<SurfaceMethod>,
        /// Depth where the first pass starts (mm)
        #[arg(long)]
        deep_start: Option<f64>,
        #[command(flatten)]
        machining: MachiningArgs,
    },
    /// Show layers, entity counts and bounding boxes
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Only describe these layers
        #[arg(short, long = "layer")]
        layers: Vec<String>,
    },
    /// Write the effective configuration as TOML (stdout when no path is given)
    SaveConfig { path: Option<PathBuf> },
}

/// 覆盖配置文件中的加工参数。
#[derive(Args, Debug, Default)]
struct MachiningArgs {
    /// Feed rate (mm/min)
    #[arg(long)]
    feed: Option<f64>,
    /// Safe Z height (mm)
    #[arg(long)]
    security_z: Option<f64>,
    /// Final depth (mm)
    #[arg(short = 'd', long = "deep")]
    deep: Option<f64>,
    /// Maximum depth of a single pass (mm)
    #[arg(long)]
    deep_per_try: Option<f64>,
    /// Tool origin: x,y (absolute) or @x,y (relative to the drawing box)
    #[arg(short, long)]
    origin: Option<Origin>,
    /// Only process these layers
    #[arg(short, long = "layer")]
    layers: Vec<String>,
}

impl MachiningArgs {
    /// 覆盖后重新校验，命令行参数与配置文件走同样的检查。
    fn apply(&self, config: &mut MachiningConfig) -> Result<()> {
        if let Some(feed) = self.feed {
            config.feed = feed;
        }
        if let Some(security_z) = self.security_z {
            config.security_z = security_z;
        }
        if let Some(deep) = self.deep {
            config.deepness = deep;
        }
        if let Some(deep_per_try) = self.deep_per_try {
            config.deep_per_try = deep_per_try;
        }
        if let Some(origin) = self.origin {
            config.origin = origin;
        }
        if !self.layers.is_empty() {
            config.layers = self.layers.clone();
        }
        config.validate().context("加工参数无效")?;
        Ok(())
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.as_deref())?;
    run(cli.command, config)
}

/// 显式指定的配置文件必须能读取；自动发现失败时退回内建默认值。
fn load_configuration(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let config = AppConfig::from_file(path)
            .with_context(|| format!("加载配置文件 {} 失败", path.display()))?;
        init_logging(&config);
        return Ok(config);
    }

    let discovered = AppConfig::discover();
    let config = discovered.as_ref().cloned().unwrap_or_default();
    init_logging(&config);
    if let Err(err) = discovered {
        warn!(error = %err, "加载默认配置失败，使用内建默认值");
    }
    Ok(config)
}

fn run(command: Command, mut config: AppConfig) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let success = match command {
        Command::Drill { files, machining } => {
            machining.apply(&mut config.machining)?;
            info!(files = files.len(), "开始钻孔");
            let machining = &config.machining;
            process_files(&files, &machining.layers, &mut out, |out, job| {
                drill(out, job, machining)
            })
            .is_success()
        }
        Command::Engrave { files, machining } => {
            machining.apply(&mut config.machining)?;
            info!(files = files.len(), "开始雕刻");
            let machining = &config.machining;
            process_files(&files, &machining.layers, &mut out, |out, job| {
                engrave(out, job, machining)
            })
            .is_success()
        }
        Command::Info { files, layers } => {
            let layers = if layers.is_empty() {
                config.machining.layers.clone()
            } else {
                layers
            };
            process_files(&files, &layers, &mut out, |out, job| describe(out, job)).is_success()
        }
        Command::Surface {
            area,
            step,
            method,
            deep_start,
            machining,
        } => {
            if let Some(deep_start) = deep_start {
                config.machining.deep_start = deep_start;
            }
            machining.apply(&mut config.machining)?;
            let step = step.unwrap_or(config.surfacing.step);
            let method = match method {
                Some(method) => method,
                None => config.surfacing.method.parse::<SurfaceMethod>()?,
            };
            let stderr = io::stderr();
            let mut report = stderr.lock();
            surface::surface(&mut out, &mut report, &area, step, method, &config.machining)
                .context("铣平失败")?;
            true
        }
        Command::SaveConfig { path } => {
            match path {
                Some(path) => {
                    config
                        .save(&path)
                        .with_context(|| format!("保存配置到 {} 失败", path.display()))?;
                    info!(path = %path.display(), "配置已保存");
                }
                None => out.write_all(config.to_toml()?.as_bytes())?,
            }
            true
        }
    };

    out.flush()?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// 日志写到 stderr，stdout 只输出 gcode。`RUST_LOG` 优先于配置中的等级。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(io::stderr);
    let _ = subscriber.try_init();
}
