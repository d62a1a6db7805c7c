pub mod drill;
pub mod engrave;
pub mod errors;
pub mod info;
pub mod loader;
pub mod surface;

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use cnc_engine::job::Job;

use errors::FrontendError;

/// 批量处理结果：成功与失败的文件数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
}

impl BatchReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// 依次处理每个 DXF 文件，每个文件的输出包在文件头尾注释之间。
///
/// 单个文件失败只记录日志，不影响后续文件。
pub fn process_files<W, F>(
    files: &[PathBuf],
    layers: &[String],
    out: &mut W,
    mut operation: F,
) -> BatchReport
where
    W: Write + ?Sized,
    F: FnMut(&mut W, &Job) -> Result<(), FrontendError>,
{
    let mut report = BatchReport::default();
    for path in files {
        match process_file(path, layers, out, &mut operation) {
            Ok(()) => report.processed += 1,
            Err(err) => {
                error!(path = %path.display(), error = %err, "处理文件失败");
                report.failed += 1;
            }
        }
    }
    info!(
        processed = report.processed,
        failed = report.failed,
        "批量处理结束"
    );
    report
}

fn process_file<W, F>(
    path: &Path,
    layers: &[String],
    out: &mut W,
    operation: &mut F,
) -> Result<(), FrontendError>
where
    W: Write + ?Sized,
    F: FnMut(&mut W, &Job) -> Result<(), FrontendError>,
{
    let job = loader::load_job(path, layers)?;
    let name = display_name(path);
    writeln!(out, "; File: {name}")?;
    operation(out, &job)?;
    write!(out, "\n; End of file: {name}\n\n")?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
