use std::path::Path;

use tracing::info;

use cnc_engine::job::Job;
use cnc_io::{DocumentLoader, DxfFacade};

use crate::errors::FrontendError;

/// 读取 DXF 并构建该文件的加工任务。
pub fn load_job(path: &Path, layers: &[String]) -> Result<Job, FrontendError> {
    let document = DxfFacade::new().load(path)?;
    info!(
        path = %path.display(),
        entities = document.len(),
        "从 DXF 加载文档成功"
    );
    Ok(Job::new(document, layers.to_vec()))
}
