use std::io;

use thiserror::Error;

use cnc_engine::errors::EngineError;
use cnc_io::IoError;
use cnc_io::gcode::GcodeError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Load(#[from] IoError),
    #[error(transparent)]
    Gcode(#[from] GcodeError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("写出结果失败: {0}")]
    Write(#[from] io::Error),
}
