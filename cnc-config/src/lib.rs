use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cnc_core::origin::Origin;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "CNC_CONFIG";

/// 单次加工允许的最多下刀次数。
pub const MAX_PASSES: usize = 10_000;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub machining: MachiningConfig,
    #[serde(default)]
    pub surfacing: SurfacingConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.machining.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `CNC_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// 把当前配置写成 TOML 文件，父目录不存在时一并创建。
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 加工参数。长度单位均为毫米，速度单位为 mm/min。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachiningConfig {
    pub feed: f64,
    pub security_z: f64,
    /// 最终切削深度。
    pub deepness: f64,
    /// 每一刀的最大深度，`<= 0` 表示一刀到底。
    pub deep_per_try: f64,
    /// 铣平时的起始深度。
    pub deep_start: f64,
    /// 参与加工的图层，为空表示全部。
    pub layers: Vec<String>,
    pub origin: Origin,
    pub before_script: String,
    pub after_script: String,
}

impl Default for MachiningConfig {
    fn default() -> Self {
        Self {
            feed: 60.0,
            security_z: 5.0,
            deepness: 1.0,
            deep_per_try: 0.0,
            deep_start: 0.0,
            layers: Vec::new(),
            origin: Origin::default(),
            before_script: String::new(),
            after_script: "G0X0Y0".to_string(),
        }
    }
}

impl MachiningConfig {
    /// 检查数值参数：必须是有限值，分层下刀次数不超过 [`MAX_PASSES`]。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("feed", self.feed),
            ("security_z", self.security_z),
            ("deepness", self.deepness),
            ("deep_per_try", self.deep_per_try),
            ("deep_start", self.deep_start),
        ];
        if let Some((name, value)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} = {value} 不是有限数值")));
        }
        if self.deep_per_try > 0.0
            && self.deepness > 0.0
            && self.deepness / self.deep_per_try > MAX_PASSES as f64
        {
            return Err(ConfigError::Invalid(format!(
                "deep_per_try = {} 过小：深度 {} 需要超过 {MAX_PASSES} 刀",
                self.deep_per_try, self.deepness
            )));
        }
        Ok(())
    }

    /// 每一刀的目标深度，单调递增，最后一项等于 `deepness`。
    ///
    /// 例如深度 12、每刀 5 时为 `[5, 10, 12]`；深度恰为整数倍时不产生额外的一刀。
    /// 未经 [`validate`](Self::validate) 的参数按 [`MAX_PASSES`] 限制每刀的最小深度。
    pub fn pass_depths(&self) -> Vec<f64> {
        if self.deep_per_try <= 0.0
            || !self.deep_per_try.is_finite()
            || self.deepness <= 0.0
            || !self.deepness.is_finite()
        {
            return vec![self.deepness];
        }
        let per_try = self.deep_per_try.max(self.deepness / MAX_PASSES as f64);

        let passes = (self.deepness / per_try).ceil() as usize;
        let full = (self.deepness / per_try).floor() as usize;
        let mut depths: Vec<f64> = (1..=full).map(|index| index as f64 * per_try).collect();
        if passes > full {
            depths.push(self.deepness);
        } else if let Some(last) = depths.last_mut() {
            *last = self.deepness;
        }
        depths
    }
}

/// 铣平参数，`method` 取值见 `cnc_engine::surface::SurfaceMethod`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacingConfig {
    pub step: f64,
    pub method: String,
}

impl Default for SurfacingConfig {
    fn default() -> Self {
        Self {
            step: 5.0,
            method: "zigzag".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("序列化配置失败: {0}")]
    Serialize(#[source] toml::ser::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
