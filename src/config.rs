use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppResult, ScanError};

/// 默认的匹配阈值：置信度必须严格大于该值才算匹配
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// 指向 TOML 配置文件的环境变量
pub const CONFIG_FILE_ENV: &str = "FACE_SCAN_CONFIG";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次分类器请求超时（秒），超时视为致命错误
    pub request_timeout_secs: u64,
    // --- 扫描配置 ---
    /// 参考人物照片
    pub reference_image: String,
    /// 扫描目录（目录授权来源）
    pub scan_folder: String,
    /// 显式文件列表（只读来源），非空时优先于 `scan_folder`
    pub scan_files: Vec<String>,
    /// 是否递归扫描子目录
    pub recursive: bool,
    /// 扫描完成后是否整理匹配结果
    pub organize: bool,
    /// 匹配阈值
    pub match_threshold: f64,
    /// 单个候选文件出错时跳过而不是中止整次扫描
    pub skip_failed_candidates: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 扫描报告文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
            reference_image: String::new(),
            scan_folder: String::new(),
            scan_files: Vec::new(),
            recursive: true,
            organize: false,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            skip_failed_candidates: false,
            verbose_logging: false,
            output_log_file: "scan_report.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认配置 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    /// 加载配置
    ///
    /// 如果设置了 `FACE_SCAN_CONFIG`，先读取该 TOML 文件，再用环境变量覆盖
    pub fn load() -> Result<Self> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            reference_image: std::env::var("REFERENCE_IMAGE").unwrap_or(self.reference_image),
            scan_folder: std::env::var("SCAN_FOLDER").unwrap_or(self.scan_folder),
            scan_files: std::env::var_os("SCAN_FILES")
                .map(|v| {
                    std::env::split_paths(&v)
                        .map(|p| p.to_string_lossy().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(self.scan_files),
            recursive: env_parse("RECURSIVE_SCAN").unwrap_or(self.recursive),
            organize: env_parse("ORGANIZE_RESULTS").unwrap_or(self.organize),
            match_threshold: env_parse("MATCH_THRESHOLD").unwrap_or(self.match_threshold),
            skip_failed_candidates: env_parse("SKIP_FAILED_CANDIDATES").unwrap_or(self.skip_failed_candidates),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 检查配置是否可以启动一次扫描
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ScanError::config("llm_api_key", "未设置 LLM_API_KEY"));
        }
        if self.reference_image.trim().is_empty() {
            return Err(ScanError::config("reference_image", "未指定参考图片"));
        }
        if self.scan_files.is_empty() && self.scan_folder.trim().is_empty() {
            return Err(ScanError::config("scan_folder", "未指定扫描目录或文件列表"));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ScanError::config(
                "match_threshold",
                format!("阈值 {} 不在 [0, 1] 范围内", self.match_threshold),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ScanError::config("request_timeout_secs", "超时时间必须大于 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_file_paths(&self) -> Vec<PathBuf> {
        self.scan_files.iter().map(PathBuf::from).collect()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
