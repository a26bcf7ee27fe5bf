//! 扫描流程中的数据类型

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::infrastructure::WriteHandle;
use crate::models::image::EncodedImage;
use crate::models::state::RunState;

/// 分类器没有返回描述时使用的占位描述
pub const SENTINEL_DESCRIPTION: &str = "未能从参考图片中提取到面部特征描述";

/// 身份特征
///
/// 每次扫描由参考图片生成一次，之后不再修改
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    description: String,
    source_image: EncodedImage,
}

impl IdentityProfile {
    pub fn new(description: impl Into<String>, source_image: EncodedImage) -> Self {
        Self {
            description: description.into(),
            source_image,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source_image(&self) -> &EncodedImage {
        &self.source_image
    }

    /// 是否只是占位描述（没有可用的特征）
    pub fn is_sentinel(&self) -> bool {
        self.description == SENTINEL_DESCRIPTION
    }
}

/// 扫描候选文件
///
/// 枚举时只记录位置，图片内容在 [`ScanCandidate::load_image`] 时才读取
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    name: String,
    path: PathBuf,
    write_handle: Option<WriteHandle>,
}

impl ScanCandidate {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, write_handle: Option<WriteHandle>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            write_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_handle(&self) -> Option<&WriteHandle> {
        self.write_handle.as_ref()
    }

    /// 读取图片内容
    pub async fn load_image(&self) -> Result<EncodedImage> {
        EncodedImage::from_file(&self.path).await
    }
}

/// 单个候选文件的匹配判断
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchVerdict {
    pub is_match: bool,
    pub confidence: f64,
}

impl MatchVerdict {
    pub fn new(is_match: bool, confidence: f64) -> Self {
        Self {
            is_match,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// 无法解析时的安全默认值
    pub fn no_match() -> Self {
        Self {
            is_match: false,
            confidence: 0.0,
        }
    }
}

/// 匹配结果
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub file_name: String,
    pub confidence: f64,
    pub write_handle: Option<WriteHandle>,
    pub preview_image: EncodedImage,
}

/// 扫描进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunProgress {
    pub processed_count: usize,
    pub total_count: usize,
    pub percent_complete: u8,
}

impl RunProgress {
    /// 枚举完成后创建，`total_count` 之后不再变化
    pub fn new(total_count: usize) -> Self {
        Self {
            processed_count: 0,
            total_count,
            percent_complete: percent(0, total_count),
        }
    }

    /// 处理完一个候选文件
    pub fn advance(&mut self) {
        if self.processed_count < self.total_count {
            self.processed_count += 1;
        }
        self.percent_complete = percent(self.processed_count, self.total_count);
    }

    pub fn is_finished(&self) -> bool {
        self.processed_count == self.total_count
    }
}

fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

/// 每处理完一个候选文件推送给观察者的快照
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub state: RunState,
    pub progress: RunProgress,
    pub results: Vec<ScanResult>,
    /// 本次快照是否新增了匹配结果
    pub results_changed: bool,
}
