use thiserror::Error;

use crate::models::RunState;

/// 扫描流程错误类型
///
/// 分为三类：
/// - 流程致命错误（身份特征、枚举、候选文件、取消）：整次扫描作废，状态回到 Idle
/// - 整理错误：已写入的文件保留，扫描结果仍然有效，状态回到 Completed
/// - 配置 / 状态错误：调用方使用方式不对
#[derive(Debug, Error)]
pub enum ScanError {
    /// 构建身份特征失败（网络、鉴权、配额、空图片）
    #[error("构建身份特征失败: {0}")]
    Profile(#[source] anyhow::Error),

    /// 枚举候选文件失败
    #[error("枚举候选文件失败: {0}")]
    Enumeration(#[source] anyhow::Error),

    /// 单个候选文件处理失败（读取、分类器调用、超时）
    #[error("处理第 {index} 个候选文件 {name} 失败: {source}")]
    Candidate {
        index: usize,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// 扫描被取消
    #[error("扫描已取消")]
    Cancelled,

    /// 非法的状态切换
    #[error("状态 {from} 无法切换到 {to}")]
    InvalidTransition { from: RunState, to: RunState },

    /// 整理匹配结果失败
    #[error("整理匹配结果失败: {0}")]
    Organize(#[source] anyhow::Error),

    /// 配置错误
    #[error("配置项 {field} 无效: {message}")]
    Config { field: &'static str, message: String },
}

impl ScanError {
    /// 出错后扫描结果是否仍然保留
    ///
    /// 只有整理错误不会作废扫描结果
    pub fn keeps_results(&self) -> bool {
        matches!(self, ScanError::Organize(_))
    }

    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        ScanError::Config {
            field,
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 扫描流程结果类型
pub type AppResult<T> = Result<T, ScanError>;
