//! 候选文件处理上下文
//!
//! 封装"我正在处理第几个候选文件"这一信息

use std::fmt::Display;

/// 候选文件处理上下文
#[derive(Debug, Clone)]
pub struct CandidateCtx {
    /// 候选文件序号（从1开始）
    pub index: usize,

    /// 候选文件总数
    pub total: usize,

    /// 候选文件名
    pub name: String,
}

impl CandidateCtx {
    pub fn new(index: usize, total: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            total,
            name: name.into(),
        }
    }
}

impl Display for CandidateCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[候选 {}/{} {}]", self.index, self.total, self.name)
    }
}
