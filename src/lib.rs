//! # Face Scan
//!
//! 一个用参考照片在图片集合中查找同一人物的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有目录授权，只暴露能力
//! - `DirectoryHandle` - 目录授权的唯一持有者，提供列举和写入能力
//! - `WriteHandle` - 指向单个文件的弱引用写入句柄
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张图片
//! - `LlmService` - 多模态分类器（描述 / 比对）
//! - `ProfileBuilder` - 构建身份特征
//! - `MatchEvaluator` - 匹配判断与容错解析
//! - `ResultOrganizer` - 整理匹配文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个候选文件"的完整处理流程
//! - `CandidateCtx` - 上下文封装（序号 + 文件名）
//! - `CandidateFlow` - 流程编排（读取 → 判断 → 阈值）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/scan_orchestrator` - 状态机、进度、结果集合
//! - `orchestrator/app` - 应用入口
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppResult, ScanError};
pub use infrastructure::{DirectoryHandle, FileRef, ScanSource, WriteHandle};
pub use models::{
    EncodedImage, IdentityProfile, MatchVerdict, RunProgress, RunState, ScanResult, ScanSnapshot,
};
pub use orchestrator::{App, LoggingObserver, ScanObserver, ScanOptions, ScanOrchestrator};
pub use services::{Classifier, LlmService};
pub use workflow::{CandidateCtx, CandidateFlow, CandidateOutcome};
