//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整次扫描的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 校验配置、创建分类器
//! - 读取参考图片，确定扫描来源
//! - 输出统计和扫描报告
//!
//! ### `scan_orchestrator` - 扫描编排器
//! - 持有状态机、进度、匹配结果
//! - 串行遍历候选文件，推送快照
//! - 处理取消和致命错误
//! - 整理匹配结果
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! scan_orchestrator (处理 Vec<ScanCandidate>)
//!     ↓
//! workflow::CandidateFlow (处理单个候选文件)
//!     ↓
//! services (能力层：profile / match / enumerate / organize)
//!     ↓
//! infrastructure (基础设施：DirectoryHandle / WriteHandle)
//! ```

pub mod app;
pub mod scan_orchestrator;

// 重新导出主要类型
pub use app::App;
pub use scan_orchestrator::{LoggingObserver, ScanObserver, ScanOptions, ScanOrchestrator};
