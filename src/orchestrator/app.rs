//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置、创建扫描报告、创建分类器
//! 2. **准备输入**：读取参考图片，确定扫描来源（目录或文件列表）
//! 3. **运行扫描**：委托 `ScanOrchestrator`，Ctrl+C 触发取消
//! 4. **输出结果**：打印统计、写入报告，按配置整理匹配文件

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::{DirectoryHandle, FileRef, ScanSource};
use crate::models::EncodedImage;
use crate::orchestrator::scan_orchestrator::{LoggingObserver, ScanOptions, ScanOrchestrator};
use crate::services::LlmService;
use crate::utils::logging::{append_results, init_log_file, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: ScanOrchestrator,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        // 初始化报告文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config.llm_model_name, config.match_threshold);

        let classifier = Arc::new(LlmService::new(&config));
        let orchestrator =
            ScanOrchestrator::new(classifier, ScanOptions::from(&config)).with_observer(LoggingObserver);

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        let reference = EncodedImage::from_file(Path::new(&self.config.reference_image))
            .await
            .with_context(|| format!("无法读取参考图片: {}", self.config.reference_image))?;

        let source = self.build_source()?;
        info!("📁 扫描来源: {}", source.describe());

        // Ctrl+C 取消当前扫描
        let token = self.orchestrator.cancellation_token();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到中断信号，正在取消扫描...");
                token.cancel();
            }
        });

        let outcome = self.orchestrator.run_scan(reference, source).await.map(<[_]>::len);
        ctrl_c.abort();
        let matched = outcome?;

        let progress = self.orchestrator.progress();
        print_final_stats(&progress, matched, &self.config.output_log_file);
        append_results(
            &self.config.output_log_file,
            self.orchestrator.results(),
            &progress,
        )?;

        if self.config.organize {
            if self.orchestrator.can_organize() {
                if let Err(e) = self.orchestrator.organize().await {
                    // 整理失败不影响扫描结果，报告已经写好
                    if !e.keeps_results() {
                        return Err(e.into());
                    }
                    error!("❌ {}", e);
                }
            } else {
                warn!("⚠️ 没有可整理的结果，或扫描来源为只读文件列表");
            }
        }

        Ok(())
    }

    /// 文件列表优先，否则使用扫描目录
    fn build_source(&self) -> Result<ScanSource> {
        if !self.config.scan_files.is_empty() {
            let files = self
                .config
                .scan_file_paths()
                .into_iter()
                .map(FileRef::new)
                .collect();
            return Ok(ScanSource::FileList(files));
        }

        let handle = DirectoryHandle::open(&self.config.scan_folder, self.config.recursive)?;
        Ok(ScanSource::Directory(handle))
    }
}
