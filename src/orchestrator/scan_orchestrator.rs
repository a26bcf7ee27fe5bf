//! 扫描编排器 - 编排层
//!
//! ## 职责
//!
//! 驱动一次完整的扫描，是整个流程的"指挥中心"。
//!
//! ## 核心流程
//!
//! 1. **构建身份特征**：Idle → Initializing，只调用一次
//! 2. **枚举候选文件**：只调用一次，总数此后固定
//! 3. **逐个处理**：严格串行，每处理完一个候选文件推送一次快照
//! 4. **完成**：Scanning → Completed，结果保留
//! 5. **致命错误**：中止剩余循环，丢弃本次结果，回到 Idle
//!
//! ## 设计特点
//!
//! - **唯一所有者**：结果集合、进度、状态机只由编排器修改
//! - **串行调用**：同一时刻只有一个分类器请求，只持有一张候选图片
//! - **可取消**：每个候选文件之间以及请求过程中都会检查取消令牌

use futures::channel::mpsc::UnboundedSender;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_MATCH_THRESHOLD};
use crate::error::{AppResult, ScanError};
use crate::infrastructure::ScanSource;
use crate::models::{
    EncodedImage, IdentityProfile, RunProgress, RunState, ScanResult, ScanSnapshot,
    TransitionContext,
};
use crate::services::{enumerate, Classifier, ProfileBuilder, ResultOrganizer};
use crate::workflow::{CandidateCtx, CandidateFlow, CandidateOutcome};

/// 扫描观察者
///
/// 每处理完一个候选文件调用一次
pub trait ScanObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &ScanSnapshot);
}

impl<F> ScanObserver for F
where
    F: Fn(&ScanSnapshot) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &ScanSnapshot) {
        self(snapshot)
    }
}

/// 通过通道把快照推送给 UI 等异步消费者
impl ScanObserver for UnboundedSender<ScanSnapshot> {
    fn on_snapshot(&self, snapshot: &ScanSnapshot) {
        // 接收端已关闭时忽略
        let _ = self.unbounded_send(snapshot.clone());
    }
}

/// 把进度写到日志的观察者
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl ScanObserver for LoggingObserver {
    fn on_snapshot(&self, snapshot: &ScanSnapshot) {
        let progress = &snapshot.progress;
        info!(
            "⏳ 进度 {}% ({}/{})，已匹配 {} 个",
            progress.percent_complete,
            progress.processed_count,
            progress.total_count,
            snapshot.results.len()
        );
    }
}

/// 扫描选项
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub match_threshold: f64,
    /// 单个候选文件出错时跳过并继续（默认中止整次扫描）
    pub skip_failed_candidates: bool,
    pub verbose_logging: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            skip_failed_candidates: false,
            verbose_logging: false,
        }
    }
}

impl From<&Config> for ScanOptions {
    fn from(config: &Config) -> Self {
        Self {
            match_threshold: config.match_threshold,
            skip_failed_candidates: config.skip_failed_candidates,
            verbose_logging: config.verbose_logging,
        }
    }
}

/// 扫描编排器
pub struct ScanOrchestrator {
    profile_builder: ProfileBuilder,
    flow: CandidateFlow,
    organizer: ResultOrganizer,
    options: ScanOptions,
    observer: Option<Arc<dyn ScanObserver>>,
    cancel: CancellationToken,

    state: RunState,
    profile: Option<IdentityProfile>,
    source: Option<ScanSource>,
    results: Vec<ScanResult>,
    progress: RunProgress,
}

impl ScanOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, options: ScanOptions) -> Self {
        Self {
            profile_builder: ProfileBuilder::new(classifier.clone()),
            flow: CandidateFlow::new(classifier, options.match_threshold, options.verbose_logging),
            organizer: ResultOrganizer::new(),
            options,
            observer: None,
            cancel: CancellationToken::new(),
            state: RunState::Idle,
            profile: None,
            source: None,
            results: Vec::new(),
            progress: RunProgress::default(),
        }
    }

    /// 设置进度观察者
    pub fn with_observer(mut self, observer: impl ScanObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// 当前扫描的取消令牌
    ///
    /// 令牌被触发后，下一次 `run_scan` 会换上新的令牌，需要重新获取
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn progress(&self) -> RunProgress {
        self.progress
    }

    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    pub fn profile(&self) -> Option<&IdentityProfile> {
        self.profile.as_ref()
    }

    /// 当前快照
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            state: self.state,
            progress: self.progress,
            results: self.results.clone(),
            results_changed: false,
        }
    }

    /// 是否可以整理结果（已完成、有结果、来源可写）
    pub fn can_organize(&self) -> bool {
        self.state
            .can_transition(RunState::Organizing, &self.transition_context())
    }

    /// 运行一次完整扫描
    ///
    /// 成功时返回本次的匹配结果；失败时本次结果全部丢弃，状态回到 Idle
    pub async fn run_scan(
        &mut self,
        reference_image: EncodedImage,
        source: ScanSource,
    ) -> AppResult<&[ScanResult]> {
        if !matches!(self.state, RunState::Idle | RunState::Completed) {
            warn!("⚠️ 上一次操作在 {} 状态被中断，重新开始扫描", self.state);
        }
        self.transition(RunState::Initializing)?;
        self.reset_run();

        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        match self.execute(reference_image, source).await {
            Ok(()) => Ok(&self.results),
            Err(e) => {
                error!("❌ 扫描中止: {}", e);
                self.abort();
                Err(e)
            }
        }
    }

    /// 整理匹配结果到可写根目录
    ///
    /// 只能在 Completed 状态、至少有一个结果、来源可写时调用。
    /// 无论成功与否，结束后状态都回到 Completed
    pub async fn organize(&mut self) -> AppResult<usize> {
        let root = self
            .source
            .as_ref()
            .and_then(ScanSource::writable_root)
            .cloned();

        self.transition(RunState::Organizing)?;

        let outcome = match root {
            Some(root) => self.organizer.organize(&self.results, &root).await,
            None => Err(anyhow::anyhow!("扫描来源不可写")),
        };

        self.transition(RunState::Completed)?;

        let written = outcome.map_err(ScanError::Organize)?;
        info!("✓ 已整理 {} 个匹配文件到 {}", written, self.organizer.dir_name());
        Ok(written)
    }

    async fn execute(&mut self, reference_image: EncodedImage, source: ScanSource) -> AppResult<()> {
        // ========== 1. 构建身份特征 ==========
        info!("🧬 正在分析参考图片...");
        let profile = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
            built = self.profile_builder.build_profile(reference_image) => built.map_err(ScanError::Profile)?,
        };

        if profile.is_sentinel() {
            warn!("⚠️ 没有得到可用的面部特征描述，匹配结果可能不可靠");
        } else {
            info!("✓ 特征描述: {}", crate::utils::truncate_text(profile.description(), 80));
        }
        self.profile = Some(profile.clone());

        // ========== 2. 枚举候选文件 ==========
        let candidates = enumerate(&source).await.map_err(ScanError::Enumeration)?;
        self.source = Some(source);

        let total = candidates.len();
        self.progress = RunProgress::new(total);

        if total == 0 {
            warn!("⚠️ 没有找到可扫描的图片");
            self.transition(RunState::Completed)?;
            self.notify(false);
            return Ok(());
        }

        self.transition(RunState::Scanning)?;
        info!("🔍 开始逐个比对 {} 个候选文件", total);

        // ========== 3. 逐个处理（严格串行） ==========
        for (offset, candidate) in candidates.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let ctx = CandidateCtx::new(offset + 1, total, candidate.name());

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
                outcome = self.flow.run(&profile, &candidate, &ctx) => outcome,
            };

            let results_changed = match outcome {
                Ok(CandidateOutcome::Accepted(result)) => {
                    self.results.push(result);
                    true
                }
                Ok(CandidateOutcome::Rejected(_)) => false,
                Err(e) if self.options.skip_failed_candidates => {
                    warn!("{} ⚠️ 处理失败，已跳过: {:#}", ctx, e);
                    false
                }
                Err(e) => {
                    return Err(ScanError::Candidate {
                        index: ctx.index,
                        name: ctx.name,
                        source: e,
                    });
                }
            };

            self.progress.advance();

            // ========== 4. 最后一个候选文件处理完即完成 ==========
            if self.progress.is_finished() {
                self.transition(RunState::Completed)?;
            }

            self.notify(results_changed);
        }

        info!("✅ 扫描完成，匹配 {} 个", self.results.len());
        Ok(())
    }

    fn transition(&mut self, to: RunState) -> AppResult<()> {
        self.state = self.state.transition(to, &self.transition_context())?;
        Ok(())
    }

    fn transition_context(&self) -> TransitionContext {
        TransitionContext {
            has_profile: self.profile.is_some(),
            total_count: self.progress.total_count,
            result_count: self.results.len(),
            writable_source: self
                .source
                .as_ref()
                .is_some_and(|source| source.writable_root().is_some()),
        }
    }

    fn reset_run(&mut self) {
        self.profile = None;
        self.source = None;
        self.results.clear();
        self.progress = RunProgress::default();
    }

    /// 致命错误：丢弃本次扫描的所有状态，回到 Idle
    fn abort(&mut self) {
        self.reset_run();
        if let Err(e) = self.transition(RunState::Idle) {
            warn!("中止时状态切换异常: {}", e);
            self.state = RunState::Idle;
        }
    }

    fn notify(&self, results_changed: bool) {
        if let Some(observer) = &self.observer {
            observer.on_snapshot(&ScanSnapshot {
                state: self.state,
                progress: self.progress,
                results: self.results.clone(),
                results_changed,
            });
        }
    }
}
