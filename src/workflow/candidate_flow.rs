//! 候选文件处理流程 - 流程层
//!
//! 核心职责：定义"一个候选文件"的完整处理流程
//!
//! 流程顺序：
//! 1. 读取图片（按需读取，同一时刻只持有一张）
//! 2. 匹配判断
//! 3. 阈值判断 → 生成匹配结果或丢弃

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{IdentityProfile, MatchVerdict, ScanCandidate, ScanResult};
use crate::services::{Classifier, MatchEvaluator};
use crate::workflow::candidate_ctx::CandidateCtx;

/// 候选文件处理结果
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    /// 通过阈值，成为匹配结果
    Accepted(ScanResult),
    /// 未通过阈值
    Rejected(MatchVerdict),
}

/// 候选文件处理流程
///
/// - 编排单个候选文件的读取、判断、阈值检查
/// - 不持有结果集合，不关心进度
/// - 只依赖业务能力（services）
pub struct CandidateFlow {
    evaluator: MatchEvaluator,
    match_threshold: f64,
    verbose_logging: bool,
}

impl CandidateFlow {
    pub fn new(classifier: Arc<dyn Classifier>, match_threshold: f64, verbose_logging: bool) -> Self {
        Self {
            evaluator: MatchEvaluator::new(classifier),
            match_threshold,
            verbose_logging,
        }
    }

    /// 使用默认阈值创建
    #[cfg(test)]
    pub fn with_default_threshold(classifier: Arc<dyn Classifier>) -> Self {
        Self::new(classifier, crate::config::DEFAULT_MATCH_THRESHOLD, false)
    }

    /// 阈值规则：必须判断为匹配，且置信度严格大于阈值
    pub fn accepts(&self, verdict: &MatchVerdict) -> bool {
        verdict.is_match && verdict.confidence > self.match_threshold
    }

    pub async fn run(
        &self,
        profile: &IdentityProfile,
        candidate: &ScanCandidate,
        ctx: &CandidateCtx,
    ) -> Result<CandidateOutcome> {
        let image = candidate
            .load_image()
            .await
            .with_context(|| format!("无法读取候选图片: {}", candidate.path().display()))?;

        debug!("{} 已读取 {} 字节", ctx, image.len());

        let verdict = self.evaluator.evaluate(profile, &image).await?;

        if self.verbose_logging {
            info!(
                "{} 判断结果: is_match={}, confidence={:.3}",
                ctx, verdict.is_match, verdict.confidence
            );
        }

        if !self.accepts(&verdict) {
            return Ok(CandidateOutcome::Rejected(verdict));
        }

        info!("{} ✓ 匹配 (置信度: {:.2})", ctx, verdict.confidence);

        Ok(CandidateOutcome::Accepted(ScanResult {
            file_name: candidate.name().to_string(),
            confidence: verdict.confidence,
            write_handle: candidate.write_handle().cloned(),
            preview_image: image,
        }))
    }
}
