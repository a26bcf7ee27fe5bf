//! 匹配判断 - 业务能力层
//!
//! 只负责"这张图是不是同一个人"，不关心阈值和结果收集
//!
//! 分类器的响应按"可能损坏的自由文本"对待：依次尝试
//! 1. 整段就是 JSON
//! 2. ```json 代码块里的 JSON
//! 3. 文本中第一个 `{` 到最后一个 `}` 之间的内容
//!
//! 全部失败时返回安全默认值 `{false, 0.0}`，不会报错

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::models::{EncodedImage, IdentityProfile, MatchVerdict};
use crate::services::classifier::Classifier;
use crate::utils::logging::truncate_text;

/// 分类器返回的判断结构
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(rename = "isMatch", alias = "is_match", alias = "match")]
    is_match: bool,
    confidence: f64,
}

/// 匹配判断服务
pub struct MatchEvaluator {
    classifier: Arc<dyn Classifier>,
}

impl MatchEvaluator {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// 判断候选图片是否与身份特征匹配
    ///
    /// 分类器请求失败时返回错误；响应无法解析时返回 `{false, 0.0}`
    pub async fn evaluate(
        &self,
        profile: &IdentityProfile,
        candidate_image: &EncodedImage,
    ) -> Result<MatchVerdict> {
        let raw = self
            .classifier
            .compare(profile.description(), candidate_image)
            .await?;

        let verdict = parse_verdict(&raw);
        debug!(
            "匹配判断: is_match={}, confidence={:.3}",
            verdict.is_match, verdict.confidence
        );
        Ok(verdict)
    }
}

/// 解析分类器的匹配响应，失败时返回安全默认值
pub fn parse_verdict(raw: &str) -> MatchVerdict {
    match try_parse_verdict(raw) {
        Some(verdict) => verdict,
        None => {
            warn!(
                "无法解析匹配响应: '{}', 按不匹配处理",
                truncate_text(raw.trim(), 120)
            );
            MatchVerdict::no_match()
        }
    }
}

fn try_parse_verdict(raw: &str) -> Option<MatchVerdict> {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    static FIRST_OBJECT: OnceLock<Regex> = OnceLock::new();
    static OBJECT: OnceLock<Regex> = OnceLock::new();

    let fenced = FENCED.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fenced block regex")
    });
    let first_object =
        FIRST_OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*?\}").expect("first json object regex"));
    let object = OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("json object regex"));

    let trimmed = raw.trim();

    let mut attempts: Vec<&str> = vec![trimmed];
    if let Some(inner) = fenced.captures(trimmed).and_then(|caps| caps.get(1)) {
        attempts.push(inner.as_str().trim());
    }
    // 先试最短的 {...}，后面还有别的花括号时也能解析
    if let Some(span) = first_object.find(trimmed) {
        attempts.push(span.as_str());
    }
    if let Some(span) = object.find(trimmed) {
        attempts.push(span.as_str());
    }

    attempts
        .into_iter()
        .filter_map(|text| serde_json::from_str::<RawVerdict>(text).ok())
        .find(|raw| raw.confidence.is_finite())
        .map(|raw| MatchVerdict::new(raw.is_match, raw.confidence))
}
