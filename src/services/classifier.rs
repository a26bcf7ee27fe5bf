//! 分类器接口 - 业务能力层
//!
//! 视觉分析 / 身份匹配服务被当作不透明的黑盒，只约定两个操作。

use anyhow::Result;
use async_trait::async_trait;

use crate::models::EncodedImage;

/// 视觉分类器
///
/// 职责：
/// - `describe`：描述一张图片中人物的稳定面部特征
/// - `compare`：判断图片中的人物是否与特征描述一致
/// - 只返回原始文本，解析由调用方负责
/// - 网络、鉴权、配额、超时等问题通过 `Err` 返回
#[async_trait]
pub trait Classifier: Send + Sync {
    /// 返回特征描述文本；没有内容时返回空字符串
    async fn describe(&self, image: &EncodedImage) -> Result<String>;

    /// 返回匹配判断的原始文本，通常是 `{"isMatch": bool, "confidence": number}`
    async fn compare(&self, profile_text: &str, image: &EncodedImage) -> Result<String>;
}
