//! 身份特征构建 - 业务能力层
//!
//! 一张参考图片 → 一次 describe 请求 → 一份身份特征

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{EncodedImage, IdentityProfile, SENTINEL_DESCRIPTION};
use crate::services::classifier::Classifier;

/// 身份特征构建服务
pub struct ProfileBuilder {
    classifier: Arc<dyn Classifier>,
}

impl ProfileBuilder {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// 根据参考图片构建身份特征
    ///
    /// 分类器返回空内容时使用占位描述，而不是报错；
    /// 请求本身失败则直接返回错误
    pub async fn build_profile(&self, reference_image: EncodedImage) -> Result<IdentityProfile> {
        if reference_image.is_empty() {
            bail!("参考图片为空");
        }

        debug!(
            "正在生成参考人物特征 ({}, {} 字节)",
            reference_image.kind().mime(),
            reference_image.len()
        );

        let description = self.classifier.describe(&reference_image).await?;
        let description = description.trim();

        if description.is_empty() {
            warn!("分类器没有返回特征描述，使用占位描述继续");
            return Ok(IdentityProfile::new(SENTINEL_DESCRIPTION, reference_image));
        }

        Ok(IdentityProfile::new(description, reference_image))
    }
}
