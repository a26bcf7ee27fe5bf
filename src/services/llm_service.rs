//! LLM 服务 - 业务能力层
//!
//! 基于 Vision 模型实现 [`Classifier`]，只负责"看图说话"和"比对判断"两个能力
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//! - 图片以 base64 `data:` URL 的形式发送

use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::EncodedImage;
use crate::services::classifier::Classifier;

const DESCRIBE_SYSTEM_MESSAGE: &str = "你是一个专业的人脸特征分析助手。\
    你只描述能够区分身份的稳定面部特征，忽略衣着、表情、光线、背景等会变化的因素。";

const COMPARE_SYSTEM_MESSAGE: &str = "你是一个严谨的人脸比对助手。\
    你根据给定的面部特征描述，判断图片中的人物是否为同一个人，并且只输出 JSON。";

/// LLM 服务
///
/// 职责：
/// - 调用 Vision 模型生成参考人物的特征描述
/// - 调用 Vision 模型判断单张候选图片是否为同一个人
/// - 一次只处理一张图片，不关心扫描流程
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    request_timeout: Duration,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// 这是最基础的 LLM 调用接口，`describe` / `compare` 都基于此函数。
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `images`: 附带的图片，会追加到用户消息中
    ///
    /// # 返回
    /// 返回 LLM 的响应内容；模型没有返回内容时返回空字符串
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        images: &[&EncodedImage],
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符, 图片 {} 张", user_message.len(), images.len());

        // 构建消息列表
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = if images.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?
        } else {
            // 使用 Vision API：文本 + 图片
            let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                Vec::with_capacity(images.len() + 1);

            content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: user_message.to_string(),
                },
            ));

            for image in images {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                            detail: Some(ImageDetail::High),
                        },
                    },
                ));
            }

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                .build()?
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.1)
            .max_tokens(1024u32)
            .build()?;

        // 调用 API（带超时）
        let response = tokio::time::timeout(self.request_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时 ({} 秒)", self.request_timeout.as_secs());
                anyhow::anyhow!("LLM API 调用超时 ({} 秒)", self.request_timeout.as_secs())
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                anyhow::anyhow!("LLM API 调用失败: {}", e)
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());

        match content {
            Some(content) => Ok(content.trim().to_string()),
            None => {
                warn!("LLM 返回内容为空 (模型: {})", self.model_name);
                Ok(String::new())
            }
        }
    }
}

#[async_trait]
impl Classifier for LlmService {
    async fn describe(&self, image: &EncodedImage) -> Result<String> {
        self.send_to_llm(&build_describe_message(), Some(DESCRIBE_SYSTEM_MESSAGE), &[image])
            .await
            .context("生成参考人物特征描述失败")
    }

    async fn compare(&self, profile_text: &str, image: &EncodedImage) -> Result<String> {
        self.send_to_llm(
            &build_compare_message(profile_text),
            Some(COMPARE_SYSTEM_MESSAGE),
            &[image],
        )
        .await
        .context("候选图片比对请求失败")
    }
}

/// 构建特征描述的提示词
fn build_describe_message() -> String {
    r#"请仔细观察图片中的人物，描述能够用来识别此人身份的稳定面部特征。

【需要描述的特征】
1. 眼睛形状与间距
2. 鼻子结构
3. 下颌线与脸型
4. 发色与发际线
5. 痣、疤痕、胎记等明显标记

只输出特征描述本身，不要输出任何其他内容。"#
        .to_string()
}

/// 构建比对判断的提示词
fn build_compare_message(profile_text: &str) -> String {
    format!(
        r#"下面是参考人物的面部特征描述：

{}

请判断图片中的人物是否与该描述是同一个人。

【输出要求】
- 只返回一个 JSON 对象，不要返回任何其他内容
- 格式：{{"isMatch": true 或 false, "confidence": 0 到 1 之间的数字}}
- 图片中没有人脸时返回 {{"isMatch": false, "confidence": 0}}"#,
        profile_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageKind;

    /// 创建测试用的 LlmService
    fn create_test_service() -> LlmService {
        let config = Config {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            ..Config::from_env()
        };
        LlmService::new(&config)
    }

    #[test]
    fn test_compare_message_embeds_profile_and_schema() {
        let message = build_compare_message("round face, brown eyes");
        assert!(message.contains("round face, brown eyes"));
        assert!(message.contains(r#""isMatch""#));
        assert!(message.contains(r#""confidence""#));
    }

    #[test]
    fn test_service_uses_configured_timeout() {
        let config = Config {
            request_timeout_secs: 7,
            ..Config::default()
        };
        let service = LlmService::new(&config);
        assert_eq!(service.request_timeout, Duration::from_secs(7));
        assert_eq!(service.model_name, config.llm_model_name);
    }

    /// 测试 Vision API 特征描述
    ///
    /// 运行方式：
    /// ```bash
    /// REFERENCE_IMAGE=me.jpg LLM_API_KEY=... cargo test test_describe_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_describe_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = create_test_service();
        let path = std::env::var("REFERENCE_IMAGE").expect("需要设置 REFERENCE_IMAGE");
        let image = EncodedImage::from_file(std::path::Path::new(&path))
            .await
            .expect("读取参考图片失败");

        let description = service.describe(&image).await.expect("特征描述失败");
        println!("特征描述: {}", description);
        assert!(!description.is_empty());
    }

    /// 测试 Vision API 比对（纯色图片里没有人脸）
    #[tokio::test]
    #[ignore]
    async fn test_compare_live_without_face() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = create_test_service();
        // 1x1 透明 PNG
        let image = EncodedImage::from_base64(
            "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=",
            ImageKind::Png,
        )
        .unwrap();

        let raw = service
            .compare("round face, brown eyes", &image)
            .await
            .expect("比对请求失败");
        println!("比对响应: {}", raw);
    }
}
