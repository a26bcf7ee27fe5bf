//! 图片数据模型
//!
//! 图片对流程来说是不透明的：原始字节 + MIME 标记，不做任何解码或预处理。

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// 参与扫描的图片扩展名（不区分大小写）
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// 图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// 根据扩展名识别格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// 根据文件路径识别格式
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// 根据 MIME 类型识别格式
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// 文件名是否是可扫描的图片
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// 编码后的图片
///
/// 字节放在 `Arc` 里，克隆（例如推送进度快照）不会复制图片内容
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    kind: ImageKind,
    bytes: Arc<[u8]>,
}

impl EncodedImage {
    pub fn new(kind: ImageKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    /// 从 base64 文本构建图片
    ///
    /// 如果带有 `data:image/...;base64,` 前缀，会先去掉前缀，
    /// 并以前缀里的 MIME 类型为准；否则使用 `fallback_kind`
    pub fn from_base64(input: &str, fallback_kind: ImageKind) -> Result<Self> {
        let (mime, payload) = strip_data_uri_prefix(input);

        let kind = match mime {
            Some(mime) => ImageKind::from_mime(mime)
                .with_context(|| format!("不支持的图片类型: {}", mime))?,
            None => fallback_kind,
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .context("图片 base64 解码失败")?;

        Ok(Self::new(kind, bytes))
    }

    /// 从本地文件读取图片
    pub async fn from_file(path: &Path) -> Result<Self> {
        let Some(kind) = ImageKind::from_path(path) else {
            bail!("不支持的图片格式: {}", path.display());
        };

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("无法读取图片: {}", path.display()))?;

        Ok(Self::new(kind, bytes))
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 转成 `data:` URL，供 Vision API 使用
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.kind.mime(), STANDARD.encode(&self.bytes))
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// 去掉 data URI 前缀
///
/// 返回 (前缀里的 MIME 类型, 剩余的 base64 内容)
pub fn strip_data_uri_prefix(input: &str) -> (Option<&str>, &str) {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| {
        Regex::new(r"^\s*data:(?P<mime>[^;,]*)(?:;[^,]*)?,").expect("data uri regex")
    });

    match prefix.captures(input) {
        Some(caps) => {
            let end = caps.get(0).map_or(0, |m| m.end());
            let mime = caps
                .name("mime")
                .map(|m| m.as_str())
                .filter(|m| !m.is_empty());
            (mime, &input[end..])
        }
        None => (None, input),
    }
}
