//! 集成测试公共工具
//!
//! `ScriptedClassifier` 按图片内容返回预设的响应，不访问网络

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use face_scan::models::ImageKind;
use face_scan::{Classifier, EncodedImage};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 预设响应
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    /// 永远不返回，用于测试取消
    Hang,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn verdict(is_match: bool, confidence: f64) -> Self {
        Reply::Text(verdict_json(is_match, confidence))
    }

    async fn resolve(self) -> Result<String> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => anyhow::bail!(message),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn verdict_json(is_match: bool, confidence: f64) -> String {
    format!(r#"{{"isMatch": {}, "confidence": {}}}"#, is_match, confidence)
}

/// 按图片字节返回预设响应的分类器
pub struct ScriptedClassifier {
    describe_reply: Reply,
    compare_replies: Mutex<HashMap<Vec<u8>, Reply>>,
    describe_calls: AtomicUsize,
    compare_calls: AtomicUsize,
    compared: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedClassifier {
    pub fn new(describe_reply: Reply) -> Self {
        Self {
            describe_reply,
            compare_replies: Mutex::new(HashMap::new()),
            describe_calls: AtomicUsize::new(0),
            compare_calls: AtomicUsize::new(0),
            compared: Mutex::new(Vec::new()),
        }
    }

    /// 默认返回一段正常的面部描述
    pub fn with_profile() -> Self {
        Self::new(Reply::text("圆脸，棕色眼睛，短发"))
    }

    /// 为内容为 `bytes` 的图片预设比对响应
    pub fn on(self, bytes: &[u8], reply: Reply) -> Self {
        self.compare_replies.lock().unwrap().insert(bytes.to_vec(), reply);
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    /// 按调用顺序返回被比对过的图片内容
    pub fn compared(&self) -> Vec<Vec<u8>> {
        self.compared.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn describe(&self, _image: &EncodedImage) -> Result<String> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.describe_reply.clone().resolve().await
    }

    async fn compare(&self, _profile_text: &str, image: &EncodedImage) -> Result<String> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.compared.lock().unwrap().push(image.bytes().to_vec());

        let reply = self
            .compare_replies
            .lock()
            .unwrap()
            .get(image.bytes())
            .cloned()
            .unwrap_or_else(|| Reply::verdict(false, 0.1));
        reply.resolve().await
    }
}

pub fn reference_image() -> EncodedImage {
    EncodedImage::new(ImageKind::Jpeg, b"reference".to_vec())
}

/// 写入一个测试文件，内容即文件名
pub fn write_fixture(dir: &Path, relative: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, relative.as_bytes()).unwrap();
    path
}
