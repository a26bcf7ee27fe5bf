//! 结果整理服务 - 业务能力层
//!
//! 只负责"把匹配到的文件复制到固定子目录"能力，不关心流程

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::infrastructure::DirectoryHandle;
use crate::models::ScanResult;

/// 整理输出目录名称（位于扫描根目录下）
pub const ORGANIZED_DIR_NAME: &str = "Face_Matches";

/// 结果整理服务
///
/// 职责：
/// - 在可写根目录下创建（或复用）输出子目录
/// - 通过写入句柄读取原文件，原样写入输出目录（同名覆盖）
/// - 没有写入句柄的结果直接跳过
/// - 任意一个文件失败即中止，已写入的文件保留
pub struct ResultOrganizer {
    dir_name: String,
}

impl ResultOrganizer {
    pub fn new() -> Self {
        Self {
            dir_name: ORGANIZED_DIR_NAME.to_string(),
        }
    }

    /// 使用自定义输出目录名创建
    #[cfg(test)]
    pub fn with_dir_name(dir_name: impl Into<String>) -> Self {
        Self {
            dir_name: dir_name.into(),
        }
    }

    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    /// 整理匹配结果
    ///
    /// # 返回
    /// 返回计划整理的结果数量（有写入句柄的结果数）
    pub async fn organize(&self, results: &[ScanResult], writable_root: &DirectoryHandle) -> Result<usize> {
        let target = writable_root
            .subdirectory(&self.dir_name)
            .await
            .with_context(|| format!("无法创建输出目录: {}", self.dir_name))?;

        let eligible: Vec<_> = results
            .iter()
            .filter_map(|result| result.write_handle.as_ref().map(|handle| (result, handle)))
            .collect();

        info!(
            "📂 正在整理 {} 个匹配结果到 {}",
            eligible.len(),
            target.root().display()
        );

        for (result, handle) in &eligible {
            let bytes = handle
                .read_bytes()
                .await
                .with_context(|| format!("读取 {} 失败", result.file_name))?;

            target
                .write_file(&result.file_name, &bytes)
                .await
                .with_context(|| format!("写入 {} 失败", result.file_name))?;

            debug!("✓ 已整理: {} → {}", handle.relative_path().display(), result.file_name);
        }

        Ok(eligible.len())
    }
}

impl Default for ResultOrganizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodedImage, ImageKind};
    use std::fs;
    use tempfile::TempDir;

    fn result(dir: Option<&DirectoryHandle>, name: &str) -> ScanResult {
        ScanResult {
            file_name: name.to_string(),
            confidence: 0.9,
            write_handle: dir.map(|d| d.write_handle(name)),
            preview_image: EncodedImage::new(ImageKind::Jpeg, b"preview".to_vec()),
        }
    }

    #[tokio::test]
    async fn test_organize_twice_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.jpg"), b"x-bytes").unwrap();
        fs::write(tmp.path().join("w.png"), b"w-bytes").unwrap();

        let root = DirectoryHandle::open(tmp.path(), true).unwrap();
        let results = vec![
            result(Some(&root), "x.jpg"),
            result(Some(&root), "w.png"),
            result(None, "legacy.jpg"),
        ];
        let organizer = ResultOrganizer::new();

        let first = organizer.organize(&results, &root).await.unwrap();
        let copied = tmp.path().join(ORGANIZED_DIR_NAME).join("x.jpg");
        let bytes_after_first = fs::read(&copied).unwrap();

        let second = organizer.organize(&results, &root).await.unwrap();
        let bytes_after_second = fs::read(&copied).unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(bytes_after_first, b"x-bytes");
        assert_eq!(bytes_after_first, bytes_after_second);
        assert!(!tmp.path().join(ORGANIZED_DIR_NAME).join("legacy.jpg").exists());
    }

    #[tokio::test]
    async fn test_first_failure_aborts_and_keeps_written_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"a").unwrap();

        let root = DirectoryHandle::open(tmp.path(), true).unwrap();
        // missing.jpg 不存在，读取会失败
        let results = vec![
            result(Some(&root), "a.jpg"),
            result(Some(&root), "missing.jpg"),
        ];

        let organizer = ResultOrganizer::with_dir_name("picked");
        assert!(organizer.organize(&results, &root).await.is_err());
        assert_eq!(fs::read(tmp.path().join("picked").join("a.jpg")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_no_eligible_results_still_succeeds() {
        let tmp = TempDir::new().unwrap();
        let root = DirectoryHandle::open(tmp.path(), true).unwrap();

        let written = ResultOrganizer::new()
            .organize(&[result(None, "legacy.jpg")], &root)
            .await
            .unwrap();
        assert_eq!(written, 0);
    }
}
