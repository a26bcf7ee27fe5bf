//! 候选文件枚举 - 业务能力层
//!
//! 把两种扫描来源统一成有序的 `Vec<ScanCandidate>`：
//! - 目录授权：列出文件，保留写入句柄
//! - 文件列表：只读，没有写入句柄
//!
//! 两种来源都只保留 jpg / jpeg / png / webp（不区分大小写），顺序与来源一致

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::infrastructure::{file_name_of, ScanSource};
use crate::models::{is_image_name, ScanCandidate};
use crate::services::organizer::ORGANIZED_DIR_NAME;

/// 从扫描来源枚举候选文件
///
/// 只读取目录元数据，不读取图片内容；整理输出目录不参与扫描
pub async fn enumerate(source: &ScanSource) -> Result<Vec<ScanCandidate>> {
    info!("📁 正在扫描候选文件: {}", source.describe());

    let candidates: Vec<ScanCandidate> = match source {
        ScanSource::Directory(dir) => {
            let files = dir
                .list_files(&[ORGANIZED_DIR_NAME])
                .await
                .with_context(|| format!("无法读取目录: {}", dir.root().display()))?;

            files
                .into_iter()
                .filter_map(|relative| {
                    let name = file_name_of(&relative);
                    if !is_image_name(&name) {
                        debug!("跳过非图片文件: {}", relative.display());
                        return None;
                    }
                    let path = dir.root().join(&relative);
                    Some(ScanCandidate::new(name, path, Some(dir.write_handle(relative))))
                })
                .collect()
        }
        ScanSource::FileList(files) => files
            .iter()
            .filter(|file| is_image_name(&file.name()))
            .map(|file| ScanCandidate::new(file.name(), file.path(), None))
            .collect(),
    };

    info!("✓ 找到 {} 个候选图片", candidates.len());
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{DirectoryHandle, FileRef};
    use std::fs;
    use tempfile::TempDir;

    fn names(candidates: &[ScanCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name()).collect()
    }

    #[tokio::test]
    async fn test_file_list_keeps_images_in_source_order() {
        let source = ScanSource::FileList(
            ["a.jpg", "b.txt", "c.PNG", "d.gif"]
                .into_iter()
                .map(FileRef::new)
                .collect(),
        );

        let candidates = enumerate(&source).await.unwrap();
        assert_eq!(names(&candidates), vec!["a.jpg", "c.PNG"]);
        assert!(candidates.iter().all(|c| c.write_handle().is_none()));
    }

    #[tokio::test]
    async fn test_directory_candidates_carry_write_handles() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.jpg", "b.txt", "c.PNG", "d.gif"] {
            fs::write(tmp.path().join(name), name.as_bytes()).unwrap();
        }
        fs::create_dir_all(tmp.path().join("trip")).unwrap();
        fs::write(tmp.path().join("trip").join("e.webp"), b"e").unwrap();

        let dir = DirectoryHandle::open(tmp.path(), true).unwrap();
        let candidates = enumerate(&ScanSource::Directory(dir)).await.unwrap();

        let mut found = names(&candidates);
        found.sort();
        assert_eq!(found, vec!["a.jpg", "c.PNG", "e.webp"]);
        assert!(candidates.iter().all(|c| c.write_handle().is_some()));
    }

    #[tokio::test]
    async fn test_organized_directory_is_not_rescanned() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"a").unwrap();
        fs::create_dir_all(tmp.path().join(ORGANIZED_DIR_NAME)).unwrap();
        fs::write(tmp.path().join(ORGANIZED_DIR_NAME).join("a.jpg"), b"a").unwrap();

        let dir = DirectoryHandle::open(tmp.path(), true).unwrap();
        let candidates = enumerate(&ScanSource::Directory(dir)).await.unwrap();
        assert_eq!(names(&candidates), vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn test_empty_source_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let dir = DirectoryHandle::open(tmp.path(), true).unwrap();
        assert!(enumerate(&ScanSource::Directory(dir)).await.unwrap().is_empty());
        assert!(enumerate(&ScanSource::FileList(Vec::new())).await.unwrap().is_empty());
    }
}
