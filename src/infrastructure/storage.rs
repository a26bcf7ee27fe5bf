//! 存储能力 - 基础设施层
//!
//! 只暴露"列出 / 读取 / 在授权目录内写入"的能力，不认识身份特征和匹配结果。
//!
//! - [`DirectoryHandle`]：目录授权，可递归列出文件、创建子目录、写入文件
//! - [`WriteHandle`]：指向授权目录中某个文件的弱引用，授权释放后即失效
//! - [`FileRef`]：只读的文件引用（旧式文件列表）
//! - [`ScanSource`]：两种扫描来源的统一入口

use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 目录授权
#[derive(Debug)]
struct DirectoryGrant {
    root: PathBuf,
    recursive: bool,
}

/// 目录能力句柄
///
/// 克隆句柄共享同一份授权；所有写入都限制在根目录之内
#[derive(Debug, Clone)]
pub struct DirectoryHandle {
    grant: Arc<DirectoryGrant>,
}

impl DirectoryHandle {
    /// 打开目录授权
    pub fn open(root: impl Into<PathBuf>, recursive: bool) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("目录不存在: {}", root.display());
        }

        Ok(Self {
            grant: Arc::new(DirectoryGrant { root, recursive }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.grant.root
    }

    pub fn is_recursive(&self) -> bool {
        self.grant.recursive
    }

    /// 列出目录中的所有文件（相对路径）
    ///
    /// 顺序与文件系统返回的顺序一致，不做排序。
    /// `skip_dirs` 中的顶层子目录会被跳过。只读取目录元数据，不读取文件内容。
    /// 根目录本身无法读取时返回错误，子目录中无法访问的项只记录警告。
    pub async fn list_files(&self, skip_dirs: &[&str]) -> Result<Vec<PathBuf>> {
        let root = self.grant.root.clone();
        let max_depth = if self.grant.recursive { usize::MAX } else { 1 };
        let skip: Vec<String> = skip_dirs.iter().map(|d| d.to_string()).collect();

        tokio::task::spawn_blocking(move || {
            let walker = WalkDir::new(&root)
                .min_depth(1)
                .max_depth(max_depth)
                .into_iter()
                .filter_entry(|entry| {
                    !(entry.depth() == 1
                        && entry.file_type().is_dir()
                        && skip.iter().any(|d| entry.file_name() == d.as_str()))
                });

            let mut files = Vec::new();
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) if e.depth() == 0 => {
                        let message = format!("无法读取授权目录: {}", root.display());
                        return Err(anyhow::Error::new(e).context(message));
                    }
                    Err(e) => {
                        warn!("跳过无法访问的目录项: {}", e);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let relative = entry
                    .path()
                    .strip_prefix(&root)
                    .with_context(|| format!("路径不在授权目录内: {}", entry.path().display()))?
                    .to_path_buf();
                files.push(relative);
            }

            debug!("目录 {} 中共有 {} 个文件", root.display(), files.len());
            Ok::<_, anyhow::Error>(files)
        })
        .await
        .context("目录枚举任务异常退出")?
    }

    /// 为授权目录中的文件创建写入句柄
    pub fn write_handle(&self, relative: impl Into<PathBuf>) -> WriteHandle {
        WriteHandle {
            grant: Arc::downgrade(&self.grant),
            relative: relative.into(),
        }
    }

    /// 创建（或复用）一级子目录，返回子目录的授权句柄
    pub async fn subdirectory(&self, name: &str) -> Result<DirectoryHandle> {
        ensure_plain_name(name)?;

        let path = self.grant.root.join(name);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("无法创建目录: {}", path.display()))?;

        Ok(Self {
            grant: Arc::new(DirectoryGrant {
                root: path,
                recursive: false,
            }),
        })
    }

    /// 在授权目录下写入文件（不存在则创建，存在则覆盖）
    pub async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<()> {
        ensure_plain_name(name)?;

        let path = self.grant.root.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("写入文件失败: {}", path.display()))?;

        debug!("已写入 {} ({} 字节)", path.display(), bytes.len());
        Ok(())
    }
}

/// 写入句柄
///
/// 只是对授权目录的弱引用，不拥有文件本身
#[derive(Debug, Clone)]
pub struct WriteHandle {
    grant: Weak<DirectoryGrant>,
    relative: PathBuf,
}

impl WriteHandle {
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    /// 授权是否仍然有效
    pub fn is_live(&self) -> bool {
        self.grant.strong_count() > 0
    }

    /// 读取原始文件内容
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let grant = self
            .grant
            .upgrade()
            .with_context(|| format!("目录授权已失效: {}", self.relative.display()))?;

        let path = grant.root.join(&self.relative);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("无法读取文件: {}", path.display()))
    }
}

/// 只读文件引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件名（不含目录）
    pub fn name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// 扫描来源
#[derive(Debug, Clone)]
pub enum ScanSource {
    /// 目录授权：可递归枚举，匹配结果可以整理
    Directory(DirectoryHandle),
    /// 旧式文件列表：只读，不支持整理
    FileList(Vec<FileRef>),
}

impl ScanSource {
    /// 可写入的根目录（文件列表来源没有）
    pub fn writable_root(&self) -> Option<&DirectoryHandle> {
        match self {
            ScanSource::Directory(dir) => Some(dir),
            ScanSource::FileList(_) => None,
        }
    }

    /// 用于日志的简短描述
    pub fn describe(&self) -> String {
        match self {
            ScanSource::Directory(dir) => format!(
                "目录 {}{}",
                dir.root().display(),
                if dir.is_recursive() { " (递归)" } else { "" }
            ),
            ScanSource::FileList(files) => format!("文件列表 ({} 个文件)", files.len()),
        }
    }
}

/// 取路径中的文件名部分
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// 名称必须是单个普通路径段，保证写入不会离开授权目录
fn ensure_plain_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("非法的文件名: {:?}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plain_names_only() {
        assert!(ensure_plain_name("a.jpg").is_ok());
        assert!(ensure_plain_name("../a.jpg").is_err());
        assert!(ensure_plain_name("sub/a.jpg").is_err());
        assert!(ensure_plain_name("/etc/passwd").is_err());
        assert!(ensure_plain_name("").is_err());
    }

    #[test]
    fn test_open_rejects_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(DirectoryHandle::open(tmp.path().join("missing"), true).is_err());
    }

    #[tokio::test]
    async fn test_list_files_respects_recursion_and_skip_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("top.jpg"), b"1").unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("deep.png"), b"2").unwrap();
        fs::create_dir_all(tmp.path().join("skipped")).unwrap();
        fs::write(tmp.path().join("skipped").join("old.jpg"), b"3").unwrap();

        let recursive = DirectoryHandle::open(tmp.path(), true).unwrap();
        let mut files = recursive.list_files(&["skipped"]).await.unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![PathBuf::from("nested").join("deep.png"), PathBuf::from("top.jpg")]
        );

        let flat = DirectoryHandle::open(tmp.path(), false).unwrap();
        let files = flat.list_files(&[]).await.unwrap();
        assert_eq!(files, vec![PathBuf::from("top.jpg")]);
    }

    #[tokio::test]
    async fn test_list_files_fails_when_root_disappears() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("photos");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.jpg"), b"1").unwrap();

        let dir = DirectoryHandle::open(&root, true).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert!(dir.list_files(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_write_handle_fails_after_grant_dropped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"face").unwrap();

        let dir = DirectoryHandle::open(tmp.path(), false).unwrap();
        let handle = dir.write_handle("a.jpg");
        assert!(handle.is_live());
        assert_eq!(handle.read_bytes().await.unwrap(), b"face");

        drop(dir);
        assert!(!handle.is_live());
        assert!(handle.read_bytes().await.is_err());
    }

    #[tokio::test]
    async fn test_subdirectory_write_overwrites() {
        let tmp = TempDir::new().unwrap();
        let dir = DirectoryHandle::open(tmp.path(), true).unwrap();

        let sub = dir.subdirectory("out").await.unwrap();
        sub.write_file("a.jpg", b"first").await.unwrap();
        sub.write_file("a.jpg", b"second").await.unwrap();

        let again = dir.subdirectory("out").await.unwrap();
        assert_eq!(again.root(), tmp.path().join("out"));
        assert_eq!(fs::read(tmp.path().join("out").join("a.jpg")).unwrap(), b"second");
        assert!(sub.write_file("../escape.jpg", b"x").await.is_err());
    }

    #[test]
    fn test_only_directory_sources_are_writable() {
        let tmp = TempDir::new().unwrap();
        let dir = DirectoryHandle::open(tmp.path(), true).unwrap();
        assert!(ScanSource::Directory(dir).writable_root().is_some());
        assert!(ScanSource::FileList(vec![FileRef::new("a.jpg")])
            .writable_root()
            .is_none());
    }
}
