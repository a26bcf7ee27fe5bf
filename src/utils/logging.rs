//! 日志工具模块
//!
//! 提供日志初始化、格式化和扫描报告输出的辅助函数

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{RunProgress, ScanResult};

/// 初始化 tracing 日志
///
/// 默认级别为 info，可以通过 `RUST_LOG` 调整
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化扫描报告文件
///
/// # 参数
/// - `log_file_path`: 报告文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n人脸扫描报告 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 把匹配结果追加到扫描报告
///
/// # 参数
/// - `log_file_path`: 报告文件路径
/// - `results`: 匹配结果
/// - `progress`: 最终进度
pub fn append_results(log_file_path: &str, results: &[ScanResult], progress: &RunProgress) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    writeln!(
        file,
        "已处理 {}/{} 个候选文件，匹配 {} 个",
        progress.processed_count,
        progress.total_count,
        results.len()
    )?;
    for result in results {
        writeln!(file, "{} | 置信度 {:.2}", result.file_name, result.confidence)?;
    }

    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `model_name`: 使用的模型
/// - `threshold`: 匹配阈值
pub fn log_startup(model_name: &str, threshold: f64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 人脸匹配扫描模式");
    info!("🤖 模型: {}", model_name);
    info!("🎯 匹配阈值: > {}", threshold);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `progress`: 最终进度
/// - `matched`: 匹配数量
/// - `log_file_path`: 报告文件路径
pub fn print_final_stats(progress: &RunProgress, matched: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 扫描完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔍 已处理: {}/{}", progress.processed_count, progress.total_count);
    info!("✅ 匹配: {}", matched);
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EncodedImage, ImageKind};
    use tempfile::TempDir;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("圆脸棕色眼睛", 2), "圆脸...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_report_lists_matches() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.txt");
        let path = path.to_str().unwrap();

        init_log_file(path).unwrap();
        let results = vec![ScanResult {
            file_name: "x.jpg".to_string(),
            confidence: 0.9,
            write_handle: None,
            preview_image: EncodedImage::new(ImageKind::Jpeg, b"x".to_vec()),
        }];
        let mut progress = RunProgress::new(3);
        for _ in 0..3 {
            progress.advance();
        }
        append_results(path, &results, &progress).unwrap();

        let report = fs::read_to_string(path).unwrap();
        assert!(report.contains("人脸扫描报告"));
        assert!(report.contains("3/3"));
        assert!(report.contains("x.jpg | 置信度 0.90"));
    }
}
