use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;

use crate::domain::RunSummary;
use crate::infrastructure::log_sink::LogEvent;

/// 日志记录器trait
pub trait LoggerTrait: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn log_message(&self, message: &str) -> Result<()>;
    fn log_event(&self, event: &LogEvent) -> Result<()>;
    fn finalize(&self, outcome: &str, summary: &RunSummary) -> Result<()>;
}

/// 调试日志记录器，把每条日志事件附带时间戳写入文件
pub struct Logger {
    log_file: Arc<Mutex<Option<File>>>,
    log_path: PathBuf,
    enabled: bool,
}

impl Logger {
    /// 创建新的日志记录器，日志文件放在 `log_dir` 下
    pub fn new(enabled: bool, log_dir: &Path) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        // 获取当前时间作为文件名的一部分
        let now = Local::now();
        let timestamp = now.format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("find_extension_{}.log", timestamp));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("无法创建日志文件: {}", log_path.display()))?;

        // 写入UTF-8 BOM以确保文件被正确识别为UTF-8
        let mut file_clone = file.try_clone()?;
        file_clone.write_all(&[0xEF, 0xBB, 0xBF])?;

        writeln!(file_clone, "# find-extension 调试日志")?;
        writeln!(file_clone, "# 开始时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file_clone, "# --------------------------------------------")?;

        Ok(Self {
            log_file: Arc::new(Mutex::new(Some(file))),
            log_path,
            enabled: true,
        })
    }

    /// 不写任何内容的记录器
    pub fn disabled() -> Self {
        Self {
            log_file: Arc::new(Mutex::new(None)),
            log_path: PathBuf::new(),
            enabled: false,
        }
    }

    /// 获取日志文件路径
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write_line(&self, line: &str) -> Result<()> {
        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "{}", line)?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl LoggerTrait for Logger {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_message(&self, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&format!("[{}] {}", timestamp, message))
    }

    fn log_event(&self, event: &LogEvent) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(&format!(
            "[{}] #{}/{} {}",
            timestamp, event.run_id, event.seq, event.message
        ))
    }

    fn finalize(&self, outcome: &str, summary: &RunSummary) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let now = Local::now();
        let stats = &summary.stats;
        self.write_line("# --------------------------------------------")?;
        self.write_line(&format!("# 结束时间: {}", now.format("%Y-%m-%d %H:%M:%S")))?;
        self.write_line(&format!("# 结果: {}", outcome))?;
        self.write_line(&format!("# 总用时: {:.3}秒", summary.elapsed.as_secs_f64()))?;
        self.write_line(&format!("# 扫描目录数: {}", stats.directories))?;
        self.write_line(&format!("# 检查文件数: {}", stats.files_examined))?;
        self.write_line(&format!("# 匹配文件数: {}", stats.matched))?;
        self.write_line(&format!(
            "# 错误数: 目录 {} / 文件 {}",
            stats.directory_errors, stats.file_errors
        ))?;
        self.write_line(&format!("# 结果文件: {}", summary.output_path.display()))?;
        self.write_line("# ============================================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WalkStats;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_logger_creation() {
        let dir = tempdir().unwrap();

        let logger = Logger::new(false, dir.path()).unwrap();
        assert!(!logger.is_enabled());
        assert!(logger.log_message("ignored").is_ok());

        let logger = Logger::new(true, dir.path()).unwrap();
        assert!(logger.is_enabled());
        assert!(logger.log_path().starts_with(dir.path()));
    }

    #[test]
    fn test_logger_writes_events_and_footer() {
        let dir = tempdir().unwrap();
        let logger = Logger::new(true, dir.path()).unwrap();
        let logger_trait: &dyn LoggerTrait = &logger;

        logger_trait
            .log_event(&LogEvent {
                run_id: 3,
                seq: 0,
                message: ">> 分析目录: /data".to_string(),
            })
            .unwrap();

        let summary = RunSummary {
            output_path: PathBuf::from("/tmp/out.txt"),
            stats: WalkStats {
                directories: 4,
                matched: 2,
                ..WalkStats::default()
            },
            elapsed: Duration::from_millis(1500),
        };
        logger_trait.finalize("完成", &summary).unwrap();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("#3/0 >> 分析目录: /data"));
        assert!(content.contains("# 匹配文件数: 2"));
        assert!(content.contains("# 扫描目录数: 4"));
    }
}
