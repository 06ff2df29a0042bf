use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::file_walker::DIRECTORY_LOG_PREFIX;
use crate::domain::{ErrorKind, RunSummary};
use crate::infrastructure::LogEvent;

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    }
}

/// 终端上的实时日志：日志行打印在进度条上方
pub struct LogConsole {
    progress: Option<ProgressBar>,
    directories: u64,
}

impl LogConsole {
    /// 不显示进度条时日志直接写到标准输出
    pub fn new(show_progress: bool) -> Result<Self> {
        let progress = if show_progress {
            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
            );
            progress.enable_steady_tick(Duration::from_millis(100));
            progress.set_message("准备中");
            Some(progress)
        } else {
            None
        };

        Ok(Self {
            progress,
            directories: 0,
        })
    }

    pub fn print_log(&mut self, event: &LogEvent) -> Result<()> {
        if let Some(dir) = event.message.strip_prefix(DIRECTORY_LOG_PREFIX) {
            self.directories += 1;
            if let Some(progress) = &self.progress {
                progress.set_message(format!("已扫描 {} 个目录 | {}", self.directories, dir));
            }
        }

        match &self.progress {
            Some(progress) => progress.println(&event.message),
            None => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", event.message)?;
            }
        }
        Ok(())
    }

    pub fn finish(&self) {
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
    }
}

/// 打印搜索摘要
pub fn print_summary(title: &str, summary: &RunSummary) -> Result<()> {
    let stats = &summary.stats;
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "\n{}:", title)?;
    writeln!(stdout, "----------------------------")?;
    writeln!(stdout, "总用时: {}", format_duration(summary.elapsed))?;
    writeln!(stdout, "扫描目录: {}", stats.directories)?;
    writeln!(stdout, "检查文件: {}", stats.files_examined)?;
    writeln!(stdout, "匹配文件: {}", stats.matched)?;
    if stats.error_count() > 0 {
        writeln!(
            stdout,
            "错误: {} (目录 {} / 文件 {})",
            stats.error_count(),
            stats.directory_errors,
            stats.file_errors
        )?;
    }
    writeln!(stdout, "结果文件: {}", summary.output_path.display())?;

    Ok(())
}

/// 打印失败信息
pub fn print_failure(kind: ErrorKind, message: &str) {
    eprintln!("\n搜索失败 ({}): {}", kind, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_console_counts_directories() {
        let mut console = LogConsole::new(false).unwrap();
        let event = |message: &str| LogEvent {
            run_id: 1,
            seq: 0,
            message: message.to_string(),
        };

        console.print_log(&event("扫描开始: /data")).unwrap();
        console.print_log(&event(">> 分析目录: /data")).unwrap();
        console.print_log(&event(">> 分析目录: /data/a")).unwrap();
        console.finish();

        assert_eq!(console.directories, 2);
    }
}
