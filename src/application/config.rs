use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::WalkOptions;

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 遍历相关配置
    pub walk: WalkConfig,
    /// 结果文件默认值
    pub output: OutputConfig,
    /// 事件通道配置
    pub events: EventsConfig,
    /// 调试日志配置
    pub logging: LoggingConfig,
}

/// 遍历配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// 同级条目按文件名排序
    pub sort_entries: bool,
    /// 是否跟随符号链接
    pub follow_links: bool,
    /// 结果文件位于搜索目录内时不把它算作匹配
    pub skip_output_file: bool,
}

/// 结果文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 未指定输出目录时使用
    pub default_dir: String,
    /// 未指定输出文件名时使用（不含 .txt）
    pub default_base_name: String,
}

/// 事件通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// 日志通道容量，界面处理不过来时后台线程会等待
    pub buffer_size: usize,
}

/// 调试日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 是否写调试日志文件
    pub debug_log: bool,
    /// 调试日志所在目录
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            walk: WalkConfig {
                sort_entries: true,
                follow_links: false,
                skip_output_file: true,
            },
            output: OutputConfig {
                default_dir: ".".to_string(),
                default_base_name: "results".to_string(),
            },
            events: EventsConfig { buffer_size: 1024 },
            logging: LoggingConfig {
                debug_log: false,
                log_dir: ".".to_string(),
            },
        }
    }
}

impl Config {
    /// 从配置文件加载配置，如果文件不存在则创建默认配置文件
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let config = Self::default();
            config.save_to_file(config_path)?;
            println!("已创建默认配置文件: {}", config_path.display());
            Ok(config)
        }
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", config_path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("无法序列化配置")?;

        fs::write(config_path, content)
            .with_context(|| format!("无法写入配置文件: {}", config_path.display()))?;

        Ok(())
    }

    /// 获取配置文件的默认路径
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("无法获取程序路径")?;

        let exe_dir = exe_path.parent().context("无法获取程序目录")?;

        Ok(exe_dir.join("find_extension.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.events.buffer_size == 0 || self.events.buffer_size > 65536 {
            anyhow::bail!("events.buffer_size 必须在 1-65536 之间");
        }

        let base_name = self.output.default_base_name.trim();
        if base_name.is_empty() {
            anyhow::bail!("output.default_base_name 不能为空");
        }
        if base_name.contains(['/', '\\']) {
            anyhow::bail!("output.default_base_name 不能包含路径分隔符");
        }

        if self.output.default_dir.trim().is_empty() {
            anyhow::bail!("output.default_dir 不能为空");
        }

        Ok(())
    }

    /// 遍历选项（不含要跳过的结果文件，由控制器在启动时填入）
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            sort_entries: self.walk.sort_entries,
            follow_links: self.walk.follow_links,
            skip_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.walk.sort_entries);
        assert!(!config.walk.follow_links);
        assert_eq!(config.output.default_base_name, "results");
        assert_eq!(config.events.buffer_size, 1024);
        assert!(!config.logging.debug_log);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.events.buffer_size, deserialized.events.buffer_size);
        assert_eq!(config.output.default_dir, deserialized.output.default_dir);
    }

    #[test]
    fn test_load_or_create() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested/config.toml");

        let created = Config::load_or_create(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = Config::load_or_create(&config_path).unwrap();
        assert_eq!(created.output.default_base_name, loaded.output.default_base_name);
    }

    #[test]
    fn test_load_custom_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[walk]
sort_entries = false
follow_links = true
skip_output_file = false

[output]
default_dir = "/tmp"
default_base_name = "found"

[events]
buffer_size = 8

[logging]
debug_log = true
log_dir = "logs"
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert!(config.validate().is_ok());
        let options = config.walk_options();
        assert!(!options.sort_entries);
        assert!(options.follow_links);
        assert_eq!(config.output.default_base_name, "found");
        assert_eq!(config.events.buffer_size, 8);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.events.buffer_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.output.default_base_name = "a/b".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.output.default_base_name = "   ".to_string();
        assert!(config.validate().is_err());
    }
}
