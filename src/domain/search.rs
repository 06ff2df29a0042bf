use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::SearchError;
use super::file_walker::WalkStats;
use super::matcher::normalize_filter;

/// 结果文件的扩展名
pub const RESULT_FILE_EXTENSION: &str = "txt";

/// 一次搜索的输入参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// 搜索根目录
    pub root_path: PathBuf,
    /// 规范化后的扩展名过滤器（小写，无前导 '.'）
    pub extension_filter: String,
    /// 结果文件所在目录
    pub output_dir: PathBuf,
    /// 结果文件名（不含 .txt）
    pub output_base_name: String,
}

impl SearchConfig {
    /// 从界面提供的四个字段创建配置，过滤器会被规范化
    pub fn new(
        root_path: impl Into<PathBuf>,
        extension_filter: &str,
        output_dir: impl Into<PathBuf>,
        output_base_name: &str,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            extension_filter: normalize_filter(extension_filter),
            output_dir: output_dir.into(),
            output_base_name: output_base_name.trim().to_string(),
        }
    }

    /// 结果文件路径: `{output_dir}/{output_base_name}.txt`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_base_name, RESULT_FILE_EXTENSION))
    }

    /// 检查参数是否完整，根目录是否存在
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.root_path.as_os_str().is_empty() {
            return Err(SearchError::Validation("搜索目录不能为空".to_string()));
        }
        if self.extension_filter.is_empty() {
            return Err(SearchError::Validation("扩展名不能为空".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(SearchError::Validation("输出目录不能为空".to_string()));
        }
        if self.output_base_name.is_empty() {
            return Err(SearchError::Validation("输出文件名不能为空".to_string()));
        }

        // 只支持单个扩展名，不支持多级扩展名或通配符
        if self
            .extension_filter
            .contains(|c: char| matches!(c, '.' | '/' | '\\' | '*' | '?'))
        {
            return Err(SearchError::Validation(format!(
                "扩展名只能是单个名称: {}",
                self.extension_filter
            )));
        }
        if self.output_base_name.contains(['/', '\\']) {
            return Err(SearchError::Validation(format!(
                "输出文件名不能包含路径分隔符: {}",
                self.output_base_name
            )));
        }

        ensure_directory(&self.root_path)
    }
}

/// 一次搜索结束时的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub stats: WalkStats,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn match_count(&self) -> u64 {
        self.stats.matched
    }
}

fn ensure_directory(path: &Path) -> Result<(), SearchError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(SearchError::Validation(format!(
            "搜索路径不是目录: {}",
            path.display()
        ))),
        Err(err) => Err(SearchError::Validation(format!(
            "搜索目录不存在或无法访问 {}: {}",
            path.display(),
            err
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_output_path() {
        let config = SearchConfig::new("/data", ".JPG", "/tmp/out", "photos");
        assert_eq!(config.extension_filter, "jpg");
        assert_eq!(config.output_path(), PathBuf::from("/tmp/out/photos.txt"));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let cases = [
            SearchConfig::new("", "txt", root, "out"),
            SearchConfig::new(root, "", root, "out"),
            SearchConfig::new(root, ".", root, "out"),
            SearchConfig::new(root, "txt", "", "out"),
            SearchConfig::new(root, "txt", root, "  "),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", config);
        }
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let missing = SearchConfig::new(dir.path().join("missing"), "txt", dir.path(), "out");
        assert_eq!(missing.validate().unwrap_err().kind(), ErrorKind::Validation);

        let not_dir = SearchConfig::new(&file, "txt", dir.path(), "out");
        assert_eq!(not_dir.validate().unwrap_err().kind(), ErrorKind::Validation);

        let ok = SearchConfig::new(dir.path(), "txt", dir.path(), "out");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_multi_extension_rejected() {
        let dir = tempdir().unwrap();
        let config = SearchConfig::new(dir.path(), "tar.gz", dir.path(), "out");
        assert!(config.validate().is_err());

        let config = SearchConfig::new(dir.path(), "*.txt", dir.path(), "out");
        assert!(config.validate().is_err());

        let config = SearchConfig::new(dir.path(), "txt", dir.path(), "a/b");
        assert!(config.validate().is_err());
    }
}
