use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::file_walker::WalkStats;

/// 搜索过程中的错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// 输入参数缺失或无效，搜索不会启动
    #[error("参数无效: {0}")]
    Validation(String),

    /// 无法打开输出文件或根目录不可访问
    #[error("I/O 错误 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 无法列出某个目录（非致命）
    #[error("无法访问目录 {}: {message}", .path.display())]
    DirectoryAccess { path: PathBuf, message: String },

    /// 无法处理某个文件（非致命）
    #[error("无法处理文件 {}: {message}", .path.display())]
    FileAccess { path: PathBuf, message: String },

    /// 用户取消
    #[error("搜索已取消")]
    Cancelled,

    /// 已有搜索正在运行
    #[error("已有搜索正在运行")]
    Busy,
}

impl SearchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SearchError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Validation(_) => ErrorKind::Validation,
            SearchError::Io { .. } => ErrorKind::Io,
            SearchError::DirectoryAccess { .. } => ErrorKind::DirectoryAccess,
            SearchError::FileAccess { .. } => ErrorKind::FileAccess,
            SearchError::Cancelled => ErrorKind::Cancelled,
            SearchError::Busy => ErrorKind::Busy,
        }
    }
}

/// 错误类型分类，随终止事件一起发送给界面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Io,
    DirectoryAccess,
    FileAccess,
    Cancelled,
    Busy,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "参数校验",
            ErrorKind::Io => "文件读写",
            ErrorKind::DirectoryAccess => "目录访问",
            ErrorKind::FileAccess => "文件访问",
            ErrorKind::Cancelled => "已取消",
            ErrorKind::Busy => "忙碌",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 遍历被中止：取消或根目录不可用。携带中止前已累计的统计
#[derive(Debug, Error)]
#[error("{error}")]
pub struct WalkAbort {
    pub stats: WalkStats,
    #[source]
    pub error: SearchError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(SearchError::Busy.kind(), ErrorKind::Busy);
        assert_eq!(
            SearchError::io("/x", io::Error::from(io::ErrorKind::NotFound)).kind(),
            ErrorKind::Io
        );
        assert_eq!(ErrorKind::Cancelled.as_str(), "已取消");
    }

    #[test]
    fn test_error_messages() {
        let dir_err = SearchError::DirectoryAccess {
            path: PathBuf::from("/locked"),
            message: "permission denied".to_string(),
        };
        assert_eq!(dir_err.kind(), ErrorKind::DirectoryAccess);
        assert!(dir_err.to_string().contains("/locked"));
        assert!(dir_err.to_string().contains("permission denied"));
    }
}
