use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::WalkBuilder;

use super::error::{SearchError, WalkAbort};
use super::matcher;
use crate::infrastructure::{LogSink, ResultSink};

/// 每个被访问目录对应的日志行前缀
pub const DIRECTORY_LOG_PREFIX: &str = ">> 分析目录: ";

/// 协作式取消标记，遍历在进入每个目录前检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重复调用无副作用
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 遍历选项
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// 同级条目按文件名排序（文件在前，子目录在后），保证输出顺序可复现
    pub sort_entries: bool,
    /// 是否跟随符号链接
    pub follow_links: bool,
    /// 不作为匹配结果输出的文件（通常是结果文件本身）
    pub skip_path: Option<PathBuf>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            sort_entries: true,
            follow_links: false,
            skip_path: None,
        }
    }
}

/// 遍历统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: u64,
    pub files_examined: u64,
    pub matched: u64,
    pub directory_errors: u64,
    pub file_errors: u64,
}

impl WalkStats {
    pub fn error_count(&self) -> u64 {
        self.directory_errors + self.file_errors
    }
}

/// 递归遍历 `root`，把扩展名等于 `filter` 的文件写入 `sink`
///
/// 深度优先、先序：目录先记录日志再处理其中的条目，排序时目录中的文件先于
/// 子目录输出。单个目录或文件的错误
/// 只记录日志并继续；根目录不可用或被取消时返回 [`WalkAbort`]，其中带有
/// 已累计的统计。
pub fn walk(
    root: &Path,
    filter: &str,
    sink: &mut dyn ResultSink,
    log: &LogSink,
    cancel: &CancelToken,
    options: &WalkOptions,
) -> Result<WalkStats, WalkAbort> {
    let mut stats = WalkStats::default();

    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(WalkAbort {
                stats,
                error: SearchError::io(
                    root,
                    io::Error::new(io::ErrorKind::Other, "不是目录"),
                ),
            })
        }
        Err(err) => {
            return Err(WalkAbort {
                stats,
                error: SearchError::io(root, err),
            })
        }
    }

    let skip_path = options
        .skip_path
        .as_ref()
        .and_then(|path| fs::canonicalize(path).ok());

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false) // 搜索所有文件，包括隐藏文件
        .follow_links(options.follow_links)
        .threads(1);
    if options.sort_entries {
        // 同一目录内先处理文件再进入子目录
        builder.sort_by_file_path(|a, b| {
            (a.is_dir(), a.file_name()).cmp(&(b.is_dir(), b.file_name()))
        });
    }

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                let error = classify_walk_error(&err);
                match error {
                    SearchError::FileAccess { .. } => stats.file_errors += 1,
                    _ => stats.directory_errors += 1,
                }
                log.emit(error.to_string());
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Some(file_type) => file_type,
            None => continue,
        };

        if file_type.is_dir() {
            if cancel.is_cancelled() {
                if let Err(err) = sink.flush() {
                    log.emit(format!("刷新结果文件失败: {}", err));
                }
                return Err(WalkAbort {
                    stats,
                    error: SearchError::Cancelled,
                });
            }

            stats.directories += 1;
            log.emit(format!("{}{}", DIRECTORY_LOG_PREFIX, entry.path().display()));
            continue;
        }

        // 只处理普通文件
        if !file_type.is_file() {
            continue;
        }

        stats.files_examined += 1;
        let path = entry.path();
        if !matcher::matches(path, filter) {
            continue;
        }
        if is_skipped(path, skip_path.as_deref()) {
            continue;
        }

        match sink.write_path(path) {
            Ok(()) => stats.matched += 1,
            Err(err) => {
                stats.file_errors += 1;
                let error = SearchError::FileAccess {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                };
                log.emit(error.to_string());
            }
        }
    }

    Ok(stats)
}

fn is_skipped(path: &Path, skip_path: Option<&Path>) -> bool {
    let skip_path = match skip_path {
        Some(skip_path) => skip_path,
        None => return false,
    };

    // 文件名不同就不必解析真实路径
    if path.file_name() != skip_path.file_name() {
        return false;
    }
    fs::canonicalize(path).map_or(false, |real| real == skip_path)
}

/// 把遍历错误归类为目录错误或文件错误
fn classify_walk_error(err: &ignore::Error) -> SearchError {
    let message = match err.io_error() {
        Some(io_err) => io_err.to_string(),
        None => err.to_string(),
    };

    match error_path(err) {
        Some(path) => {
            let is_file = fs::symlink_metadata(path).map_or(false, |m| !m.is_dir());
            if is_file {
                SearchError::FileAccess {
                    path: path.to_path_buf(),
                    message,
                }
            } else {
                SearchError::DirectoryAccess {
                    path: path.to_path_buf(),
                    message,
                }
            }
        }
        None => SearchError::DirectoryAccess {
            path: PathBuf::new(),
            message,
        },
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } => error_path(err),
        ignore::Error::WithLineNumber { err, .. } => error_path(err),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}
