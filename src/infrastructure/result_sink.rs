use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 匹配结果写入器trait
///
/// 每次 `write_path` 追加一行（路径 + 换行符）。不支持并发调用，
/// 同一次搜索只有后台工作线程会写入。
pub trait ResultSink: Send {
    fn write_path(&mut self, path: &Path) -> io::Result<()>;

    /// 把缓冲中的完整行写出
    fn flush(&mut self) -> io::Result<()>;

    /// 成功返回后，之前写入的所有行都已刷新到存储
    fn close(&mut self) -> io::Result<()>;
}

fn path_line(path: &Path) -> io::Result<String> {
    let text = path.to_str().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "路径不是有效的 UTF-8")
    })?;
    Ok(format!("{}\n", text))
}

/// 写入结果文件（存在则截断）
pub struct FileResultSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl FileResultSink {
    /// 创建或截断结果文件
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }
}

impl ResultSink for FileResultSink {
    fn write_path(&mut self, path: &Path) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("结果文件已关闭: {}", self.path.display()),
                )
            })?;
        // 先拼好整行再写入，避免出现半行
        writer.write_all(path_line(path)?.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

/// 内存中的结果写入器，`lines()` 返回的句柄可在写入器移交给其他线程后读取结果
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSink {
    lines: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ResultSink for MemoryResultSink {
    fn write_path(&mut self, path: &Path) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "结果已关闭"));
        }
        let line = path_line(path)?;
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "结果缓冲区不可用"))?;
        lines.push(line.trim_end_matches('\n').to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("result.txt");

        let mut sink = FileResultSink::create(&out).unwrap();
        sink.write_path(Path::new("/a/1.txt")).unwrap();
        sink.write_path(Path::new("/a/b/2.txt")).unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "/a/1.txt\n/a/b/2.txt\n");
        let err = sink.write_path(Path::new("/late.txt")).unwrap_err();
        assert!(err.to_string().contains("result.txt"));
    }

    #[test]
    fn test_file_sink_truncates() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("result.txt");
        fs::write(&out, "old line 1\nold line 2\nold line 3\n").unwrap();

        let mut sink = FileResultSink::create(&out).unwrap();
        sink.write_path(Path::new("new.txt")).unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "new.txt\n");
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryResultSink::new();
        let mut writer = sink.clone();
        writer.write_path(Path::new("x/y.txt")).unwrap();
        writer.close().unwrap();

        assert_eq!(sink.lines(), vec!["x/y.txt".to_string()]);
        assert!(writer.write_path(Path::new("z.txt")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut sink = MemoryResultSink::new();
        let path = Path::new(OsStr::from_bytes(b"bad\xff.txt"));
        let err = sink.write_path(path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(sink.lines().is_empty());
    }
}
