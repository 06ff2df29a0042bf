use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::domain::{ErrorKind, RunSummary};
use crate::infrastructure::{Logger, LoggerTrait};

/// 一条进度日志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub run_id: u64,
    /// 本次搜索内的发送顺序
    pub seq: u64,
    pub message: String,
}

/// 后台工作线程发给界面的事件
///
/// 每次启动的搜索先发送若干 `Log`，最后发送且只发送一个终止事件。
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Log(LogEvent),
    Completed { run_id: u64, summary: RunSummary },
    Failed {
        run_id: u64,
        kind: ErrorKind,
        message: String,
    },
    Cancelled { run_id: u64, summary: RunSummary },
}

impl SearchEvent {
    pub fn run_id(&self) -> u64 {
        match self {
            SearchEvent::Log(event) => event.run_id,
            SearchEvent::Completed { run_id, .. }
            | SearchEvent::Failed { run_id, .. }
            | SearchEvent::Cancelled { run_id, .. } => *run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchEvent::Log(_))
    }
}

/// 有序的日志通道（发送端）
///
/// 同一次搜索只有一个生产者，事件按发送顺序到达界面。
pub struct LogSink {
    run_id: u64,
    next_seq: AtomicU64,
    sender: Sender<SearchEvent>,
    logger: Arc<dyn LoggerTrait>,
}

impl LogSink {
    pub fn new(run_id: u64, sender: Sender<SearchEvent>, logger: Arc<dyn LoggerTrait>) -> Self {
        Self {
            run_id,
            next_seq: AtomicU64::new(0),
            sender,
            logger,
        }
    }

    /// 创建一个无界通道和对应的接收端，调试日志关闭
    pub fn channel(run_id: u64) -> (Self, EventStream) {
        let (tx, rx) = unbounded();
        (
            Self::new(run_id, tx, Arc::new(Logger::disabled())),
            EventStream::new(rx),
        )
    }

    /// 发送一条日志
    pub fn emit(&self, message: impl Into<String>) {
        let event = LogEvent {
            run_id: self.run_id,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            message: message.into(),
        };

        if self.logger.is_enabled() {
            let _ = self.logger.log_event(&event);
        }

        // 界面已经不再接收时丢弃日志，搜索继续
        let _ = self.sender.send(SearchEvent::Log(event));
    }

    /// 发送终止事件
    pub fn finish(&self, event: SearchEvent) {
        if self.logger.is_enabled() {
            match &event {
                SearchEvent::Completed { summary, .. } => {
                    let _ = self.logger.finalize("完成", summary);
                }
                SearchEvent::Cancelled { summary, .. } => {
                    let _ = self.logger.finalize("已取消", summary);
                }
                SearchEvent::Failed { kind, message, .. } => {
                    let _ = self
                        .logger
                        .log_message(&format!("搜索失败 ({}): {}", kind, message));
                }
                SearchEvent::Log(_) => {}
            }
        }

        let _ = self.sender.send(event);
    }
}

/// 事件流（接收端）
#[derive(Debug, Clone)]
pub struct EventStream {
    receiver: Receiver<SearchEvent>,
}

impl EventStream {
    pub fn new(receiver: Receiver<SearchEvent>) -> Self {
        Self { receiver }
    }

    /// 供 `crossbeam_channel::select!` 使用
    pub fn receiver(&self) -> &Receiver<SearchEvent> {
        &self.receiver
    }

    /// 阻塞等待下一个事件，所有发送端关闭后返回 None
    pub fn recv(&self) -> Option<SearchEvent> {
        self.receiver.recv().ok()
    }

    /// 最多等待 `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SearchEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 取出当前已到达的全部事件，不阻塞
    pub fn drain(&self) -> Vec<SearchEvent> {
        self.receiver.try_iter().collect()
    }

    /// 接收事件直到终止事件，返回途中的日志和终止事件
    pub fn wait_terminal(&self, timeout: Duration) -> (Vec<LogEvent>, Option<SearchEvent>) {
        let mut logs = Vec::new();
        while let Some(event) = self.recv_timeout(timeout) {
            match event {
                SearchEvent::Log(log) => logs.push(log),
                terminal => return (logs, Some(terminal)),
            }
        }
        (logs, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WalkStats;
    use std::path::PathBuf;

    #[test]
    fn test_events_keep_order() {
        let (sink, stream) = LogSink::channel(7);
        for i in 0..50 {
            sink.emit(format!("line {}", i));
        }

        let events = stream.drain();
        assert_eq!(events.len(), 50);
        for (i, event) in events.iter().enumerate() {
            match event {
                SearchEvent::Log(log) => {
                    assert_eq!(log.run_id, 7);
                    assert_eq!(log.seq, i as u64);
                    assert_eq!(log.message, format!("line {}", i));
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_wait_terminal() {
        let (sink, stream) = LogSink::channel(1);
        sink.emit("a");
        sink.emit("b");
        sink.finish(SearchEvent::Completed {
            run_id: 1,
            summary: RunSummary {
                output_path: PathBuf::from("out.txt"),
                stats: WalkStats::default(),
                elapsed: Duration::ZERO,
            },
        });

        let (logs, terminal) = stream.wait_terminal(Duration::from_secs(1));
        assert_eq!(logs.len(), 2);
        let terminal = terminal.unwrap();
        assert!(terminal.is_terminal());
        assert_eq!(terminal.run_id(), 1);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, stream) = LogSink::channel(1);
        drop(stream);
        // 不会 panic
        sink.emit("nobody listens");
    }
}
