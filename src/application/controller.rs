use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, Sender};

use crate::application::Config;
use crate::domain::{
    walk, CancelToken, RunSummary, SearchConfig, SearchError, WalkAbort, WalkOptions, WalkStats,
};
use crate::infrastructure::{
    EventStream, FileResultSink, LogSink, LoggerTrait, ResultSink, SearchEvent,
};

/// 控制器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "空闲",
            RunState::Validating => "校验中",
            RunState::Running => "运行中",
            RunState::Completed => "已完成",
            RunState::Failed => "失败",
            RunState::Cancelled => "已取消",
        }
    }
}

/// `start` 返回给界面的句柄，用于取消和区分事件所属的搜索
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    run_id: u64,
    output_path: PathBuf,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

type SharedState = Arc<Mutex<RunState>>;

fn load_state(state: &SharedState) -> RunState {
    match state.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn store_state(state: &SharedState, value: RunState) {
    match state.lock() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

/// 一次搜索的全部可变状态，移交给后台线程后前台不再访问
///
/// 终止事件先于终止状态发布：看到终止状态时，本次搜索的事件已全部进入通道。
struct SearchRun {
    id: u64,
    config: SearchConfig,
    output_path: PathBuf,
    sink: FileResultSink,
    cancel: CancelToken,
    options: WalkOptions,
}

impl SearchRun {
    fn execute(mut self, log: LogSink, state: SharedState) {
        let started = Instant::now();

        log.emit(format!("扫描开始: {}", self.config.root_path.display()));
        log.emit(format!("过滤器: *.{}", self.config.extension_filter));
        log.emit(format!("结果文件: {}", self.output_path.display()));

        let result = walk(
            &self.config.root_path,
            &self.config.extension_filter,
            &mut self.sink,
            &log,
            &self.cancel,
            &self.options,
        );

        match result {
            Ok(stats) => match self.sink.close() {
                Ok(()) => {
                    log.emit("--- 搜索完成 ---");
                    log.emit(format!("找到 {} 个文件", stats.matched));
                    let summary = self.summary(stats, started);
                    log.finish(SearchEvent::Completed {
                        run_id: self.id,
                        summary,
                    });
                    store_state(&state, RunState::Completed);
                }
                Err(err) => {
                    let error = SearchError::io(&self.output_path, err);
                    self.fail(&log, &state, error);
                }
            },
            Err(WalkAbort { stats, error }) => {
                // 尽量把已写入的结果落盘
                if let Err(err) = self.sink.close() {
                    log.emit(format!("关闭结果文件失败: {}", err));
                }

                match error {
                    SearchError::Cancelled => {
                        log.emit("--- 搜索已取消 ---");
                        log.emit(format!("取消前已写入 {} 个文件", stats.matched));
                        let summary = self.summary(stats, started);
                        log.finish(SearchEvent::Cancelled {
                            run_id: self.id,
                            summary,
                        });
                        store_state(&state, RunState::Cancelled);
                    }
                    error => self.fail(&log, &state, error),
                }
            }
        }
    }

    fn summary(&self, stats: WalkStats, started: Instant) -> RunSummary {
        RunSummary {
            output_path: self.output_path.clone(),
            stats,
            elapsed: started.elapsed(),
        }
    }

    fn fail(&self, log: &LogSink, state: &SharedState, error: SearchError) {
        log.emit(format!("错误: {}", error));
        log.finish(SearchEvent::Failed {
            run_id: self.id,
            kind: error.kind(),
            message: error.to_string(),
        });
        store_state(state, RunState::Failed);
    }
}

struct ActiveRun {
    id: u64,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

/// 搜索控制器
///
/// 同一时间最多一个搜索。`start` 只负责校验和创建结果文件，遍历和写入都在
/// 后台线程进行。日志和终止事件通过 [`EventStream`] 按顺序送达。收到终止
/// 事件后先调用 `wait`，再启动下一次搜索。
pub struct SearchController {
    options: WalkOptions,
    skip_output_file: bool,
    logger: Arc<dyn LoggerTrait>,
    sender: Sender<SearchEvent>,
    events: EventStream,
    state: SharedState,
    active: Option<ActiveRun>,
    next_run_id: u64,
}

impl SearchController {
    /// 根据应用配置创建控制器
    pub fn new(config: &Config, logger: Arc<dyn LoggerTrait>) -> Self {
        let mut controller =
            Self::with_options(config.walk_options(), config.events.buffer_size, logger);
        controller.skip_output_file = config.walk.skip_output_file;
        controller
    }

    /// `buffer_size` 是事件通道容量；界面未及时接收时后台线程会等待
    pub fn with_options(
        options: WalkOptions,
        buffer_size: usize,
        logger: Arc<dyn LoggerTrait>,
    ) -> Self {
        let (sender, receiver) = bounded(buffer_size.max(1));
        Self {
            options,
            skip_output_file: true,
            logger,
            sender,
            events: EventStream::new(receiver),
            state: Arc::new(Mutex::new(RunState::Idle)),
            active: None,
            next_run_id: 0,
        }
    }

    /// 事件流，可以克隆多份，但每个事件只会被其中一个接收
    pub fn events(&self) -> EventStream {
        self.events.clone()
    }

    pub fn state(&self) -> RunState {
        load_state(&self.state)
    }

    /// 启动一次搜索
    ///
    /// 参数无效返回 `Validation`，无法创建结果文件返回 `Io`（状态变为 `Failed`），
    /// 已有搜索运行中返回 `Busy`。
    pub fn start(&mut self, config: SearchConfig) -> Result<RunHandle, SearchError> {
        match self.state() {
            RunState::Running | RunState::Validating => return Err(SearchError::Busy),
            state if state.is_terminal() => {
                self.acknowledge();
            }
            _ => {}
        }

        store_state(&self.state, RunState::Validating);
        if let Err(err) = config.validate() {
            store_state(&self.state, RunState::Idle);
            self.debug(&format!("参数校验失败: {}", err));
            return Err(err);
        }

        let output_path = config.output_path();
        let sink = match FileResultSink::create(&output_path) {
            Ok(sink) => sink,
            Err(err) => {
                let error = SearchError::io(&output_path, err);
                store_state(&self.state, RunState::Failed);
                self.debug(&format!("无法创建结果文件: {}", error));
                return Err(error);
            }
        };

        self.next_run_id += 1;
        let run_id = self.next_run_id;
        let cancel = CancelToken::new();

        let mut options = self.options.clone();
        if self.skip_output_file {
            options.skip_path = Some(output_path.clone());
        }

        let run = SearchRun {
            id: run_id,
            config,
            output_path: output_path.clone(),
            sink,
            cancel: cancel.clone(),
            options,
        };
        let log = LogSink::new(run_id, self.sender.clone(), Arc::clone(&self.logger));
        let state = Arc::clone(&self.state);

        store_state(&self.state, RunState::Running);
        let worker = thread::Builder::new()
            .name(format!("search-{}", run_id))
            .spawn(move || run.execute(log, state));

        let worker = match worker {
            Ok(worker) => worker,
            Err(err) => {
                store_state(&self.state, RunState::Failed);
                return Err(SearchError::io(&output_path, err));
            }
        };

        self.debug(&format!(
            "搜索 #{} 已启动，结果文件: {}",
            run_id,
            output_path.display()
        ));
        self.active = Some(ActiveRun {
            id: run_id,
            cancel,
            worker: Some(worker),
        });

        Ok(RunHandle {
            run_id,
            output_path,
        })
    }

    /// 请求取消。只对运行中的同一次搜索有效，重复调用无副作用
    pub fn cancel(&self, handle: &RunHandle) -> bool {
        if self.state() != RunState::Running {
            return false;
        }

        match &self.active {
            Some(active) if active.id == handle.run_id => {
                if !active.cancel.is_cancelled() {
                    active.cancel.cancel();
                    self.debug(&format!("搜索 #{} 收到取消请求", active.id));
                }
                true
            }
            _ => false,
        }
    }

    /// 等待后台线程结束并返回最终状态
    ///
    /// 调用方需要同时消费事件流，否则通道满时后台线程会一直等待。
    pub fn wait(&mut self) -> RunState {
        self.join_worker();
        self.state()
    }

    /// 确认终止状态并回到 `Idle`，返回被确认的状态；运行中时不做任何事
    pub fn acknowledge(&mut self) -> RunState {
        let state = self.state();
        if state.is_terminal() {
            // 终止事件在状态写入前已进入通道，这里的等待不会阻塞
            self.join_worker();
            self.active = None;
            store_state(&self.state, RunState::Idle);
            self.debug(&format!("确认终止状态: {}", state.as_str()));
        }
        state
    }

    fn join_worker(&mut self) {
        let (id, worker) = match self.active.as_mut() {
            Some(active) => (active.id, active.worker.take()),
            None => return,
        };
        if let Some(worker) = worker {
            if worker.join().is_err() {
                store_state(&self.state, RunState::Failed);
                self.debug(&format!("搜索 #{} 的后台线程异常退出", id));
            }
        }
    }

    fn debug(&self, message: &str) {
        if self.logger.is_enabled() {
            let _ = self.logger.log_message(message);
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}
