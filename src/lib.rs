// 分层架构模块
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

// 重新导出主要类型
pub use domain::{
    CancelToken, ErrorKind, RunSummary, SearchConfig, SearchError, WalkOptions, WalkStats,
};
pub use application::{Config, RunHandle, RunState, SearchController};
pub use infrastructure::{
    EventStream, LogEvent, LogSink, Logger, LoggerTrait, ResultSink, SearchEvent,
};
pub use presentation::{print_summary, LogConsole};
