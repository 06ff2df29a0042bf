pub mod log_sink;
pub mod logging;
pub mod result_sink;

pub use log_sink::{EventStream, LogEvent, LogSink, SearchEvent};
pub use logging::{Logger, LoggerTrait};
pub use result_sink::{FileResultSink, MemoryResultSink, ResultSink};
