pub mod display;

pub use display::{format_duration, print_failure, print_summary, LogConsole};
