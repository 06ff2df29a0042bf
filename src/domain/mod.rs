pub mod error;
pub mod file_walker;
pub mod matcher;
pub mod search;

pub use error::{ErrorKind, SearchError, WalkAbort};
pub use file_walker::{walk, CancelToken, WalkOptions, WalkStats};
pub use matcher::{matches, normalize_filter};
pub use search::{RunSummary, SearchConfig};
