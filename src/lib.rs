pub mod command;
pub mod error;
pub mod fs_ops;
pub mod logging;
pub mod paths;
pub mod session;
pub mod watcher;


pub use command::CommandOutput;
pub use error::{EngineError, Result};
pub use fs_ops::{BatchReport, EntryOutcome, FileInfo};
pub use paths::FileParts;
pub use session::Session;
pub use watcher::{ChangeEvent, ChangeKind, Pane};
