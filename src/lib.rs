pub mod config;
pub mod logging;
pub mod manager;
pub mod models;
pub mod notice;
pub mod session;
pub mod storage;
pub mod store;
pub mod view;

pub use config::Config;
pub use manager::{Screen, TaskManager};
pub use models::{ExportFile, Task, TaskId, Timestamp};
pub use session::{EditSession, EditState};
pub use storage::{Backend, FileBackend, MemoryBackend, Storage, StorageError, STORAGE_KEY};
pub use store::{TaskError, TaskStore, MAX_TEXT_LEN};
pub use view::{build_view, counters, filtered, Counters, Filter, ViewModel};
