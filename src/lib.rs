pub mod cli;
pub mod config;
pub mod context;
pub mod controller;
pub mod decision;
pub mod error;
pub mod export;
pub mod id;
pub mod record;
pub mod replicate;
pub mod session;
pub mod shell;
pub mod snapshot;
pub mod table;
pub mod topic;

// Re-export commonly used types
pub use config::ReviewConfig;
pub use context::ReviewContext;
pub use controller::{ActionOutcome, CycleReport, ReplicationStatus, SessionController};
pub use decision::{HistoryEntry, Outcome};
pub use error::{Result, ReviewError};
pub use export::{ExportDocument, ExportFormat};
pub use id::RecordId;
pub use record::{LoadReport, Mark, Record, RecordStore, ReviewStatus};
pub use replicate::{MemoryStore, RemoteReplicator, RemoteStore, ReplicationReport};
pub use session::{Cursor, ReviewSession};
pub use table::Table;
pub use topic::{KnownTopics, Topic, TopicNotice};
