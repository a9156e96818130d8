/// Habit-state engine
///
/// Tracks recurring habits in two modes: goal-mode habits with an
/// adaptive target interval and streak counter, and freeform habits with
/// optional time-of-day metrics. State is owned in memory, persisted as
/// versioned JSON documents through a key-value backend with debounced
/// writes, migrated across schema generations on load, and exchanged via
/// an all-or-nothing versioned export/import payload.

use thiserror::Error;

pub mod app;
pub mod clock;
pub mod csv;
pub mod export;
pub mod persist;
pub mod storage;
pub mod stores;

mod domain;

pub use app::HabitApp;
pub use clock::{Clock, ManualClock, SystemClock};
pub use csv::CsvLog;
pub use domain::*;
pub use export::{export_all, import_all, ExportPayloadV2};
pub use storage::{KeyValueBackend, MemoryBackend, SqliteKv, StorageError};
pub use stores::{LogOptions, NegativeHabitStore, PositiveHabitStore};

/// Errors that can surface from application wiring
///
/// Store operations themselves never raise; they signal failure through
/// plain `bool`/`Option` returns. This type covers the outer layers
/// (backend setup, payload I/O in the binary).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
