pub mod engine;
pub mod history;
pub mod state;

pub use engine::{AssistantEngine, EngineHandle, EngineParts};
pub use history::{HistoryEntry, SessionHistory};
pub use state::{EngineCommand, EngineStatus, Notice};
