//! Domain models shared across the entire Breakwatch pipeline.

pub mod event;
pub mod position;

pub use event::{AlertEvent, EventType};
pub use position::{LearningRecord, Position, PositionStatus, Side, Tick};
