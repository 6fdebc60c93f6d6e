//! # engine
//!
//! Decision logic and the position state machine. `entry` and `exit` are pure
//! evaluations over the threshold store; `lifecycle` owns all mutation.

pub mod entry;
pub mod exit;
pub mod lifecycle;

pub use entry::{evaluate_entry, should_promote, EntryDecision};
pub use exit::{evaluate_exit, ExitKind, ExitSignal};
pub use lifecycle::PositionBook;
