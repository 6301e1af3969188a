//! Executes a registry one step at a time.
pub mod engine;
pub mod error;
pub mod history;
pub mod plan;
pub mod record;
pub mod scenario;

pub use engine::{Engine, HistorySnapshot, State};
pub use error::ComputationError;
pub use history::{History, Series};
pub use record::{Arg, Args, Record};
