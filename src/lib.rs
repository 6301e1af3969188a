// Library facade: a discrete-time stock-and-flow simulation engine.
// A model is a flat list of nodes; `store` normalizes it, `analysis` orders
// it, `compute` steps it, and `display` hands the history to presentation.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod model;
pub mod store;

pub use compute::scenario::{run_scenarios, Scenario, ScenarioOutcome};
pub use compute::{Args, ComputationError, Engine, HistorySnapshot, Record, State};
pub use config::{ConfigError, EngineConfig};
pub use model::{Change, Model, ModelDocument, Simulation};
pub use store::{InputRef, Node, ParamValue, Registry};
