//! Node model and the normalized registry built from it.
pub mod registry;
pub mod types;

pub use registry::{Access, Registry};
pub use types::{InputRef, KindTag, Logic, LogicFailure, Node, NodeId, NodeKind, ParamValue, CURRENT_TIME_ID};
