//! Authoring surfaces: the editable node collection and the JSON model format.
pub mod collection;
pub mod document;

pub use collection::{Change, Model, Simulation, SubscriptionId};
pub use document::{DocumentError, LogicLibrary, ModelDocument, NodeRecord, ParamSource};
