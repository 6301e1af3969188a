//! Errors raised while building or running a model.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Duplicate node id '{id}'")]
    DuplicateId { id: String },

    /// `unresolved` lists every node the order could not place, in declaration order.
    /// `cycles` lists the strongly-connected groups responsible for it.
    #[error("Cyclic dependency: unresolved nodes {unresolved:?}")]
    CyclicDependency { unresolved: Vec<String>, cycles: Vec<Vec<String>> },

    #[error("Node '{id}' not found (referenced by '{referenced_by}')")]
    NodeNotFound { id: String, referenced_by: String },

    /// An evaluation order bug: a value was read before it was produced.
    #[error("Node '{id}' has no value at step {step}")]
    NotYetComputed { id: String, step: usize },

    #[error("Logic of node '{id}' failed at step {step}: {message}")]
    Logic { id: String, step: usize, message: String },

    #[error("Node '{node}' uses '{reference}' as {role}, but {role} must be {expected}")]
    InvalidReference { node: String, reference: String, role: &'static str, expected: &'static str },

    #[error("Non-sequential write to '{id}': step {step}, expected step {expected}")]
    NonSequentialWrite { id: String, step: usize, expected: usize },
}

impl ComputationError {
    pub(crate) fn not_found(id: &str, referenced_by: &str) -> Self {
        Self::NodeNotFound { id: id.to_string(), referenced_by: referenced_by.to_string() }
    }

    pub(crate) fn logic(id: &str, step: usize, message: impl Into<String>) -> Self {
        Self::Logic { id: id.to_string(), step, message: message.into() }
    }
}
