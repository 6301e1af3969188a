//! Static analysis over a registry: evaluation order and structural checks.
pub mod topology;
pub mod validation;
