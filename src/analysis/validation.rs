//! Structural rules for resolved references.
//!
//! Every rule is local to a node and the nodes it names, so a single pass in
//! declaration order is enough. The first violation is reported.

use crate::compute::error::ComputationError;
use crate::store::{KindTag, NodeId, Registry};

pub(crate) fn check_references(registry: &Registry) -> Result<(), ComputationError> {
    for id in registry.ids() {
        if let Some(err) = validate_endpoints(registry, id) {
            return Err(err);
        }
        if let Some(err) = validate_inputs(registry, id) {
            return Err(err);
        }
        if let Some(err) = validate_unit(registry, id) {
            return Err(err);
        }
    }
    Ok(())
}

/// Flows may only move quantity between stocks and boundaries.
fn validate_endpoints(registry: &Registry, id: NodeId) -> Option<ComputationError> {
    let (from, to) = registry.endpoints(id)?;
    [(from, "flow source"), (to, "flow target")]
        .into_iter()
        .find(|(end, _)| !matches!(registry.tag(*end), KindTag::Stock | KindTag::Boundary))
        .map(|(end, role)| invalid(registry, id, end, role, "a stock or boundary"))
}

/// Units and boundaries carry no per-step value, so nothing can read them.
fn validate_inputs(registry: &Registry, id: NodeId) -> Option<ComputationError> {
    registry
        .get_parents(id)
        .iter()
        .find(|&&p| matches!(registry.tag(p), KindTag::Unit | KindTag::Boundary))
        .map(|&p| invalid(registry, id, p, "input", "a parameter, stock, flow or converter"))
}

fn validate_unit(registry: &Registry, id: NodeId) -> Option<ComputationError> {
    let unit = registry.unit_of(id)?;
    if registry.tag(unit) == KindTag::Unit {
        None
    } else {
        Some(invalid(registry, id, unit, "unit", "a unit"))
    }
}

fn invalid(registry: &Registry, node: NodeId, reference: NodeId, role: &'static str, expected: &'static str) -> ComputationError {
    ComputationError::InvalidReference {
        node: registry.key(node).to_string(),
        reference: registry.key(reference).to_string(),
        role,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use crate::compute::error::ComputationError;
    use crate::compute::record::Args;
    use crate::store::{LogicFailure, Node, Registry};
    use rstest::rstest;

    fn zero(_: &Args<'_>) -> Result<f64, LogicFailure> { Ok(0.0) }

    fn base() -> Vec<Node> {
        vec![
            Node::unit("kg", "kilograms"),
            Node::stock("tank", "tank", 1.0).with_unit("kg"),
            Node::boundary("sea").with_unit("kg"),
            Node::parameter("rate", "rate", 2.0),
        ]
    }

    #[rstest]
    #[case::parameter_as_source(Node::flow("f", "f", "rate", "tank", vec![], zero), "rate", "flow source")]
    #[case::unit_as_target(Node::flow("f", "f", "tank", "kg", vec![], zero), "kg", "flow target")]
    #[case::boundary_as_input(Node::converter("c", "c", vec!["sea".into()], zero), "sea", "input")]
    #[case::unit_as_input(Node::converter("c", "c", vec![["kg"].into()], zero), "kg", "input")]
    #[case::stock_as_unit(Node::parameter("p", "p", 1.0).with_unit("tank"), "tank", "unit")]
    fn test_invalid_references(#[case] extra: Node, #[case] reference: &str, #[case] role: &str) {
        let mut nodes = base();
        nodes.push(extra);
        match Registry::from_nodes(nodes).unwrap_err() {
            ComputationError::InvalidReference { reference: r, role: got, .. } => {
                assert_eq!(r, reference);
                assert_eq!(got, role);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_model_passes() {
        let mut nodes = base();
        nodes.push(Node::flow("drain", "drain", "tank", "sea", vec!["rate".into(), ["tank"].into()], zero));
        nodes.push(Node::converter("c", "c", vec!["drain".into(), "currentTime".into()], zero));
        assert!(Registry::from_nodes(nodes).is_ok());
    }
}
