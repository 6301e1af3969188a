//! registry.rs
//! Normalized model: dense node ids, resolved references and a columnar
//! dependency layout (CSR parents + linked-list children).

use super::types::*;
use crate::analysis::validation;
use crate::compute::error::ComputationError;
use std::collections::HashMap;

/// How a dependent reads one of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// The input's value at the step being computed.
    Point,
    /// A [`Record`](crate::compute::record::Record) over the input's past.
    Record,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,

    // Topology (CSR-ish + Adjacency). One parent entry per declared input.
    pub(crate) parents_flat: Vec<NodeId>,
    pub(crate) access_flat: Vec<Access>,
    pub(crate) parents_ranges: Vec<(u32, u32)>, // (start, count)

    // Downstream traversal helpers
    pub(crate) first_child: Vec<u32>,
    pub(crate) child_targets: Vec<NodeId>,
    pub(crate) next_child: Vec<u32>,

    /// Resolved `(from, to)` for flows.
    endpoints: Vec<Option<(NodeId, NodeId)>>,
    /// Resolved unit reference for parameters, stocks and boundaries.
    units: Vec<Option<NodeId>>,
}

impl Registry {
    /// Normalizes a node list: prepends the implicit time parameter, assigns
    /// ids in declaration order, resolves every reference and checks reference kinds.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, ComputationError> {
        let mut reg = Self::default();

        for node in std::iter::once(Node::current_time()).chain(nodes) {
            let id = NodeId::new(reg.nodes.len());
            if reg.index.insert(node.id.clone(), id).is_some() {
                return Err(ComputationError::DuplicateId { id: node.id });
            }
            reg.nodes.push(node);
        }

        reg.resolve_references()?;
        validation::check_references(&reg)?;
        reg.link_children();
        Ok(reg)
    }

    fn resolve_references(&mut self) -> Result<(), ComputationError> {
        let count = self.nodes.len();
        self.parents_ranges.reserve(count);
        self.endpoints.reserve(count);
        self.units.reserve(count);

        for node in &self.nodes {
            // 1. Register Parents
            let start = self.parents_flat.len() as u32;
            for input in node.kind.inputs() {
                let parent = self.resolve(input.id(), &node.id)?;
                self.parents_flat.push(parent);
                self.access_flat.push(if input.is_windowed() { Access::Record } else { Access::Point });
            }
            let end = self.parents_flat.len() as u32;
            self.parents_ranges.push((start, end - start));

            // 2. Flow endpoints and unit tags
            let endpoints = match &node.kind {
                NodeKind::Flow { from, to, .. } => {
                    Some((self.resolve(from, &node.id)?, self.resolve(to, &node.id)?))
                }
                _ => None,
            };
            self.endpoints.push(endpoints);

            let unit = match node.kind.unit() {
                Some(u) => Some(self.resolve(u, &node.id)?),
                None => None,
            };
            self.units.push(unit);
        }
        Ok(())
    }

    fn resolve(&self, id: &str, referenced_by: &str) -> Result<NodeId, ComputationError> {
        self.index.get(id).copied().ok_or_else(|| ComputationError::not_found(id, referenced_by))
    }

    /// Builds the children lists once every parent id is known.
    fn link_children(&mut self) {
        self.first_child = vec![u32::MAX; self.nodes.len()];
        self.child_targets.clear();
        self.next_child.clear();

        // Walk dependents in reverse so each list reads in declaration order.
        for child_idx in (0..self.nodes.len()).rev() {
            let child = NodeId::new(child_idx);
            let (start, count) = self.parents_ranges[child_idx];
            for &parent in self.parents_flat[start as usize..(start + count) as usize].iter().rev() {
                let p_idx = parent.index();
                let head = self.first_child[p_idx];
                let new_edge = self.child_targets.len() as u32;
                self.child_targets.push(child);
                self.next_child.push(head);
                self.first_child[p_idx] = new_edge;
            }
        }
    }

    pub fn count(&self) -> usize { self.nodes.len() }

    pub fn nodes(&self) -> &[Node] { &self.nodes }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ { (0..self.nodes.len()).map(NodeId::new) }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.index()] }

    #[inline]
    pub fn tag(&self, id: NodeId) -> KindTag { self.nodes[id.index()].kind.tag() }

    #[inline]
    pub fn key(&self, id: NodeId) -> &str { &self.nodes[id.index()].id }

    pub fn get_id(&self, key: &str) -> Option<NodeId> { self.index.get(key).copied() }

    /// Like [`get_id`](Self::get_id), but a missing id is an error.
    pub fn lookup(&self, key: &str) -> Result<NodeId, ComputationError> { self.resolve(key, "lookup") }

    #[inline(always)]
    pub fn get_parents(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    /// Inputs of a node in declaration order, with their access mode.
    pub fn get_inputs(&self, id: NodeId) -> impl Iterator<Item = (NodeId, Access)> + '_ {
        let (start, count) = self.parents_ranges[id.index()];
        let range = start as usize..(start + count) as usize;
        self.parents_flat[range.clone()].iter().copied().zip(self.access_flat[range].iter().copied())
    }

    /// Dependents of a node, one entry per input edge, in declaration order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children { registry: self, edge: self.first_child[id.index()] }
    }

    pub fn endpoints(&self, id: NodeId) -> Option<(NodeId, NodeId)> { self.endpoints[id.index()] }

    pub fn unit_of(&self, id: NodeId) -> Option<NodeId> { self.units[id.index()] }

    /// Replaces a parameter's value. The structure (and therefore any
    /// compiled plan) is unchanged.
    pub fn set_parameter(&mut self, key: &str, new_value: ParamValue) -> Result<(), ComputationError> {
        let id = self.lookup(key)?;
        match &mut self.nodes[id.index()].kind {
            NodeKind::Parameter { value, .. } => {
                *value = new_value;
                Ok(())
            }
            _ => Err(ComputationError::InvalidReference {
                node: key.to_string(),
                reference: key.to_string(),
                role: "override target",
                expected: "a parameter",
            }),
        }
    }
}

/// Iterator over the children linked list.
pub struct Children<'a> {
    registry: &'a Registry,
    edge: u32,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.edge == u32::MAX {
            return None;
        }
        let idx = self.edge as usize;
        self.edge = self.registry.next_child[idx];
        Some(self.registry.child_targets[idx])
    }
}
