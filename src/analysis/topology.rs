use crate::compute::error::ComputationError;
use crate::store::{KindTag, NodeId, Registry};
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Returns an evaluation order using Kahn's Algorithm.
///
/// Units and boundaries are left out: they never hold per-step values.
/// Stocks, parameters and input-less flows/converters are ready from the start.
///
/// **Determinism:**
/// The ready queue is FIFO and seeded in declaration order. Children are visited in
/// declaration order, so nodes that become ready while processing the same parent
/// also enter the queue in declaration order. The result depends only on the node list.
pub fn build_order(registry: &Registry) -> Result<Vec<NodeId>, ComputationError> {
    let count = registry.count();
    let mut in_degree = vec![0usize; count];
    let mut queue = VecDeque::with_capacity(count);
    let mut order = Vec::with_capacity(count);
    let mut expected = 0;

    // 1. Initialize In-Degrees O(N)
    for id in registry.ids() {
        match registry.tag(id) {
            KindTag::Unit | KindTag::Boundary => continue,
            KindTag::Stock | KindTag::Parameter => queue.push_back(id),
            KindTag::Flow | KindTag::Converter => {
                let degree = registry.get_parents(id).len();
                in_degree[id.index()] = degree;
                if degree == 0 {
                    queue.push_back(id);
                }
            }
        }
        expected += 1;
    }

    // 2. Process Queue
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for child in registry.children(node) {
            let slot = &mut in_degree[child.index()];
            *slot -= 1;
            if *slot == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() != expected {
        return Err(cycle_error(registry, &order));
    }
    Ok(order)
}

fn cycle_error(registry: &Registry, placed: &[NodeId]) -> ComputationError {
    let mut is_placed = vec![false; registry.count()];
    for id in placed {
        is_placed[id.index()] = true;
    }

    let unresolved: Vec<NodeId> = registry
        .ids()
        .filter(|&id| !is_placed[id.index()])
        .filter(|&id| !matches!(registry.tag(id), KindTag::Unit | KindTag::Boundary))
        .collect();

    ComputationError::CyclicDependency {
        unresolved: unresolved.iter().map(|&id| registry.key(id).to_string()).collect(),
        cycles: find_cycles(registry, &unresolved)
            .into_iter()
            .map(|scc| scc.into_iter().map(|id| registry.key(id).to_string()).collect())
            .collect(),
    }
}

/// Separates the nodes that sit on a cycle from those merely blocked
/// downstream of one. Each group is sorted by declaration order, groups by their
/// first member.
fn find_cycles(registry: &Registry, unresolved: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut graph = DiGraph::<NodeId, ()>::with_capacity(unresolved.len(), unresolved.len());
    let mut local = HashMap::with_capacity(unresolved.len());
    for &id in unresolved {
        local.insert(id, graph.add_node(id));
    }

    let mut self_loops = Vec::new();
    for &id in unresolved {
        for parent in registry.get_parents(id) {
            if let (Some(&a), Some(&b)) = (local.get(parent), local.get(&id)) {
                if a == b {
                    self_loops.push(id);
                }
                graph.update_edge(a, b, ());
            }
        }
    }

    let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&graph)
        .into_iter()
        .map(|scc| scc.into_iter().map(|ix| graph[ix]).collect::<Vec<_>>())
        .filter(|scc| scc.len() > 1 || self_loops.contains(&scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc
        })
        .collect();
    cycles.sort();
    cycles
}

/// A hash of everything the evaluation order depends on: ids, kinds, input
/// references (with access mode), flow endpoints and unit tags.
/// Logic closures and parameter values are deliberately not part of it.
pub fn fingerprint(registry: &Registry) -> u64 {
    let mut hasher = DefaultHasher::new();
    registry.count().hash(&mut hasher);
    for id in registry.ids() {
        registry.key(id).hash(&mut hasher);
        registry.tag(id).hash(&mut hasher);
        for (parent, access) in registry.get_inputs(id) {
            registry.key(parent).hash(&mut hasher);
            access.hash(&mut hasher);
        }
        registry.endpoints(id).map(|(f, t)| (registry.key(f), registry.key(t))).hash(&mut hasher);
        registry.unit_of(id).map(|u| registry.key(u)).hash(&mut hasher);
    }
    hasher.finish()
}
