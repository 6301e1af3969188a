//! collection.rs
//! The mutable node collection an editor works against. Edits happen here;
//! every `simulate` freezes a snapshot into a `Registry` and runs it.

use crate::compute::plan::Plan;
use crate::compute::{ComputationError, Engine, HistorySnapshot, State};
use crate::config::EngineConfig;
use crate::store::{KindTag, Node, NodeKind, Registry, CURRENT_TIME_ID};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An edit to the collection. [`Model::upsert`] returns `Inserted` or
/// `Edited`; subscribers also see `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Edited,
    Deleted,
}

type Listener = dyn Fn(Change, &Node) + Send + Sync;

/// Handle returned by [`Model::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fans collection edits out to subscribers, in subscription order.
#[derive(Default)]
struct Notifier {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Arc<Listener>)>,
}

impl Notifier {
    fn subscribe(&mut self, listener: Arc<Listener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn emit(&self, change: Change, node: &Node) {
        for (_, listener) in &self.listeners {
            listener(change, node);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("listeners", &self.listeners.len()).finish()
    }
}

/// A finished run together with the snapshot it was computed from.
#[derive(Debug)]
pub struct Simulation {
    pub registry: Registry,
    pub state: State,
}

impl Simulation {
    pub fn value(&self, key: &str, step: usize) -> Result<Option<f64>, ComputationError> {
        self.state.value(&self.registry, key, step)
    }

    /// Values in write order; see [`Series::written_values`](crate::compute::Series::written_values).
    pub fn written_values(&self, key: &str) -> Result<&[f64], ComputationError> {
        Ok(self.state.series(&self.registry, key)?.written_values())
    }

    pub fn history_map(&self) -> BTreeMap<String, Vec<Option<f64>>> { self.state.history_map(&self.registry) }

    pub fn snapshot(&self) -> HistorySnapshot { self.state.snapshot(&self.registry) }
}

#[derive(Debug, Default)]
pub struct Model {
    nodes: Vec<Node>,
    config: EngineConfig,
    plan: Option<Arc<Plan>>,
    notifier: Notifier,
}

impl Model {
    pub fn new() -> Self { Self::default() }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self { nodes: nodes.into_iter().collect(), ..Self::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Nodes in insertion order. The implicit time node is not part of the collection.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ { self.nodes.iter() }

    pub fn lookup(&self, id: &str) -> Option<&Node> { self.nodes.iter().find(|n| n.id == id) }

    /// Calls `listener` after every successful insert, edit or delete.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(Change, &Node) + Send + Sync + 'static,
    {
        self.notifier.subscribe(Arc::new(listener))
    }

    /// Returns `false` if `id` was already unsubscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool { self.notifier.unsubscribe(id) }

    /// Inserts `node`, or replaces the node with the same id in place.
    ///
    /// A flow must point at existing stocks or boundaries; this is what makes
    /// a converter-to-flow conversion fail early instead of at `simulate`.
    pub fn upsert(&mut self, node: Node) -> Result<Change, ComputationError> {
        if node.id == CURRENT_TIME_ID {
            return Err(ComputationError::DuplicateId { id: node.id });
        }
        if let NodeKind::Flow { from, to, .. } = &node.kind {
            self.check_endpoint(&node.id, from, "flow source")?;
            self.check_endpoint(&node.id, to, "flow target")?;
        }

        let (change, pos) = match self.nodes.iter().position(|n| n.id == node.id) {
            Some(pos) => {
                self.nodes[pos] = node;
                (Change::Edited, pos)
            }
            None => {
                self.nodes.push(node);
                (Change::Inserted, self.nodes.len() - 1)
            }
        };
        let node = &self.nodes[pos];
        debug!(id = %node.id, kind = %node.tag(), ?change, "upserted node");
        self.notifier.emit(change, node);
        Ok(change)
    }

    /// Removes and returns the node. References to it are left dangling and
    /// surface as `NodeNotFound` on the next `simulate`.
    pub fn delete(&mut self, id: &str) -> Result<Node, ComputationError> {
        let pos = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| ComputationError::not_found(id, "delete"))?;
        let node = self.nodes.remove(pos);
        debug!(id = %node.id, "deleted node");
        self.notifier.emit(Change::Deleted, &node);
        Ok(node)
    }

    /// Runs `steps` advances from a fresh step 0 over the current nodes.
    ///
    /// The evaluation plan is reused while the dependency structure is
    /// unchanged; edits to parameter values or logic do not invalidate it.
    pub fn simulate(&mut self, steps: usize) -> Result<Simulation, ComputationError> {
        let registry = Registry::from_nodes(self.nodes.iter().cloned())?;
        let state = {
            let engine = match &self.plan {
                Some(plan) => Engine::with_plan(&registry, Arc::clone(plan))?,
                None => Engine::new(&registry)?,
            };
            let engine = engine.with_config(&self.config);
            if self.plan.as_ref().is_some_and(|p| Arc::ptr_eq(p, engine.plan())) {
                debug!("reusing cached evaluation plan");
            }
            self.plan = Some(Arc::clone(engine.plan()));
            engine.run(steps)?
        };
        Ok(Simulation { registry, state })
    }

    pub fn cached_plan(&self) -> Option<&Arc<Plan>> { self.plan.as_ref() }

    fn check_endpoint(&self, flow: &str, endpoint: &str, role: &'static str) -> Result<(), ComputationError> {
        let target = self.lookup(endpoint).ok_or_else(|| ComputationError::not_found(endpoint, flow))?;
        match target.tag() {
            KindTag::Stock | KindTag::Boundary => Ok(()),
            _ => Err(ComputationError::InvalidReference {
                node: flow.to_string(),
                reference: endpoint.to_string(),
                role,
                expected: "a stock or boundary",
            }),
        }
    }
}
