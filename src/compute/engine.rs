//! A synchronous, single-threaded step engine.
//!
//! Each step is a pure function of the registry and the previous state:
//! 1. stocks carry their previous value forward,
//! 2. parameters, converters and flows are resolved in plan order,
//! 3. flow results are moved between their endpoint stocks,
//! 4. the finished frame is appended to history.
//!
//! Nothing is appended until the whole frame is computed, so a failing step
//! leaves the state exactly as it was.

use super::error::ComputationError;
use super::history::{History, Series};
use super::plan::{Compiler, Instruction, Plan};
use super::record::{Arg, Args, Record};
use crate::config::EngineConfig;
use crate::store::{Access, KindTag, NodeId, NodeKind, Registry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// The state of one run: the last completed step and everything computed so far.
///
/// A state is only meaningful together with the registry that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    current_step: usize,
    history: History,
}

impl State {
    pub fn current_step(&self) -> usize { self.current_step }

    pub fn history(&self) -> &History { &self.history }

    /// The series of the node with the given node id.
    pub fn series<'s>(&'s self, registry: &Registry, key: &str) -> Result<&'s Series, ComputationError> {
        Ok(self.history.series(registry.lookup(key)?))
    }

    pub fn value(&self, registry: &Registry, key: &str, step: usize) -> Result<Option<f64>, ComputationError> {
        Ok(self.history.get(registry.lookup(key)?, step))
    }

    /// Every value-carrying node's history keyed by node id. Index `i` of
    /// each vector is step `i`, for steps `0..=current_step`.
    pub fn history_map(&self, registry: &Registry) -> BTreeMap<String, Vec<Option<f64>>> {
        registry
            .ids()
            .filter(|&id| !matches!(registry.tag(id), KindTag::Unit | KindTag::Boundary))
            .map(|id| (registry.key(id).to_string(), self.history.series(id).by_step(self.current_step)))
            .collect()
    }

    pub fn snapshot(&self, registry: &Registry) -> HistorySnapshot {
        HistorySnapshot { current_step: self.current_step, history: self.history_map(registry) }
    }
}

/// The serialized hand-off form of a run.
///
/// ```json
/// { "current_step": 2, "history": { "room": [10.0, 15.0, 17.5], "heat": [null, 5.0, 2.5] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub current_step: usize,
    pub history: BTreeMap<String, Vec<Option<f64>>>,
}

/// Values produced for a single step, indexed by node.
type Frame = Vec<Option<f64>>;

pub struct Engine<'a> {
    registry: &'a Registry,
    plan: Arc<Plan>,
    reject_non_finite: bool,
}

impl<'a> Engine<'a> {
    /// Compiles a plan for `registry`. Cycles are reported here, before any step runs.
    pub fn new(registry: &'a Registry) -> Result<Self, ComputationError> {
        let plan = Compiler::new(registry).compile()?;
        Ok(Self { registry, plan: Arc::new(plan), reject_non_finite: false })
    }

    /// Reuses `plan` when it matches the registry's structure, compiles a new one otherwise.
    pub fn with_plan(registry: &'a Registry, plan: Arc<Plan>) -> Result<Self, ComputationError> {
        if plan.is_compatible(registry) {
            Ok(Self { registry, plan, reject_non_finite: false })
        } else {
            debug!("cached plan does not match registry structure, recompiling");
            Self::new(registry)
        }
    }

    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.reject_non_finite = config.reject_non_finite;
        self
    }

    pub fn plan(&self) -> &Arc<Plan> { &self.plan }

    pub fn registry(&self) -> &'a Registry { self.registry }

    /// Step 0: every stock seeded with its initial value, all other histories empty.
    pub fn initial_state(&self) -> Result<State, ComputationError> {
        let mut history = History::new(self.registry.count());
        for &stock in &self.plan.stocks {
            if let NodeKind::Stock { initial_value, .. } = &self.registry.node(stock).kind {
                history.append(self.registry, stock, 0, *initial_value)?;
            }
        }
        Ok(State { current_step: 0, history })
    }

    /// Produces the next state without touching `state`; `None` yields step 0.
    pub fn step(&self, state: Option<&State>) -> Result<State, ComputationError> {
        match state {
            None => self.initial_state(),
            Some(prev) => {
                let mut next = prev.clone();
                self.advance(&mut next)?;
                Ok(next)
            }
        }
    }

    /// Advances `state` by one step in place. On error `state` is unchanged.
    pub fn advance(&self, state: &mut State) -> Result<(), ComputationError> {
        let frame = self.compute_frame(state)?;
        let step = state.current_step + 1;

        for id in self.registry.ids() {
            if let Some(value) = frame[id.index()] {
                state.history.append(self.registry, id, step, value)?;
            }
        }
        state.current_step = step;
        debug!(step, "committed step");
        Ok(())
    }

    /// Runs `steps` steps from step 0.
    pub fn run(&self, steps: usize) -> Result<State, ComputationError> {
        info!(steps, nodes = self.registry.count(), "starting run");
        let mut state = self.initial_state()?;
        for _ in 0..steps {
            self.advance(&mut state)?;
        }
        info!(final_step = state.current_step, "run finished");
        Ok(state)
    }

    fn compute_frame(&self, state: &State) -> Result<Frame, ComputationError> {
        let prev = state.current_step;
        let step = prev + 1;
        let mut frame: Frame = vec![None; self.registry.count()];

        // 1. Carry stocks forward.
        for &stock in &self.plan.stocks {
            frame[stock.index()] = Some(state.history.value_at(self.registry, stock, prev)?);
        }

        // 2. Resolve in order.
        for instr in &self.plan.instructions {
            let node = self.registry.node(instr.node);
            let value = match &node.kind {
                NodeKind::Parameter { value, .. } => value.at(step),
                NodeKind::Converter { logic, .. } | NodeKind::Flow { logic, .. } => {
                    let args = self.resolve_args(instr, &frame, state, step)?;
                    logic.call(&args).map_err(|e| ComputationError::logic(&node.id, step, e.0))?
                }
                other => {
                    return Err(ComputationError::InvalidReference {
                        node: node.id.clone(),
                        reference: format!("{} node", other.tag()),
                        role: "an evaluated node",
                        expected: "a parameter, converter or flow",
                    })
                }
            };
            self.check_numeric(&node.id, step, value)?;
            trace!(step, node = %node.id, value, "resolved");
            frame[instr.node.index()] = Some(value);
        }

        // 3. Apply flows to stocks. Boundaries are infinite sources/sinks.
        for transfer in &self.plan.transfers {
            let rate = self.frame_value(&frame, transfer.flow, step)?;
            if let Some(from) = transfer.from {
                frame[from.index()] = Some(self.frame_value(&frame, from, step)? - rate);
            }
            if let Some(to) = transfer.to {
                frame[to.index()] = Some(self.frame_value(&frame, to, step)? + rate);
            }
        }

        Ok(frame)
    }

    fn resolve_args<'s>(
        &self,
        instr: &Instruction,
        frame: &Frame,
        state: &'s State,
        step: usize,
    ) -> Result<Args<'s>, ComputationError> {
        instr
            .operands
            .iter()
            .map(|operand| match operand.access {
                Access::Point => self.frame_value(frame, operand.source, step).map(Arg::Value),
                // Records look at the past only: bound to the last completed step.
                Access::Record => Ok(Arg::Record(Record::new(state.history.series(operand.source), step - 1))),
            })
            .collect()
    }

    #[inline]
    fn frame_value(&self, frame: &Frame, id: NodeId, step: usize) -> Result<f64, ComputationError> {
        frame[id.index()].ok_or_else(|| ComputationError::NotYetComputed {
            id: self.registry.key(id).to_string(),
            step,
        })
    }

    fn check_numeric(&self, id: &str, step: usize, value: f64) -> Result<(), ComputationError> {
        if value.is_nan() {
            return Err(ComputationError::logic(id, step, "returned a non-numeric value (NaN)"));
        }
        if self.reject_non_finite && value.is_infinite() {
            return Err(ComputationError::logic(id, step, format!("returned a non-finite value ({})", value)));
        }
        Ok(())
    }
}
