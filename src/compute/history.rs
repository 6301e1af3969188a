//! history.rs
//! Append-only per-node value logs, indexed by step.

use super::error::ComputationError;
use crate::store::{NodeId, Registry};

/// The values one node produced, one per step from `first_step` onwards.
///
/// Stocks start at step 0 (their seed); everything else starts at step 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    first_step: usize,
    values: Vec<f64>,
}

impl Series {
    pub fn first_step(&self) -> usize { self.first_step }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// The step the next append must target.
    pub fn next_step(&self) -> usize { self.first_step + self.values.len() }

    /// The last written step, if any.
    pub fn last_step(&self) -> Option<usize> { self.next_step().checked_sub(1).filter(|_| !self.is_empty()) }

    #[inline]
    pub fn get(&self, step: usize) -> Option<f64> {
        step.checked_sub(self.first_step).and_then(|i| self.values.get(i)).copied()
    }

    /// The written values in order, without their steps: index `i` is step
    /// `first_step() + i`. Use [`by_step`](Self::by_step) for a step-indexed view.
    pub fn written_values(&self) -> &[f64] { &self.values }

    /// One slot per step in `0..=last_step`, `None` where nothing was written.
    pub fn by_step(&self, last_step: usize) -> Vec<Option<f64>> {
        (0..=last_step).map(|step| self.get(step)).collect()
    }

    /// `(step, value)` pairs in step order, ready for plotting.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().enumerate().map(move |(i, &v)| (self.first_step + i, v))
    }

    fn push(&mut self, step: usize, value: f64) -> Result<(), usize> {
        if self.values.is_empty() {
            self.first_step = step;
        } else if step != self.next_step() {
            return Err(self.next_step());
        }
        self.values.push(value);
        Ok(())
    }
}

/// One [`Series`] per registry node, indexed by [`NodeId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    series: Vec<Series>,
}

impl History {
    pub fn new(node_count: usize) -> Self {
        Self { series: vec![Series::default(); node_count] }
    }

    pub fn node_count(&self) -> usize { self.series.len() }

    #[inline(always)]
    pub fn series(&self, id: NodeId) -> &Series { &self.series[id.index()] }

    #[inline(always)]
    pub fn get(&self, id: NodeId, step: usize) -> Option<f64> { self.series[id.index()].get(step) }

    /// A point read that treats a missing value as an ordering bug.
    pub fn value_at(&self, registry: &Registry, id: NodeId, step: usize) -> Result<f64, ComputationError> {
        self.get(id, step).ok_or_else(|| ComputationError::NotYetComputed {
            id: registry.key(id).to_string(),
            step,
        })
    }

    /// Writes `value` at `step`. Only the step right after the last written
    /// one is accepted (or any step for an empty series), so existing entries
    /// can never change.
    pub fn append(&mut self, registry: &Registry, id: NodeId, step: usize, value: f64) -> Result<(), ComputationError> {
        self.series[id.index()].push(step, value).map_err(|expected| ComputationError::NonSequentialWrite {
            id: registry.key(id).to_string(),
            step,
            expected,
        })
    }
}
