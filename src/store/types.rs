//! types.rs
//! Node records, input references and the logic/parameter callables they carry.

use crate::compute::record::Args;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Id of the parameter node every registry carries implicitly.
/// Its value at step `t` is `t`.
pub const CURRENT_TIME_ID: &str = "currentTime";

/// Dense index of a node inside a [`Registry`](super::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// The discriminant of a [`NodeKind`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Unit,
    Parameter,
    Boundary,
    Stock,
    Flow,
    Converter,
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KindTag::Unit => "unit",
            KindTag::Parameter => "parameter",
            KindTag::Boundary => "boundary",
            KindTag::Stock => "stock",
            KindTag::Flow => "flow",
            KindTag::Converter => "converter",
        };
        f.write_str(s)
    }
}

/// How a logic function wants to see one of its inputs.
///
/// `Immediate` yields the input's value for the step being computed.
/// `Windowed` yields a [`Record`](crate::compute::record::Record) over the
/// input's history up to the previous step.
///
/// The serialized form is the authoring encoding: a bare id string for
/// `Immediate`, a one-element array holding the id for `Windowed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawInputRef", into = "RawInputRef")]
pub enum InputRef {
    Immediate(String),
    Windowed(String),
}

impl InputRef {
    pub fn id(&self) -> &str {
        match self {
            InputRef::Immediate(id) | InputRef::Windowed(id) => id,
        }
    }

    pub fn is_windowed(&self) -> bool { matches!(self, InputRef::Windowed(_)) }
}

impl From<&str> for InputRef {
    fn from(id: &str) -> Self { InputRef::Immediate(id.to_string()) }
}

impl From<[&str; 1]> for InputRef {
    fn from(id: [&str; 1]) -> Self { InputRef::Windowed(id[0].to_string()) }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawInputRef {
    Immediate(String),
    Windowed([String; 1]),
}

impl From<RawInputRef> for InputRef {
    fn from(raw: RawInputRef) -> Self {
        match raw {
            RawInputRef::Immediate(id) => InputRef::Immediate(id),
            RawInputRef::Windowed([id]) => InputRef::Windowed(id),
        }
    }
}

impl From<InputRef> for RawInputRef {
    fn from(input: InputRef) -> Self {
        match input {
            InputRef::Immediate(id) => RawInputRef::Immediate(id),
            InputRef::Windowed(id) => RawInputRef::Windowed([id]),
        }
    }
}

/// Failure reported by a user logic function.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct LogicFailure(pub String);

impl LogicFailure {
    pub fn new(msg: impl Into<String>) -> Self { Self(msg.into()) }
}

impl From<String> for LogicFailure {
    fn from(msg: String) -> Self { Self(msg) }
}

impl From<&str> for LogicFailure {
    fn from(msg: &str) -> Self { Self(msg.to_string()) }
}

type LogicFn = dyn Fn(&Args<'_>) -> Result<f64, LogicFailure> + Send + Sync;
type ScheduleFn = dyn Fn(usize) -> f64 + Send + Sync;

/// A pure function from resolved inputs (in declaration order) to a value.
#[derive(Clone)]
pub struct Logic(Arc<LogicFn>);

impl Logic {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<f64, LogicFailure> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn call(&self, args: &Args<'_>) -> Result<f64, LogicFailure> { (self.0)(args) }
}

impl fmt::Debug for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Logic(..)") }
}

/// The value of a parameter: a constant, or a pure function of the step index.
#[derive(Clone)]
pub enum ParamValue {
    Constant(f64),
    ByStep(Arc<ScheduleFn>),
}

impl ParamValue {
    pub fn by_step<F>(f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        ParamValue::ByStep(Arc::new(f))
    }

    #[inline]
    pub fn at(&self, step: usize) -> f64 {
        match self {
            ParamValue::Constant(v) => *v,
            ParamValue::ByStep(f) => f(step),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self { ParamValue::Constant(v) }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Constant(v) => write!(f, "Constant({})", v),
            ParamValue::ByStep(_) => f.write_str("ByStep(..)"),
        }
    }
}

/// Kind-specific payload of a [`Node`].
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Documentation-only measurement tag.
    Unit,
    /// An exogenous per-step value.
    Parameter { value: ParamValue, unit: Option<String> },
    /// An infinite source/sink outside the system. Never updated.
    Boundary { unit: Option<String> },
    /// An accumulator changed only by the flows attached to it.
    Stock { initial_value: f64, unit: Option<String> },
    /// A per-step rate moving quantity from `from` to `to`.
    Flow { from: String, to: String, inputs: Vec<InputRef>, logic: Logic },
    /// A per-step computation with no stock side effect.
    Converter { inputs: Vec<InputRef>, logic: Logic },
}

impl NodeKind {
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::Unit => KindTag::Unit,
            NodeKind::Parameter { .. } => KindTag::Parameter,
            NodeKind::Boundary { .. } => KindTag::Boundary,
            NodeKind::Stock { .. } => KindTag::Stock,
            NodeKind::Flow { .. } => KindTag::Flow,
            NodeKind::Converter { .. } => KindTag::Converter,
        }
    }

    pub fn inputs(&self) -> &[InputRef] {
        match self {
            NodeKind::Flow { inputs, .. } | NodeKind::Converter { inputs, .. } => inputs,
            _ => &[],
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            NodeKind::Parameter { unit, .. }
            | NodeKind::Boundary { unit }
            | NodeKind::Stock { unit, .. } => unit.as_deref(),
            _ => None,
        }
    }
}

/// A single record of a stock-and-flow model.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn unit(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), kind: NodeKind::Unit }
    }

    pub fn parameter(id: impl Into<String>, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Parameter { value: value.into(), unit: None },
        }
    }

    /// Boundaries are anonymous in practice; the id doubles as the name.
    pub fn boundary(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { name: id.clone(), id, kind: NodeKind::Boundary { unit: None } }
    }

    pub fn stock(id: impl Into<String>, name: impl Into<String>, initial_value: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Stock { initial_value, unit: None },
        }
    }

    pub fn flow<F>(
        id: impl Into<String>,
        name: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        inputs: Vec<InputRef>,
        logic: F,
    ) -> Self
    where
        F: Fn(&Args<'_>) -> Result<f64, LogicFailure> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Flow { from: from.into(), to: to.into(), inputs, logic: Logic::new(logic) },
        }
    }

    pub fn converter<F>(id: impl Into<String>, name: impl Into<String>, inputs: Vec<InputRef>, logic: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<f64, LogicFailure> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Converter { inputs, logic: Logic::new(logic) },
        }
    }

    /// Attaches a unit reference. Ignored for kinds that carry none.
    pub fn with_unit(mut self, unit_id: impl Into<String>) -> Self {
        match &mut self.kind {
            NodeKind::Parameter { unit, .. } | NodeKind::Boundary { unit } | NodeKind::Stock { unit, .. } => {
                *unit = Some(unit_id.into());
            }
            _ => {}
        }
        self
    }

    pub fn tag(&self) -> KindTag { self.kind.tag() }

    /// The implicit clock node: value `t` at step `t`.
    pub fn current_time() -> Self {
        Self::parameter(CURRENT_TIME_ID, "current time", ParamValue::by_step(|t| t as f64))
    }
}
