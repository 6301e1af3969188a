//! document.rs
//! JSON authoring format for models.
//!
//! Logic cannot live in JSON, so flows and converters name their logic and
//! the names are bound through a [`LogicLibrary`] when the document is
//! turned into nodes. Time-varying parameters do the same with schedules.
//!
//! ```json
//! { "nodes": [
//!   { "type": "unit", "id": "cars", "name": "cars" },
//!   { "type": "parameter", "id": "customer demand", "name": "customer demand",
//!     "value": { "schedule": "demand" }, "unit": "cars" },
//!   { "type": "stock", "id": "inventory", "name": "inventory", "initialValue": 200, "unit": "cars" },
//!   { "type": "flow", "id": "sales", "name": "sales", "from": "inventory", "to": "customers",
//!     "inputs": ["inventory", "customer demand"], "logic": "min" }
//! ] }
//! ```

use super::collection::Model;
use crate::store::{InputRef, Logic, LogicFailure, Node, NodeKind, ParamValue};
use crate::compute::Args;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read model file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse model JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("node '{node}' uses logic '{name}', which is not in the library")]
    UnknownLogic { node: String, name: String },

    #[error("parameter '{node}' uses schedule '{name}', which is not in the library")]
    UnknownSchedule { node: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub nodes: Vec<NodeRecord>,
}

/// One node as written in a model file, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeRecord {
    Unit {
        id: String,
        name: String,
    },
    Parameter {
        id: String,
        name: String,
        value: ParamSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Boundary {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Stock {
        id: String,
        name: String,
        #[serde(rename = "initialValue")]
        initial_value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Flow {
        id: String,
        name: String,
        from: String,
        to: String,
        #[serde(default)]
        inputs: Vec<InputRef>,
        logic: String,
    },
    Converter {
        id: String,
        name: String,
        #[serde(default)]
        inputs: Vec<InputRef>,
        logic: String,
    },
}

/// A parameter value: a literal number, or `{"schedule": "<name>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSource {
    Constant(f64),
    Schedule { schedule: String },
}

/// Named logic functions and parameter schedules that documents refer to.
#[derive(Clone, Default)]
pub struct LogicLibrary {
    logic: HashMap<String, Logic>,
    schedules: HashMap<String, ParamValue>,
}

impl LogicLibrary {
    pub fn new() -> Self { Self::default() }

    pub fn with_logic<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<f64, LogicFailure> + Send + Sync + 'static,
    {
        self.logic.insert(name.into(), Logic::new(f));
        self
    }

    pub fn with_schedule<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        self.schedules.insert(name.into(), ParamValue::by_step(f));
        self
    }

    fn logic(&self, node: &str, name: &str) -> Result<Logic, DocumentError> {
        self.logic.get(name).cloned().ok_or_else(|| DocumentError::UnknownLogic {
            node: node.to_string(),
            name: name.to_string(),
        })
    }

    fn schedule(&self, node: &str, name: &str) -> Result<ParamValue, DocumentError> {
        self.schedules.get(name).cloned().ok_or_else(|| DocumentError::UnknownSchedule {
            node: node.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Debug for LogicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut logic: Vec<_> = self.logic.keys().collect();
        let mut schedules: Vec<_> = self.schedules.keys().collect();
        logic.sort();
        schedules.sort();
        f.debug_struct("LogicLibrary").field("logic", &logic).field("schedules", &schedules).finish()
    }
}

impl ModelDocument {
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Binds every logic and schedule name. Reference checking is left to
    /// [`Registry::from_nodes`](crate::store::Registry::from_nodes).
    pub fn into_nodes(self, library: &LogicLibrary) -> Result<Vec<Node>, DocumentError> {
        self.nodes.into_iter().map(|record| record.into_node(library)).collect()
    }

    pub fn into_model(self, library: &LogicLibrary) -> Result<Model, DocumentError> {
        Ok(Model::from_nodes(self.into_nodes(library)?))
    }
}

impl NodeRecord {
    fn into_node(self, library: &LogicLibrary) -> Result<Node, DocumentError> {
        let node = match self {
            NodeRecord::Unit { id, name } => Node { id, name, kind: NodeKind::Unit },
            NodeRecord::Parameter { id, name, value, unit } => {
                let value = match value {
                    ParamSource::Constant(v) => ParamValue::Constant(v),
                    ParamSource::Schedule { schedule } => library.schedule(&id, &schedule)?,
                };
                Node { id, name, kind: NodeKind::Parameter { value, unit } }
            }
            NodeRecord::Boundary { id, name, unit } => {
                Node { name: name.unwrap_or_else(|| id.clone()), id, kind: NodeKind::Boundary { unit } }
            }
            NodeRecord::Stock { id, name, initial_value, unit } => {
                Node { id, name, kind: NodeKind::Stock { initial_value, unit } }
            }
            NodeRecord::Flow { id, name, from, to, inputs, logic } => {
                let logic = library.logic(&id, &logic)?;
                Node { id, name, kind: NodeKind::Flow { from, to, inputs, logic } }
            }
            NodeRecord::Converter { id, name, inputs, logic } => {
                let logic = library.logic(&id, &logic)?;
                Node { id, name, kind: NodeKind::Converter { inputs, logic } }
            }
        };
        Ok(node)
    }
}
