//! Parameter sweeps: independent runs over one model, executed in parallel.
//!
//! Runs never share state, so they parallelize trivially. Steps inside a run
//! stay sequential.

use super::engine::{Engine, State};
use super::error::ComputationError;
use super::plan::Compiler;
use crate::config::{EngineConfig, ScenarioConfig};
use crate::store::{ParamValue, Registry};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// A named set of parameter overrides.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub parameters: Vec<(String, ParamValue)>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Vec::new() }
    }

    pub fn set(mut self, parameter: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push((parameter.into(), value.into()));
        self
    }
}

impl From<&ScenarioConfig> for Scenario {
    fn from(config: &ScenarioConfig) -> Self {
        config.parameters.iter().fold(Scenario::new(config.name.clone()), |s, (k, &v)| s.set(k.clone(), v))
    }
}

/// The result of one scenario, with the registry its state belongs to.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub registry: Registry,
    pub result: Result<State, ComputationError>,
}

/// Runs every scenario for `config.steps` steps. Outcomes keep scenario order.
///
/// Structural problems (cycles) fail the whole sweep up front; a bad override
/// or a failing logic function only fails its own scenario.
pub fn run_scenarios(
    base: &Registry,
    scenarios: &[Scenario],
    config: &EngineConfig,
) -> Result<Vec<ScenarioOutcome>, ComputationError> {
    let plan = Arc::new(Compiler::new(base).compile()?);
    info!(scenarios = scenarios.len(), steps = config.steps, "starting scenario sweep");

    let outcomes: Vec<ScenarioOutcome> = scenarios
        .par_iter()
        .map(|scenario| {
            let mut registry = base.clone();
            let result = apply_overrides(&mut registry, scenario).and_then(|_| {
                Engine::with_plan(&registry, Arc::clone(&plan))?.with_config(config).run(config.steps)
            });
            ScenarioOutcome { name: scenario.name.clone(), registry, result }
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(completed = outcomes.len() - failed, failed, "scenario sweep finished");
    Ok(outcomes)
}

fn apply_overrides(registry: &mut Registry, scenario: &Scenario) -> Result<(), ComputationError> {
    for (parameter, value) in &scenario.parameters {
        registry.set_parameter(parameter, value.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Node;

    fn tank() -> Registry {
        Registry::from_nodes(vec![
            Node::stock("tank", "tank", 100.0),
            Node::boundary("drain"),
            Node::parameter("leak", "leak fraction", 0.1),
            Node::flow("outflow", "outflow", "tank", "drain", vec!["tank".into(), "leak".into()], |a| {
                Ok(a.value(0)? * a.value(1)?)
            }),
        ])
        .unwrap()
    }

    #[test]
    fn test_sweep_preserves_order_and_isolates_failures() {
        let base = tank();
        let scenarios = vec![
            Scenario::new("baseline"),
            Scenario::new("leaky").set("leak", 0.5),
            Scenario::new("typo").set("leek", 0.5),
            Scenario::new("wrong kind").set("tank", 0.5),
        ];
        let config = EngineConfig { steps: 2, ..EngineConfig::default() };
        let outcomes = run_scenarios(&base, &scenarios, &config).unwrap();

        let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["baseline", "leaky", "typo", "wrong kind"]);

        let tank_values = |o: &ScenarioOutcome| {
            o.result.as_ref().unwrap().series(&o.registry, "tank").unwrap().written_values().to_vec()
        };
        assert_eq!(tank_values(&outcomes[0]), vec![100.0, 90.0, 81.0]);
        assert_eq!(tank_values(&outcomes[1]), vec![100.0, 50.0, 25.0]);
        assert!(matches!(outcomes[2].result, Err(ComputationError::NodeNotFound { .. })));
        assert!(matches!(outcomes[3].result, Err(ComputationError::InvalidReference { .. })));
    }

    #[test]
    fn test_scenario_from_config() {
        let config = ScenarioConfig {
            name: "slow".into(),
            parameters: [("leak".to_string(), 0.01)].into_iter().collect(),
        };
        let scenario = Scenario::from(&config);
        assert_eq!(scenario.name, "slow");
        assert_eq!(scenario.parameters.len(), 1);
        assert_eq!(scenario.parameters[0].1.at(0), 0.01);
    }
}
