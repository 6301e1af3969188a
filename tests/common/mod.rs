//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use stockflow_core::store::{LogicFailure, Node};

/// Room heated by a furnace and cooled through the walls, 10 °C to start.
pub fn thermostat() -> Vec<Node> {
    vec![
        Node::unit("celsius", "degrees Celsius"),
        Node::stock("room temperature", "room temperature", 10.0).with_unit("celsius"),
        Node::boundary("furnace").with_unit("celsius"),
        Node::boundary("outside").with_unit("celsius"),
        Node::flow(
            "heat from furnace",
            "heat from furnace",
            "furnace",
            "room temperature",
            vec!["desired gap".into()],
            |a| Ok(f64::min(5.0, a.value(0)?)),
        ),
        Node::flow(
            "heat to outside",
            "heat to outside",
            "room temperature",
            "outside",
            vec!["outside gap".into()],
            |a| Ok(0.1 * a.value(0)?),
        ),
        Node::converter(
            "desired gap",
            "discrepancy between desired and actual room temperatures",
            vec!["room temperature".into(), "thermostat setting".into()],
            |a| Ok(a.value(1)? - a.value(0)?),
        ),
        Node::converter(
            "outside gap",
            "discrepancy between inside and outside temperatures",
            vec!["room temperature".into(), "outside temperature".into()],
            |a| Ok(a.value(0)? - a.value(1)?),
        ),
        Node::parameter("thermostat setting", "thermostat setting", 18.0).with_unit("celsius"),
        Node::parameter("outside temperature", "outside temperature", 10.0).with_unit("celsius"),
    ]
}

/// Car lot inventory with perception and delivery delays. Orders placed at
/// step `t` arrive at `t + delivery delay`; until then the factory ships 20.
pub fn car_dealership() -> Vec<Node> {
    vec![
        Node::unit("cars", "cars"),
        Node::unit("days", "days"),
        Node::parameter(
            "customer demand",
            "customer demand",
            stockflow_core::ParamValue::by_step(|t| if t <= 25 { 20.0 } else { 22.0 }),
        )
        .with_unit("cars"),
        Node::parameter("perception delay", "perception delay", 5.0).with_unit("days"),
        Node::parameter("order damping", "order damping", 1.0 / 3.0),
        Node::parameter("delivery delay", "delivery delay", 5.0).with_unit("days"),
        Node::stock("inventory", "car inventory on lot", 200.0).with_unit("cars"),
        Node::flow(
            "deliveries",
            "deliveries",
            "factory",
            "inventory",
            vec![["orders"].into(), "delivery delay".into(), "currentTime".into()],
            |a| {
                let (orders, delay, now) = (a.record(0)?, a.value(1)?, a.value(2)?);
                if now <= delay {
                    return Ok(20.0);
                }
                let placed = (now - delay) as usize;
                orders
                    .at_step(placed)
                    .ok_or_else(|| LogicFailure(format!("no orders recorded at step {}", placed)))
            },
        ),
        Node::flow(
            "sales",
            "car sales",
            "inventory",
            "customers",
            vec!["customer demand".into(), "inventory".into()],
            |a| Ok(f64::min(a.value(0)?, a.value(1)?)),
        ),
        Node::boundary("customers").with_unit("cars"),
        Node::boundary("factory").with_unit("cars"),
        Node::converter(
            "perceived sales",
            "perceived sales",
            vec![["sales"].into(), "perception delay".into(), "customer demand".into()],
            |a| {
                let recent = a.record(0)?.window(0, a.value(1)? as usize);
                if recent.is_empty() {
                    return a.value(2);
                }
                Ok(recent.iter().sum::<f64>() / recent.len() as f64)
            },
        ),
        Node::converter("desired inventory", "desired inventory", vec!["perceived sales".into()], |a| {
            Ok(10.0 * a.value(0)?)
        }),
        Node::converter(
            "inventory discrepancy",
            "inventory discrepancy",
            vec!["inventory".into(), "desired inventory".into()],
            |a| Ok(a.value(1)? - a.value(0)?),
        ),
        Node::converter(
            "orders",
            "orders to factory",
            vec!["inventory discrepancy".into(), "order damping".into(), "perceived sales".into()],
            |a| Ok(f64::max(0.0, a.value(2)? + a.value(0)? * a.value(1)?)),
        ),
    ]
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}
