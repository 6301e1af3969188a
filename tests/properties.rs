use proptest::prelude::*;
use stockflow_core::{Engine, Node, Registry};

/// source -> a -> b -> sink, with `inflow` fixed and the other two flows
/// proportional to the stock they drain.
fn two_tanks(a0: f64, b0: f64, inflow: f64, transfer: f64, drain: f64) -> Registry {
    Registry::from_nodes(vec![
        Node::boundary("source"),
        Node::boundary("sink"),
        Node::stock("a", "a", a0),
        Node::stock("b", "b", b0),
        Node::parameter("inflow rate", "inflow rate", inflow),
        Node::parameter("transfer rate", "transfer rate", transfer),
        Node::parameter("drain rate", "drain rate", drain),
        Node::flow("in", "in", "source", "a", vec!["inflow rate".into()], |x| x.value(0)),
        Node::flow("across", "across", "a", "b", vec!["a".into(), "transfer rate".into()], |x| {
            Ok(x.value(0)? * x.value(1)?)
        }),
        Node::flow("out", "out", "b", "sink", vec!["b".into(), "drain rate".into()], |x| {
            Ok(x.value(0)? * x.value(1)?)
        }),
    ])
    .unwrap()
}

proptest! {
    #[test]
    fn runs_are_deterministic(
        a0 in 0.0f64..1e3,
        rate in 0.0f64..1.0,
        steps in 0usize..40,
    ) {
        let reg = two_tanks(a0, 0.0, 1.0, rate, rate / 2.0);
        let first = Engine::new(&reg).unwrap().run(steps).unwrap();
        let second = Engine::new(&reg).unwrap().run(steps).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn each_stock_changes_by_its_own_flows(
        a0 in 0.0f64..1e3,
        b0 in 0.0f64..1e3,
        inflow in 0.0f64..50.0,
        transfer in 0.0f64..1.0,
        drain in 0.0f64..1.0,
        steps in 1usize..30,
    ) {
        let reg = two_tanks(a0, b0, inflow, transfer, drain);
        let state = Engine::new(&reg).unwrap().run(steps).unwrap();
        let value = |key: &str, step: usize| state.value(&reg, key, step).unwrap().unwrap();

        let tolerance = |scale: f64| 1e-9 * scale.abs().max(1.0);
        for t in 1..=steps {
            let (into_a, across, out_of_b) = (value("in", t), value("across", t), value("out", t));

            let a_expected = value("a", t - 1) + into_a - across;
            prop_assert!((value("a", t) - a_expected).abs() <= tolerance(a_expected));

            let b_expected = value("b", t - 1) + across - out_of_b;
            prop_assert!((value("b", t) - b_expected).abs() <= tolerance(b_expected));
        }
    }

    #[test]
    fn history_is_append_only(
        rate in 0.0f64..1.0,
        short in 0usize..20,
        extra in 0usize..20,
    ) {
        let reg = two_tanks(100.0, 0.0, 1.0, rate, rate);
        let engine = Engine::new(&reg).unwrap();
        let early = engine.run(short).unwrap();
        let mut late = early.clone();
        for _ in 0..extra {
            engine.advance(&mut late).unwrap();
        }

        for key in ["a", "b", "in", "across", "out", "currentTime"] {
            let prefix = early.series(&reg, key).unwrap().written_values();
            let full = late.series(&reg, key).unwrap().written_values();
            prop_assert_eq!(prefix, &full[..prefix.len()]);
        }
    }

    #[test]
    fn record_windows_clamp_to_written_history(
        width in 0usize..12,
        steps in 1usize..20,
    ) {
        let reg = Registry::from_nodes(vec![
            Node::parameter("width", "width", width as f64),
            Node::converter("seen", "seen", vec![["currentTime"].into(), "width".into()], |x| {
                Ok(x.record(0)?.window(0, x.value(1)? as usize).len() as f64)
            }),
            Node::converter("oldest", "oldest", vec![["currentTime"].into()], |x| {
                Ok(x.record(0)?.lag(1_000).unwrap_or(-1.0))
            }),
        ])
        .unwrap();
        let state = Engine::new(&reg).unwrap().run(steps).unwrap();

        for t in 1..=steps {
            // currentTime has values at steps 1..t-1 when step t is computed.
            let seen = state.value(&reg, "seen", t).unwrap().unwrap();
            prop_assert_eq!(seen, width.min(t - 1) as f64);
            prop_assert_eq!(state.value(&reg, "oldest", t).unwrap(), Some(-1.0));
        }
    }
}
