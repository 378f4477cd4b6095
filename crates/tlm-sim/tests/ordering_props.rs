//! Execution order over randomly assembled models.

mod common;

use common::{Gain, Orifice, Step, Tank};
use proptest::prelude::*;
use tlm_sim::{Component, ComponentSystem};

type Creator = fn() -> Box<dyn Component>;

fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} missing from {order:?}"))
}

proptest! {
    #[test]
    fn c_before_q_before_s_and_writers_before_readers(
        lines in 0usize..4,
        chains in proptest::collection::vec(1usize..4, 0..4),
        keys in proptest::collection::vec(any::<u32>(), 32),
    ) {
        prop_assume!(lines + chains.len() > 0);

        let mut parts: Vec<(String, Creator)> = Vec::new();
        for i in 0..lines {
            parts.push((format!("T{i}a"), Tank::boxed));
            parts.push((format!("T{i}b"), Tank::boxed));
            parts.push((format!("O{i}"), Orifice::boxed));
        }
        for (j, &gains) in chains.iter().enumerate() {
            parts.push((format!("S{j}"), Step::boxed));
            for k in 0..gains {
                parts.push((format!("G{j}x{k}"), Gain::boxed));
            }
        }
        let mut shuffled: Vec<usize> = (0..parts.len()).collect();
        shuffled.sort_by_key(|&i| keys[i % keys.len()]);

        let mut root = ComponentSystem::new("Root");
        for &i in &shuffled {
            let (name, create) = &parts[i];
            root.add_component(name, create()).unwrap();
        }
        for i in 0..lines {
            let orifice = format!("O{i}");
            root.connect((format!("T{i}a").as_str(), "P1"), (orifice.as_str(), "P1")).unwrap();
            root.connect((format!("T{i}b").as_str(), "P1"), (orifice.as_str(), "P2")).unwrap();
        }
        for (j, &gains) in chains.iter().enumerate() {
            let mut upstream = format!("S{j}");
            for k in 0..gains {
                let gain = format!("G{j}x{k}");
                root.connect((upstream.as_str(), "out"), (gain.as_str(), "in")).unwrap();
                upstream = gain;
            }
        }
        root.initialize(0.0, 0.01).unwrap();

        let order = root.execution_order();
        prop_assert_eq!(order.len(), parts.len());
        // Every C sits before every Q, and every Q before every S.
        let at = |names: Vec<String>| -> Vec<usize> {
            names.iter().map(|n| position(&order, n)).collect()
        };
        let c = at((0..lines).flat_map(|i| [format!("T{i}a"), format!("T{i}b")]).collect());
        let q = at((0..lines).map(|i| format!("O{i}")).collect());
        let s = at(parts
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|n| n.starts_with('S') || n.starts_with('G'))
            .collect());
        for (earlier, later) in [(&c, &q), (&q, &s), (&c, &s)] {
            if let (Some(e), Some(l)) = (earlier.iter().max(), later.iter().min()) {
                prop_assert!(e < l, "{:?}", order);
            }
        }
        for (j, &gains) in chains.iter().enumerate() {
            let mut before = position(&order, &format!("S{j}"));
            for k in 0..gains {
                let at = position(&order, &format!("G{j}x{k}"));
                prop_assert!(before < at, "chain {} out of order: {:?}", j, order);
                before = at;
            }
        }
    }
}
