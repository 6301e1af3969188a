use crate::compute::{ComputationError, State};
use crate::store::{KindTag, NodeId, Registry};
use std::fmt::Write;

const MIN_COLUMN_WIDTH: usize = 8;

/// Renders the history of the given nodes as a fixed-width text table, one
/// row per step. An empty `keys` slice selects every node that holds values.
///
/// ```text
/// step | room   | heat
/// -----+--------+-------
///    0 | 10.000 |      -
///    1 | 15.000 |  5.000
/// ```
pub fn format_history_table(registry: &Registry, state: &State, keys: &[&str]) -> Result<String, ComputationError> {
    let columns: Vec<NodeId> = if keys.is_empty() {
        registry
            .ids()
            .filter(|&id| !matches!(registry.tag(id), KindTag::Unit | KindTag::Boundary))
            .collect()
    } else {
        keys.iter().map(|k| registry.lookup(k)).collect::<Result<_, _>>()?
    };

    let widths: Vec<usize> = columns.iter().map(|&id| registry.key(id).len().max(MIN_COLUMN_WIDTH)).collect();
    let mut output = String::new();

    // Header
    let _ = write!(output, "step");
    for (&id, &w) in columns.iter().zip(&widths) {
        let _ = write!(output, " | {:<w$}", registry.key(id), w = w);
    }
    let _ = writeln!(output);
    let _ = write!(output, "-----");
    for &w in &widths {
        let _ = write!(output, "+{}", "-".repeat(w + 2));
    }
    let _ = writeln!(output);

    // Rows
    for step in 0..=state.current_step() {
        let _ = write!(output, "{:>4}", step);
        for (&id, &w) in columns.iter().zip(&widths) {
            match state.history().get(id, step) {
                Some(v) => {
                    let _ = write!(output, " | {:>w$.3}", v, w = w);
                }
                None => {
                    let _ = write!(output, " | {:>w$}", "-", w = w);
                }
            }
        }
        let _ = writeln!(output);
    }
    Ok(output)
}
