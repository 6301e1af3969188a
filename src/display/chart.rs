//! Hand-off format for line-chart renderers: x = step, y = value.

use crate::compute::{ComputationError, Series, State};
use crate::store::Registry;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub coordinates: Vec<(f64, f64)>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub caption: String,
}

impl ChartSeries {
    /// Plots node `key` over the whole run. The x range spans steps
    /// `0..=current_step`, the y range the data extent.
    pub fn from_state(
        registry: &Registry,
        state: &State,
        key: &str,
        caption: impl Into<String>,
    ) -> Result<Self, ComputationError> {
        let series = state.series(registry, key)?;
        let x_end = state.current_step().max(1) as f64;
        Ok(Self {
            coordinates: coordinates(series),
            x_range: (0.0, x_end),
            y_range: y_extent(series),
            caption: caption.into(),
        })
    }

    pub fn with_x_range(mut self, min: f64, max: f64) -> Self {
        self.x_range = (min, max);
        self
    }

    pub fn with_y_range(mut self, min: f64, max: f64) -> Self {
        self.y_range = (min, max);
        self
    }
}

fn coordinates(series: &Series) -> Vec<(f64, f64)> {
    series.points().map(|(step, v)| (step as f64, v)).collect()
}

fn y_extent(series: &Series) -> (f64, f64) {
    let mut values = series.written_values().iter().copied();
    let Some(first) = values.next() else {
        return (0.0, 1.0);
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}
