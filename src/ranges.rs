//! Global axis and color-scale bounds shared by every frame.

use std::collections::HashMap;

use ndarray::{Array2, ArrayView1};
use ndarray_stats::QuantileExt;
use tracing::debug;

use crate::error::{MovieError, Result};
use crate::samples::Samples;

/// Closed interval `[min, max]` of an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN-skipping extent of every value in `table`.
    pub fn of(table: &Array2<f64>) -> Self {
        Self {
            min: *table.min_skipnan(),
            max: *table.max_skipnan(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Bounds to draw with. A zero-width range is widened on both sides so
    /// the axis still has extent.
    pub fn plot_bounds(&self) -> (f64, f64) {
        if self.span() > 0.0 {
            (self.min, self.max)
        } else {
            let pad = (self.min.abs() * 0.05).max(0.5);
            (self.min - pad, self.max + pad)
        }
    }

    /// Position of `value` inside the range, clamped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.span() > 0.0 {
            ((value - self.min) / self.span()).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }
}

/// Per-parameter axis bounds, in parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisRanges {
    ranges: Vec<(String, AxisRange)>,
}

impl AxisRanges {
    /// Bounds of every parameter across all frames. Entries of `mins` and
    /// `maxs` replace the computed minimum or maximum of their parameter.
    pub fn compute(
        samples: &Samples,
        mins: &HashMap<String, f64>,
        maxs: &HashMap<String, f64>,
    ) -> Result<Self> {
        let ranges = samples
            .tables()
            .map(|(name, table)| {
                let data = AxisRange::of(table);
                let range = AxisRange::new(
                    mins.get(name).copied().unwrap_or(data.min),
                    maxs.get(name).copied().unwrap_or(data.max),
                );
                resolved(name, range).map(|r| (name.to_string(), r))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    pub fn get(&self, name: &str) -> Option<AxisRange> {
        self.ranges
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| *r)
    }

    /// Ranges in parameter order.
    pub fn to_vec(&self) -> Vec<AxisRange> {
        self.ranges.iter().map(|(_, r)| *r).collect()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Color-scale bounds over every loaded z-value, overridden by `vmin`/`vmax`.
pub fn color_range(
    z_values: &Array2<f64>,
    vmin: Option<f64>,
    vmax: Option<f64>,
) -> Result<AxisRange> {
    let data = AxisRange::of(z_values);
    resolved(
        "color scale",
        AxisRange::new(vmin.unwrap_or(data.min), vmax.unwrap_or(data.max)),
    )
}

/// Linearly interpolated `p`-th percentile (0-100) of the finite entries of
/// `values`, or `None` if there are none.
pub fn percentile(values: ArrayView1<f64>, p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

fn resolved(name: &str, range: AxisRange) -> Result<AxisRange> {
    if !range.is_finite() {
        return Err(MovieError::data(format!(
            "{name} has no finite samples to derive bounds from"
        )));
    }
    if range.min > range.max {
        return Err(MovieError::config(format!(
            "{name}: minimum {} exceeds maximum {}",
            range.min, range.max
        )));
    }
    debug!(axis = name, min = range.min, max = range.max, "axis range");
    Ok(range)
}
