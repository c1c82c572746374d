//! Evenly spaced spatial and temporal axes.

use ndarray as nd;
use crate::error::{ MbResult, config_err };

/// Return `steps + 1` evenly spaced points from `min` to `max`, inclusive.
///
/// Points are computed as `min + (max - min) * i / steps` rather than by
/// accumulating a step, so `linspace(0.0, 1.0, 10)` gives exactly the decimal
/// literals `0.0, 0.1, ..., 1.0`. The last point is always `max`.
pub fn linspace(min: f64, max: f64, steps: usize) -> nd::Array1<f64> {
    if steps == 0 { return nd::array![min]; }
    let span = max - min;
    let n = steps as f64;
    (0..=steps)
        .map(|i| {
            if i == steps { max } else { min + span * (i as f64) / n }
        })
        .collect()
}

/// A single discretized axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
    points: nd::Array1<f64>,
}

impl Axis {
    pub fn new(min: f64, max: f64, steps: usize) -> MbResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(config_err(
                format!("axis bounds must be finite, got [{}, {}]", min, max)));
        }
        if max < min {
            return Err(config_err(
                format!("axis max {} is less than min {}", max, min)));
        }
        // points must be strictly increasing
        if steps > 0 && max == min {
            return Err(config_err(format!(
                "axis of {} steps has zero extent at {}", steps, min)));
        }
        Ok(Self { min, max, steps, points: linspace(min, max, steps) })
    }

    pub fn points(&self) -> &nd::Array1<f64> { &self.points }

    pub fn len(&self) -> usize { self.points.len() }

    pub fn is_empty(&self) -> bool { self.points.is_empty() }

    /// Spacing between adjacent points; zero for a single-point axis.
    pub fn step_size(&self) -> f64 {
        if self.steps == 0 { 0.0 } else { (self.max - self.min) / self.steps as f64 }
    }
}

/// The `(z, t)` grid a Maxwell-Bloch solve runs over.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub z: Axis,
    pub t: Axis,
}

impl Grid {
    pub fn new(
        z_min: f64,
        z_max: f64,
        z_steps: usize,
        t_min: f64,
        t_max: f64,
        t_steps: usize,
    ) -> MbResult<Self>
    {
        Ok(Self {
            z: Axis::new(z_min, z_max, z_steps)?,
            t: Axis::new(t_min, t_max, t_steps)?,
        })
    }

    pub fn zlist(&self) -> &nd::Array1<f64> { self.z.points() }

    pub fn tlist(&self) -> &nd::Array1<f64> { self.t.points() }

    pub fn dz(&self) -> f64 { self.z.step_size() }

    pub fn dt(&self) -> f64 { self.t.step_size() }
}
