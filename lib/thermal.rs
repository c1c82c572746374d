//! Doppler (velocity class) averaging.
//!
//! A thermal ensemble is represented by a set of detuning offsets with
//! Maxwell-Boltzmann weights; every class is solved independently and the
//! results are combined in a fixed order.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use crate::{
    config::VelocityClassesConfig,
    error::{ Error, MbResult, config_err },
    grid::linspace,
};

// offsets closer than this are treated as the same class
const MERGE_TOL: f64 = 1e-12;

/// A single detuning offset (in cycles) and its normalized weight.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VelocityClass {
    pub delta: f64,
    pub weight: f64,
}

/// Maxwell-Boltzmann factor for a detuning `delta` in a distribution of
/// (1/e half-)width `width`.
pub fn maxwell_boltzmann(delta: f64, width: f64) -> f64 {
    (-(delta / width).powi(2)).exp()
}

// trapezoid weights over a sorted, possibly nonuniform grid
fn quadrature_weights(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n < 2 { return vec![1.0; n]; }
    (0..n)
        .map(|k| {
            let lo = if k == 0 { x[0] } else { x[k - 1] };
            let hi = if k == n - 1 { x[n - 1] } else { x[k + 1] };
            (hi - lo) / 2.0
        })
        .collect()
}

fn range(
    min: Option<f64>,
    max: Option<f64>,
    steps: Option<usize>,
    which: &str,
) -> MbResult<Option<nd::Array1<f64>>>
{
    match (min, max, steps) {
        (None, None, None) => Ok(None),
        (Some(a), Some(b), Some(n)) => {
            if !a.is_finite() || !b.is_finite() || b < a {
                return Err(config_err(format!(
                    "{} thermal detuning range [{}, {}] is invalid", which, a, b)));
            }
            Ok(Some(linspace(a, b, n)))
        },
        _ => Err(config_err(format!(
            "{} thermal detuning range needs min, max, and steps", which))),
    }
}

/// Build the velocity classes described by `spec`.
///
/// An empty spec gives the single class `(0.0, 1.0)`. Otherwise the outer
/// range is merged with the optional inner range, and each offset is weighted
/// by its trapezoid quadrature weight times the Maxwell-Boltzmann factor, with
/// weights normalized to sum to 1.
pub fn build_velocity_classes(spec: &VelocityClassesConfig)
    -> MbResult<Vec<VelocityClass>>
{
    if spec.is_empty() {
        return Ok(vec![VelocityClass { delta: 0.0, weight: 1.0 }]);
    }
    let outer = range(
        spec.thermal_delta_min,
        spec.thermal_delta_max,
        spec.thermal_delta_steps,
        "outer",
    )?;
    let inner = range(
        spec.thermal_delta_inner_min,
        spec.thermal_delta_inner_max,
        spec.thermal_delta_inner_steps,
        "inner",
    )?;
    let mut deltas: Vec<f64>
        = match (outer, inner) {
            (Some(o), Some(i)) => o.iter().chain(i.iter()).copied().collect(),
            (Some(o), None) => o.to_vec(),
            (None, Some(_)) => {
                return Err(config_err(
                    "inner thermal detuning range given without an outer range"));
            },
            (None, None) => vec![0.0],
        };
    deltas.sort_by(|a, b| a.total_cmp(b));
    deltas.dedup_by(|b, a| (*b - *a).abs() <= MERGE_TOL);

    let width
        = spec.thermal_width
        .ok_or_else(|| config_err("thermal_width is required for velocity classes"))?;
    if !width.is_finite() || width < 0.0 {
        return Err(Error::NumericalDomain(format!(
            "thermal width must be non-negative and finite, got {}", width)));
    }
    if width == 0.0 {
        return if deltas.len() == 1 && deltas[0] == 0.0 {
            Ok(vec![VelocityClass { delta: 0.0, weight: 1.0 }])
        } else {
            Err(Error::NumericalDomain(
                "thermal width is zero but the detuning spread is not".into()))
        };
    }
    if deltas.len() == 1 {
        return Ok(vec![VelocityClass { delta: deltas[0], weight: 1.0 }]);
    }

    let raw: Vec<f64>
        = deltas.iter().zip(quadrature_weights(&deltas))
        .map(|(&d, q)| q * maxwell_boltzmann(d, width))
        .collect();
    let norm: f64 = raw.iter().sum();
    if !(norm > 0.0) || !norm.is_finite() {
        return Err(Error::NumericalDomain(format!(
            "velocity class weights vanish for thermal width {}", width)));
    }
    Ok(
        deltas.into_iter().zip(raw)
            .map(|(delta, w)| VelocityClass { delta, weight: w / norm })
            .collect()
    )
}

/// Solve every class with `solve` in parallel and return the weighted sum of
/// the results.
///
/// Classes are solved in batches of `batch_size(classes.len())`, each batch
/// reduced into the running sum before the next starts, so at most one batch
/// of class results is held at a time. Results are reduced in class order,
/// so the output does not depend on thread scheduling. A single class of
/// weight 1 returns the class result unchanged.
pub fn average<F>(classes: &[VelocityClass], solve: F)
    -> MbResult<(nd::Array3<C64>, nd::Array3<C64>)>
where F: Fn(&VelocityClass) -> MbResult<(nd::Array3<C64>, nd::Array3<C64>)> + Sync
{
    let mut acc: Option<(nd::Array3<C64>, nd::Array3<C64>)> = None;
    for batch in classes.chunks(batch_size(classes.len())) {
        let results: Vec<(nd::Array3<C64>, nd::Array3<C64>)>
            = batch.par_iter()
            .map(|vc| {
                log::debug!(
                    "solving velocity class delta = {:+.6e}, weight = {:.6e}",
                    vc.delta, vc.weight);
                solve(vc)
            })
            .collect::<MbResult<_>>()?;
        for (vc, (mut om, mut st)) in batch.iter().zip(results) {
            let w = C64::new(vc.weight, 0.0);
            acc = match acc.take() {
                None => {
                    if vc.weight != 1.0 {
                        om.mapv_inplace(|x| x * w);
                        st.mapv_inplace(|x| x * w);
                    }
                    Some((om, st))
                },
                Some((mut omegas, mut states)) => {
                    omegas.scaled_add(w, &om);
                    states.scaled_add(w, &st);
                    Some((omegas, states))
                },
            };
        }
    }
    acc.ok_or_else(|| config_err("no velocity classes to average over"))
}

/// Number of classes solved concurrently by [`average`]: one per worker
/// thread, never more than there are classes.
pub fn batch_size(num_classes: usize) -> usize {
    rayon::current_num_threads().clamp(1, num_classes.max(1))
}
