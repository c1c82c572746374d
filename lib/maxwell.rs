//! Spatial stepping of field envelopes along the propagation axis.
//!
//! In the frame moving with the pulse, each field obeys
//! ```text
//! ∂Ω_f/∂z = i 2π g_f Σ a² ρ[lower, upper]
//! ```
//! which is integrated explicitly, one `z` slice at a time.

use std::{ f64::consts::TAU, fmt, str::FromStr };
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ Error, MbResult };

/// Explicit scheme used to advance the field in `z`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Step {
    /// First-order forward Euler.
    Euler,
    /// Two-step Adams-Bashforth, bootstrapped with one Euler step.
    #[default]
    AdamsBashforth,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::AdamsBashforth => "ab",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> MbResult<Self> {
        match s.to_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "ab" | "adams-bashforth" | "adams_bashforth" => Ok(Self::AdamsBashforth),
            other => Err(Error::Config(format!(
                "unknown spatial step '{}'; expected 'euler' or 'ab'", other))),
        }
    }
}

/// Advances `(num_fields, nt)` field slices one `dz` at a time.
///
/// The stepper owns the coherence of the previous slice, so a fresh stepper
/// must be used for every independent solve.
#[derive(Clone, Debug)]
pub struct SpatialStepper {
    step: Step,
    dz: f64,
    // `i 2π g_f` for each field
    coupling: nd::Array1<C64>,
    prev: Option<nd::Array2<C64>>,
}

impl SpatialStepper {
    /// `interaction_strengths` holds one `g_f` (in cycles) per field.
    pub fn new(step: Step, dz: f64, interaction_strengths: &[f64]) -> Self {
        let coupling
            = interaction_strengths.iter()
            .map(|&g| C64::new(0.0, TAU * g))
            .collect();
        Self { step, dz, coupling, prev: None }
    }

    pub fn step_kind(&self) -> Step { self.step }

    pub fn coupling(&self) -> &nd::Array1<C64> { &self.coupling }

    /// `dΩ/dz` for each field, given its coherence source.
    fn slope(&self, coh: &nd::Array2<C64>) -> nd::Array2<C64> {
        let mut slope = coh.clone();
        slope.outer_iter_mut().zip(self.coupling.iter())
            .for_each(|(mut row, &c)| { row.mapv_inplace(|x| c * x); });
        slope
    }

    /// Produce `Ω(k + 1)` from `Ω(k)` and the coherence source `coh(k)`.
    pub fn step<S>(&mut self, omegas: &nd::ArrayBase<S, nd::Ix2>, coh: &nd::Array2<C64>)
        -> nd::Array2<C64>
    where S: nd::Data<Elem = C64>
    {
        let slope = self.slope(coh);
        let next
            = match (self.step, self.prev.as_ref()) {
                (Step::AdamsBashforth, Some(prev)) => {
                    let slope_prev = self.slope(prev);
                    omegas + &((slope * 1.5 - slope_prev * 0.5) * self.dz)
                },
                _ => omegas + &(slope * self.dz),
            };
        if self.step == Step::AdamsBashforth { self.prev = Some(coh.clone()); }
        next
    }

    /// Forget the carried coherence so that the next step bootstraps again.
    pub fn reset(&mut self) { self.prev = None; }
}
