//! Multilevel atom with field couplings and decay channels.
//!
//! All operators built here are in units of angular frequency.

use std::f64::consts::TAU;
use itertools::Itertools;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use rustc_hash::FxHashMap as HashMap;
use crate::{
    config::{ AtomConfig, DecayConfig, FieldConfig },
    error::{ MbResult, config_err },
    t_funcs::TimeFunc,
};

/// Tolerance on the trace of a configured initial state.
const TRACE_TOL: f64 = 1e-9;

/// A validated field.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub label: String,
    /// `(lower, upper)` level pairs.
    pub coupled_levels: Vec<(usize, usize)>,
    pub factors: Vec<f64>,
    /// Detuning in cycles.
    pub detuning: f64,
    pub detuning_positive: bool,
    /// Peak Rabi frequency in cycles.
    pub rabi_freq: f64,
    pub t_func: TimeFunc,
}

impl Field {
    fn from_config(cfg: &FieldConfig, num_states: usize) -> MbResult<Self> {
        let label = if cfg.label.is_empty() { "<unlabeled>" } else { cfg.label.as_str() };
        let coupled_levels: Vec<(usize, usize)>
            = cfg.coupled_levels.iter()
            .map(|&[l, u]| (l, u))
            .collect();
        for &(l, u) in coupled_levels.iter() {
            if l >= num_states || u >= num_states {
                return Err(config_err(format!(
                    "field '{}': coupled level ({}, {}) out of range for {} \
                    states",
                    label, l, u, num_states)));
            }
            if l == u {
                return Err(config_err(format!(
                    "field '{}': level {} coupled to itself", label, l)));
            }
        }
        let factors = expand_factors(&cfg.factors, coupled_levels.len())
            .map_err(|(nf, nc)| config_err(format!(
                "field '{}': {} factors given for {} coupled levels",
                label, nf, nc)))?;
        let t_func
            = match (&cfg.rabi_freq_t_func, cfg.rabi_freq_t_args.is_empty()) {
                (None, true) => TimeFunc::default(),
                (None, false) => TimeFunc::from_args("square", &cfg.rabi_freq_t_args)?,
                (Some(name), _) => TimeFunc::from_args(name, &cfg.rabi_freq_t_args)?,
            };
        Ok(Self {
            label: cfg.label.clone(),
            coupled_levels,
            factors,
            detuning: cfg.detuning,
            detuning_positive: cfg.detuning_positive,
            rabi_freq: cfg.rabi_freq,
            t_func,
        })
    }

    fn detuning_sign(&self) -> f64 { if self.detuning_positive { 1.0 } else { -1.0 } }

    /// Angular Rabi frequency `2π * rabi_freq * f(t)`.
    pub fn omega_at(&self, t: f64) -> C64 {
        self.t_func.eval(t) * (TAU * self.rabi_freq)
    }

    /// Distinct upper (or lower) levels coupled by this field.
    pub fn levels(&self, upper: bool) -> Vec<usize> {
        self.coupled_levels.iter()
            .map(|&(l, u)| if upper { u } else { l })
            .unique()
            .collect()
    }
}

// empty factors mean all ones
fn expand_factors(factors: &[f64], n: usize) -> Result<Vec<f64>, (usize, usize)> {
    if factors.is_empty() {
        Ok(vec![1.0; n])
    } else if factors.len() == n {
        Ok(factors.to_vec())
    } else {
        Err((factors.len(), n))
    }
}

fn build_decay_matrix(decays: &[DecayConfig], num_states: usize)
    -> MbResult<nd::Array2<f64>>
{
    let mut Y: nd::Array2<f64> = nd::Array2::zeros((num_states, num_states));
    for decay in decays.iter() {
        if !(decay.rate > 0.0) || !decay.rate.is_finite() {
            return Err(config_err(format!(
                "decay rate must be positive, got {}", decay.rate)));
        }
        let factors = expand_factors(&decay.factors, decay.channels.len())
            .map_err(|(nf, nc)| config_err(format!(
                "decay: {} factors given for {} channels", nf, nc)))?;
        for (&[a, b], f) in decay.channels.iter().zip(factors) {
            if a >= num_states || b >= num_states {
                return Err(config_err(format!(
                    "decay channel ({}, {}) out of range for {} states",
                    a, b, num_states)));
            }
            // `Y[i, j]` is the rate from `i` into `j`; channel [a, b] is b -> a
            Y[[b, a]] += TAU * decay.rate * f.powi(2);
        }
    }
    Ok(Y)
}

fn build_initial_state(pops: Option<&[f64]>, num_states: usize)
    -> MbResult<nd::Array2<C64>>
{
    let mut rho: nd::Array2<C64> = nd::Array2::zeros((num_states, num_states));
    match pops {
        None => { rho[[0, 0]] = C64::new(1.0, 0.0); },
        Some(p) => {
            if p.len() != num_states {
                return Err(config_err(format!(
                    "initial state has {} populations for {} states",
                    p.len(), num_states)));
            }
            if p.iter().any(|&pk| pk < 0.0) {
                return Err(config_err("initial state populations must be non-negative"));
            }
            let tr: f64 = p.iter().sum();
            if (tr - 1.0).abs() > TRACE_TOL {
                return Err(config_err(format!(
                    "initial state trace must be 1, got {}", tr)));
            }
            p.iter().enumerate()
                .for_each(|(k, &pk)| { rho[[k, k]] = C64::new(pk, 0.0); });
        },
    }
    Ok(rho)
}

/// Validated multilevel atom with precomputed static operators.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub label: String,
    num_states: usize,
    fields: Vec<Field>,
    H0: nd::Array2<C64>,
    Y: nd::Array2<f64>,
    rho0: nd::Array2<C64>,
}

impl Atom {
    /// Validate an atom configuration.
    ///
    /// Fails on out-of-range levels, self-couplings, a level pair driven by
    /// more than one field (or twice by the same field), non-positive decay
    /// rates, mismatched factor or energy counts, bad envelope arguments, and
    /// initial states with the wrong length or trace.
    pub fn from_config(cfg: &AtomConfig) -> MbResult<Self> {
        let n = cfg.num_states;
        if n == 0 { return Err(config_err("atom must have at least one state")); }

        let fields: Vec<Field>
            = cfg.fields.iter()
            .map(|f| Field::from_config(f, n))
            .collect::<MbResult<_>>()?;
        let mut driven: HashMap<(usize, usize), usize> = HashMap::default();
        for (k, field) in fields.iter().enumerate() {
            for &(l, u) in field.coupled_levels.iter() {
                let key = (l.min(u), l.max(u));
                if let Some(prev) = driven.insert(key, k) {
                    return Err(config_err(format!(
                        "levels ({}, {}) coupled by both field {} and field {}",
                        l, u, prev, k)));
                }
            }
        }

        let mut H0: nd::Array2<C64> = nd::Array2::zeros((n, n));
        if !cfg.energies.is_empty() {
            if cfg.energies.len() != n {
                return Err(config_err(format!(
                    "{} energies given for {} states", cfg.energies.len(), n)));
            }
            H0.diag_mut().iter_mut().zip(cfg.energies.iter())
                .for_each(|(h, &e)| { *h = C64::new(TAU * e, 0.0); });
        }

        let Y = build_decay_matrix(&cfg.decays, n)?;
        let rho0 = build_initial_state(cfg.initial_state.as_deref(), n)?;
        Ok(Self { label: cfg.label.clone(), num_states: n, fields, H0, Y, rho0 })
    }

    pub fn num_states(&self) -> usize { self.num_states }

    pub fn fields(&self) -> &[Field] { &self.fields }

    pub fn num_fields(&self) -> usize { self.fields.len() }

    /// Replace the envelope of one field.
    pub fn set_field_t_func(&mut self, field_idx: usize, rabi_freq: f64, t_func: TimeFunc)
        -> MbResult<()>
    {
        let nf = self.fields.len();
        let field = self.fields.get_mut(field_idx)
            .ok_or(crate::error::Error::OutOfRange {
                what: "field", index: field_idx, len: nf })?;
        field.rabi_freq = rabi_freq;
        field.t_func = t_func;
        Ok(())
    }

    /// Decay rate coupling matrix; the `(i, j)`-th entry is the (angular) rate
    /// from state `i` into state `j`.
    pub fn decay_matrix(&self) -> &nd::Array2<f64> { &self.Y }

    pub fn initial_state(&self) -> &nd::Array2<C64> { &self.rho0 }

    /// Detuning part of the Hamiltonian with every field's detuning shifted by
    /// `shift` cycles.
    pub fn H_Delta(&self, shift: f64) -> nd::Array2<C64> {
        let n = self.num_states;
        let mut H: nd::Array2<C64> = nd::Array2::zeros((n, n));
        for field in self.fields.iter() {
            let delta = field.detuning_sign() * TAU * (field.detuning + shift);
            for &(_, u) in field.coupled_levels.iter() {
                H[[u, u]] -= delta;
            }
        }
        H
    }

    /// Time-independent part of the Hamiltonian.
    pub fn H_static(&self, shift: f64) -> nd::Array2<C64> {
        &self.H0 + &self.H_Delta(shift)
    }

    /// Add the field couplings for angular Rabi frequencies `omegas` (one per
    /// field) to `H`.
    pub fn add_H_Omega<S>(&self, H: &mut nd::Array2<C64>, omegas: &nd::ArrayBase<S, nd::Ix1>)
    where S: nd::Data<Elem = C64>
    {
        for (field, &omega) in self.fields.iter().zip(omegas.iter()) {
            let half = omega / 2.0;
            for (&(l, u), &a) in field.coupled_levels.iter().zip(field.factors.iter()) {
                H[[l, u]] += half * a;
                H[[u, l]] += half.conj() * a;
            }
        }
    }

    /// Full Hamiltonian given a precomputed static part.
    pub fn hamiltonian<S>(&self, H_static: &nd::Array2<C64>, omegas: &nd::ArrayBase<S, nd::Ix1>)
        -> nd::Array2<C64>
    where S: nd::Data<Elem = C64>
    {
        let mut H = H_static.clone();
        self.add_H_Omega(&mut H, omegas);
        H
    }

    /// Angular Rabi frequencies of every field at time `t`.
    pub fn omegas_at(&self, t: f64) -> nd::Array1<C64> {
        self.fields.iter().map(|f| f.omega_at(t)).collect()
    }

    /// Angular Rabi frequencies of every field over `tlist`, as a
    /// `(num_fields, len(tlist))` array.
    pub fn omegas_t(&self, tlist: &nd::Array1<f64>) -> nd::Array2<C64> {
        let mut omegas: nd::Array2<C64>
            = nd::Array2::zeros((self.fields.len(), tlist.len()));
        self.fields.iter().zip(omegas.outer_iter_mut())
            .for_each(|(field, mut row)| {
                row.iter_mut().zip(tlist.iter())
                    .for_each(|(w, &t)| { *w = field.omega_at(t); });
            });
        omegas
    }

    /// Coherence source of every field, `Σ a² ρ[lower, upper]`, over a state
    /// time series `rho_t` of shape `(n, n, nt)`.
    ///
    /// Returns a `(num_fields, nt)` array.
    pub fn sum_coherence(&self, rho_t: &nd::Array3<C64>) -> nd::Array2<C64> {
        let nt = rho_t.shape()[2];
        let mut coh: nd::Array2<C64> = nd::Array2::zeros((self.fields.len(), nt));
        self.fields.iter().zip(coh.outer_iter_mut())
            .for_each(|(field, mut row)| {
                let iter = field.coupled_levels.iter().zip(field.factors.iter());
                for (&(l, u), &a) in iter {
                    row.scaled_add(C64::new(a * a, 0.0), &rho_t.slice(s![l, u, ..]));
                }
            });
        coh
    }
}
