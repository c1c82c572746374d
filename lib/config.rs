//! TOML-backed configuration for atoms, fields, and solves.
//!
//! All frequencies and rates are in cycles (i.e. divided by 2π); the solver
//! converts to angular units internally.

use std::{ fs, path::Path };
use serde::{ Deserialize, Serialize };
use crate::{
    error::MbResult,
    t_funcs::TArgs,
};

fn default_true() -> bool { true }

fn default_one() -> f64 { 1.0 }

fn default_num_states() -> usize { 1 }

fn default_t_max() -> f64 { 1.0 }

fn default_t_steps() -> usize { 100 }

fn default_z_max() -> f64 { 1.0 }

fn default_z_steps() -> usize { 10 }

fn default_substeps() -> usize { 1 }

/// A field coupling one or more pairs of levels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub detuning: f64,
    #[serde(default = "default_true")]
    pub detuning_positive: bool,
    #[serde(default = "default_one")]
    pub rabi_freq: f64,
    /// Name of the envelope; `square` if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rabi_freq_t_func: Option<String>,
    /// `[lower, upper]` level pairs.
    #[serde(default)]
    pub coupled_levels: Vec<[usize; 2]>,
    /// Per-pair coupling factors; all 1.0 if empty.
    #[serde(default)]
    pub factors: Vec<f64>,
    #[serde(default)]
    pub rabi_freq_t_args: TArgs,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            detuning: 0.0,
            detuning_positive: true,
            rabi_freq: default_one(),
            rabi_freq_t_func: None,
            coupled_levels: Vec::new(),
            factors: Vec::new(),
            rabi_freq_t_args: TArgs::new(),
        }
    }
}

/// A decay rate shared by one or more channels.
///
/// A channel `[a, b]` is decay from level `b` into level `a`; `a == b` is pure
/// dephasing of level `a`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    pub rate: f64,
    pub channels: Vec<[usize; 2]>,
    #[serde(default)]
    pub factors: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtomConfig {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_num_states")]
    pub num_states: usize,
    /// Level energies; all zero if empty.
    #[serde(default)]
    pub energies: Vec<f64>,
    /// Initial level populations; ground state if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Vec<f64>>,
    #[serde(default)]
    pub decays: Vec<DecayConfig>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl Default for AtomConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            num_states: default_num_states(),
            energies: Vec::new(),
            initial_state: None,
            decays: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Detuning offsets (in cycles) to average over.
///
/// Every field of this struct left out means a single class at zero offset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityClassesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_inner_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_inner_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_delta_inner_steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_width: Option<f64>,
}

impl VelocityClassesConfig {
    pub fn is_empty(&self) -> bool { self == &Self::default() }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolveOpts {
    /// Number of RK4 steps taken per `tlist` interval.
    #[serde(default = "default_substeps")]
    pub substeps: usize,
}

impl Default for SolveOpts {
    fn default() -> Self { Self { substeps: default_substeps() } }
}

/// Single-point optical-Bloch solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObSolveConfig {
    #[serde(default)]
    pub t_min: f64,
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    #[serde(default = "default_t_steps")]
    pub t_steps: usize,
    #[serde(default)]
    pub atom: AtomConfig,
    #[serde(default)]
    pub opts: SolveOpts,
}

impl Default for ObSolveConfig {
    fn default() -> Self {
        Self {
            t_min: 0.0,
            t_max: default_t_max(),
            t_steps: default_t_steps(),
            atom: AtomConfig::default(),
            opts: SolveOpts::default(),
        }
    }
}

/// Full Maxwell-Bloch solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MbSolveConfig {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub t_min: f64,
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    #[serde(default = "default_t_steps")]
    pub t_steps: usize,
    #[serde(default)]
    pub z_min: f64,
    #[serde(default = "default_z_max")]
    pub z_max: f64,
    #[serde(default = "default_z_steps")]
    pub z_steps: usize,
    /// One per field; all zero (no medium) if empty.
    #[serde(default)]
    pub interaction_strengths: Vec<f64>,
    #[serde(default)]
    pub atom: AtomConfig,
    #[serde(default)]
    pub velocity_classes: VelocityClassesConfig,
    #[serde(default)]
    pub opts: SolveOpts,
}

impl Default for MbSolveConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            t_min: 0.0,
            t_max: default_t_max(),
            t_steps: default_t_steps(),
            z_min: 0.0,
            z_max: default_z_max(),
            z_steps: default_z_steps(),
            interaction_strengths: Vec::new(),
            atom: AtomConfig::default(),
            velocity_classes: VelocityClassesConfig::default(),
            opts: SolveOpts::default(),
        }
    }
}

impl MbSolveConfig {
    pub fn from_toml_str(s: &str) -> MbResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MbResult<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> MbResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// The single-point part of this configuration.
    pub fn ob_config(&self) -> ObSolveConfig {
        ObSolveConfig {
            t_min: self.t_min,
            t_max: self.t_max,
            t_steps: self.t_steps,
            atom: self.atom.clone(),
            opts: self.opts.clone(),
        }
    }
}

impl ObSolveConfig {
    pub fn from_toml_str(s: &str) -> MbResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MbResult<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> MbResult<String> {
        Ok(toml::to_string(self)?)
    }
}
