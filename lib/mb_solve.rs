//! Maxwell-Bloch solve over a `(z, t)` grid.
//!
//! At every `z` slice the atoms are evolved in time under the local field,
//! and the resulting coherence is used to step the field to the next slice.
//! The whole two-dimensional solve is repeated for every velocity class and
//! the results are averaged.

use std::{ f64::consts::TAU, path::Path };
use log::{ debug, info, warn };
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    atom::Atom,
    config::{ MbSolveConfig, VelocityClassesConfig },
    error::{ Error, MbResult, config_err },
    grid::Grid,
    maxwell::{ SpatialStepper, Step },
    ob_solve::ObSolve,
    spline::CubicSpline,
    store::{ CacheRecord, ResultsStore, config_identity },
    t_funcs::TimeFunc,
    thermal::{ self, VelocityClass },
};

#[derive(Clone, Debug)]
pub struct MbSolve {
    config: MbSolveConfig,
    ob: ObSolve,
    grid: Grid,
    interaction_strengths: Vec<f64>,
    velocity_classes: Vec<VelocityClass>,
    omegas_zt: nd::Array3<C64>,
    states_zt: nd::Array3<C64>,
    loaded_from_store: bool,
}

impl MbSolve {
    /// Validate `config` and set up the input field.
    ///
    /// All topology, envelope, grid, and velocity class errors are raised
    /// here.
    pub fn new(config: MbSolveConfig) -> MbResult<Self> {
        let ob = ObSolve::new(&config.ob_config())?;
        let grid = Grid::new(
            config.z_min, config.z_max, config.z_steps,
            config.t_min, config.t_max, config.t_steps,
        )?;
        let nf = ob.atom().num_fields();
        let interaction_strengths
            = if config.interaction_strengths.is_empty() {
                if nf > 0 {
                    warn!("no interaction strengths given; fields will not be modified by the medium");
                }
                vec![0.0; nf]
            } else if config.interaction_strengths.len() == nf {
                config.interaction_strengths.clone()
            } else {
                return Err(config_err(format!(
                    "{} interaction strengths given for {} fields",
                    config.interaction_strengths.len(), nf)));
            };
        let velocity_classes
            = thermal::build_velocity_classes(&config.velocity_classes)?;
        let mut mb = Self {
            config,
            ob,
            grid,
            interaction_strengths,
            velocity_classes,
            omegas_zt: nd::Array3::zeros((0, 0, 0)),
            states_zt: nd::Array3::zeros((0, 0, 0)),
            loaded_from_store: false,
        };
        mb.init_tensors();
        Ok(mb)
    }

    pub fn from_toml_str(s: &str) -> MbResult<Self> {
        Self::new(MbSolveConfig::from_toml_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> MbResult<Self> {
        Self::new(MbSolveConfig::from_file(path)?)
    }

    // input field at z = 0, everything else zero
    fn init_tensors(&mut self) {
        let atom = self.ob.atom();
        let n = atom.num_states();
        let nz = self.grid.zlist().len();
        let nt = self.grid.tlist().len();
        self.omegas_zt = nd::Array3::zeros((atom.num_fields(), nz, nt));
        self.omegas_zt.slice_mut(s![.., 0, ..])
            .assign(&atom.omegas_t(self.grid.tlist()));
        self.states_zt = nd::Array3::zeros((n * n, nz, nt));
        self.loaded_from_store = false;
    }

    pub fn config(&self) -> &MbSolveConfig { &self.config }

    pub fn atom(&self) -> &Atom { self.ob.atom() }

    pub fn ob_solve(&self) -> &ObSolve { &self.ob }

    pub fn grid(&self) -> &Grid { &self.grid }

    pub fn zlist(&self) -> &nd::Array1<f64> { self.grid.zlist() }

    pub fn tlist(&self) -> &nd::Array1<f64> { self.grid.tlist() }

    pub fn z_step(&self) -> f64 { self.grid.dz() }

    pub fn t_step(&self) -> f64 { self.grid.dt() }

    pub fn interaction_strengths(&self) -> &[f64] { &self.interaction_strengths }

    pub fn velocity_classes(&self) -> &[VelocityClass] { &self.velocity_classes }

    /// `(field, z, t)` angular Rabi frequencies.
    pub fn omegas_zt(&self) -> &nd::Array3<C64> { &self.omegas_zt }

    /// `(density-matrix element, z, t)` states, with `ρ[i, j]` at element
    /// `i * num_states + j`.
    pub fn states_zt(&self) -> &nd::Array3<C64> { &self.states_zt }

    /// Whether the last call to [`Self::mbsolve`] read its results from a
    /// store instead of computing them.
    pub fn loaded_from_store(&self) -> bool { self.loaded_from_store }

    /// Element index of `ρ[i, j]` along the first axis of the state tensor.
    pub fn element(&self, i: usize, j: usize) -> usize {
        i * self.atom().num_states() + j
    }

    /// Replace the velocity classes; discards any previous results.
    pub fn build_velocity_classes(&mut self, spec: VelocityClassesConfig)
        -> MbResult<&[VelocityClass]>
    {
        self.velocity_classes = thermal::build_velocity_classes(&spec)?;
        self.config.velocity_classes = spec;
        self.init_tensors();
        Ok(&self.velocity_classes)
    }

    /// Replace the envelope of one field; discards any previous results.
    pub fn set_field_t_func(&mut self, field_idx: usize, rabi_freq: f64, t_func: TimeFunc)
        -> MbResult<()>
    {
        self.ob.set_field_t_func(field_idx, rabi_freq, t_func)?;
        self.config.atom.fields[field_idx] = self.ob.config().atom.fields[field_idx].clone();
        self.init_tensors();
        Ok(())
    }

    /// Identity of this configuration solved with `step`, as used to key a
    /// [`ResultsStore`].
    pub fn identity(&self, step: Step) -> MbResult<String> {
        config_identity(&self.config, step)
    }

    /// Interpolating envelopes through the field at slice `z_idx`, scaled so
    /// that with `rabi_freq = 1` they reproduce it exactly.
    ///
    /// Feeding these into another solve continues propagation from `z_idx`.
    pub fn omegas_intp_t_funcs(&self, z_idx: usize) -> MbResult<Vec<TimeFunc>> {
        let nz = self.grid.zlist().len();
        if z_idx >= nz {
            return Err(Error::OutOfRange { what: "z", index: z_idx, len: nz });
        }
        self.omegas_zt.slice(s![.., z_idx, ..]).outer_iter()
            .map(|row| TimeFunc::intp(self.grid.tlist(), &row.mapv(|w| w / TAU)))
            .collect()
    }

    /// Full `(z, t)` solve for a single velocity class with every field
    /// detuning shifted by `delta` cycles.
    pub fn solve_velocity_class(&self, step: Step, delta: f64)
        -> MbResult<(nd::Array3<C64>, nd::Array3<C64>)>
    {
        let atom = self.ob.atom();
        let n = atom.num_states();
        let tlist = self.grid.tlist();
        let nz = self.grid.zlist().len();
        let nt = tlist.len();
        let propagator = self.ob.propagator();
        let mut stepper
            = SpatialStepper::new(step, self.grid.dz(), &self.interaction_strengths);

        let mut omegas: nd::Array3<C64>
            = nd::Array3::zeros((atom.num_fields(), nz, nt));
        omegas.slice_mut(s![.., 0, ..]).assign(&atom.omegas_t(tlist));
        let mut states: nd::Array3<C64> = nd::Array3::zeros((n * n, nz, nt));
        for k in 0..nz {
            debug!("delta = {:+.3e}: z slice {}/{}", delta, k + 1, nz);
            let splines: Vec<CubicSpline>
                = omegas.slice(s![.., k, ..]).outer_iter()
                .map(|row| CubicSpline::new(tlist.to_vec(), row.to_vec()))
                .collect::<MbResult<_>>()?;
            let rho_t = propagator.evolve(
                |t| splines.iter().map(|sp| sp.evaluate(t)).collect(),
                tlist,
                delta,
            );
            for i in 0..n {
                for j in 0..n {
                    states.slice_mut(s![i * n + j, k, ..])
                        .assign(&rho_t.slice(s![i, j, ..]));
                }
            }
            if k + 1 < nz {
                let coh = atom.sum_coherence(&rho_t);
                let next = stepper.step(&omegas.slice(s![.., k, ..]), &coh);
                omegas.slice_mut(s![.., k + 1, ..]).assign(&next);
            }
        }
        Ok((omegas, states))
    }

    /// Solve the Maxwell-Bloch equations and return the field and state
    /// tensors.
    ///
    /// If `recalc` is false and `store` holds results for this configuration
    /// and `step`, those are loaded instead; a missing record falls through to
    /// a full solve. Freshly computed results are written to `store` if one is
    /// given.
    pub fn mbsolve(&mut self, step: Step, recalc: bool, store: Option<&ResultsStore>)
        -> MbResult<(nd::Array3<C64>, nd::Array3<C64>)>
    {
        let identity
            = match store {
                Some(_) => Some(self.identity(step)?),
                None => None,
            };
        if let (false, Some(store), Some(identity)) = (recalc, store, identity.as_ref()) {
            match store.load(identity)? {
                Some(record) => {
                    if record.omegas_zt.dim() != self.omegas_zt.dim()
                        || record.states_zt.dim() != self.states_zt.dim()
                    {
                        return Err(Error::Store(format!(
                            "stored tensors for {} do not match the solve grid",
                            identity)));
                    }
                    info!("loaded results for {} from {}", identity, store.dir().display());
                    self.omegas_zt = record.omegas_zt;
                    self.states_zt = record.states_zt;
                    self.loaded_from_store = true;
                    return Ok((self.omegas_zt.clone(), self.states_zt.clone()));
                },
                None => {
                    info!("no stored results for {}; solving", identity);
                },
            }
        }

        info!(
            "mbsolve ({}): {} field(s), {} state(s), {} z x {} t points, {} velocity class(es)",
            step,
            self.atom().num_fields(),
            self.atom().num_states(),
            self.grid.zlist().len(),
            self.grid.tlist().len(),
            self.velocity_classes.len(),
        );
        let (omegas_zt, states_zt)
            = thermal::average(
                &self.velocity_classes,
                |vc| self.solve_velocity_class(step, vc.delta),
            )?;
        self.omegas_zt = omegas_zt;
        self.states_zt = states_zt;
        self.loaded_from_store = false;
        info!("mbsolve ({}) done", step);

        if let (Some(store), Some(identity)) = (store, identity) {
            let record = CacheRecord {
                identity,
                omegas_zt: self.omegas_zt.clone(),
                states_zt: self.states_zt.clone(),
            };
            let path = store.save(&record)?;
            debug!("results written to {}", path.display());
        }
        Ok((self.omegas_zt.clone(), self.states_zt.clone()))
    }
}
