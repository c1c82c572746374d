//! Optical-Bloch solve for a single atom at a single point in space.

use log::{ debug, info };
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::{
    atom::Atom,
    config::{ ObSolveConfig, SolveOpts },
    error::{ Error, MbResult },
    grid::Axis,
    rabi::AtomicPropagator,
    store::{ CacheRecord, ResultsStore, ob_config_identity },
    t_funcs::TimeFunc,
};

/// Check that every level index is below `n`.
pub(crate) fn check_levels(levels: &[usize], n: usize) -> MbResult<()> {
    match levels.iter().find(|&&l| l >= n) {
        Some(&l) => Err(Error::OutOfRange { what: "level", index: l, len: n }),
        None => Ok(()),
    }
}

/// Check that every pair of level indices is below `n`.
pub(crate) fn check_pairs(pairs: &[(usize, usize)], n: usize) -> MbResult<()> {
    pairs.iter().try_for_each(|&(i, j)| check_levels(&[i, j], n))
}

#[derive(Clone, Debug)]
pub struct ObSolve {
    config: ObSolveConfig,
    atom: Atom,
    t: Axis,
    states_t: nd::Array3<C64>,
    loaded_from_store: bool,
}

impl ObSolve {
    pub fn new(config: &ObSolveConfig) -> MbResult<Self> {
        let atom = Atom::from_config(&config.atom)?;
        let t = Axis::new(config.t_min, config.t_max, config.t_steps)?;
        let n = atom.num_states();
        let states_t = nd::Array3::zeros((n, n, t.len()));
        Ok(Self {
            config: config.clone(),
            atom,
            t,
            states_t,
            loaded_from_store: false,
        })
    }

    pub fn from_toml_str(s: &str) -> MbResult<Self> {
        Self::new(&ObSolveConfig::from_toml_str(s)?)
    }

    pub fn config(&self) -> &ObSolveConfig { &self.config }

    pub fn atom(&self) -> &Atom { &self.atom }

    pub fn tlist(&self) -> &nd::Array1<f64> { self.t.points() }

    pub fn t_step(&self) -> f64 { self.t.step_size() }

    pub fn opts(&self) -> &SolveOpts { &self.config.opts }

    pub fn propagator(&self) -> AtomicPropagator<'_> {
        AtomicPropagator::new(&self.atom, self.config.opts.substeps)
    }

    /// Replace the envelope of one field; discards any previous result.
    pub fn set_field_t_func(&mut self, field_idx: usize, rabi_freq: f64, t_func: TimeFunc)
        -> MbResult<()>
    {
        let name = t_func.name().to_string();
        let args = t_func.to_args();
        self.atom.set_field_t_func(field_idx, rabi_freq, t_func)?;
        let field_cfg = &mut self.config.atom.fields[field_idx];
        field_cfg.rabi_freq = rabi_freq;
        field_cfg.rabi_freq_t_func = Some(name);
        field_cfg.rabi_freq_t_args = args;
        self.states_t.fill(C64::zero());
        self.loaded_from_store = false;
        Ok(())
    }

    /// Identity of this configuration, as used to key a [`ResultsStore`].
    pub fn identity(&self) -> MbResult<String> { ob_config_identity(&self.config) }

    /// Whether the last call to [`Self::solve`] read its result from a store
    /// instead of computing it.
    pub fn loaded_from_store(&self) -> bool { self.loaded_from_store }

    /// Evolve the atom under its configured field envelopes with every field
    /// detuning shifted by `shift` cycles, without storing the result.
    pub fn evolve_shifted(&self, shift: f64) -> nd::Array3<C64> {
        self.propagator()
            .evolve(|t| self.atom.omegas_at(t), self.t.points(), shift)
    }

    /// Evolve the atom under its configured fields and keep the result.
    ///
    /// If `recalc` is false and `store` holds a result for this
    /// configuration, that is used instead; a missing record falls through to
    /// a fresh solve, whose result is then written to `store`.
    pub fn solve(&mut self, recalc: bool, store: Option<&ResultsStore>)
        -> MbResult<&nd::Array3<C64>>
    {
        let identity
            = match store {
                Some(_) => Some(self.identity()?),
                None => None,
            };
        let n = self.atom.num_states();
        let nt = self.t.len();
        if let (false, Some(store), Some(identity)) = (recalc, store, identity.as_ref()) {
            if let Some(record) = store.load(identity)? {
                if record.states_zt.dim() != (n * n, 1, nt) {
                    return Err(Error::Store(format!(
                        "stored states for {} do not match the time grid", identity)));
                }
                self.states_t
                    = record.states_zt.into_shape((n, n, nt))
                    .map_err(|err| Error::Store(err.to_string()))?;
                self.loaded_from_store = true;
                info!("loaded single-point result for {}", identity);
                return Ok(&self.states_t);
            }
            debug!("no stored single-point result for {}; solving", identity);
        }

        self.states_t = self.evolve_shifted(0.0);
        self.loaded_from_store = false;

        if let (Some(store), Some(identity)) = (store, identity) {
            let omegas_t = self.atom.omegas_t(self.t.points());
            let nf = omegas_t.nrows();
            let record = CacheRecord {
                identity,
                omegas_zt: omegas_t.into_shape((nf, 1, nt))
                    .map_err(|err| Error::Store(err.to_string()))?,
                states_zt: self.states_t.as_standard_layout().to_owned()
                    .into_shape((n * n, 1, nt))
                    .map_err(|err| Error::Store(err.to_string()))?,
            };
            store.save(&record)?;
        }
        Ok(&self.states_t)
    }

    /// Density matrix over time, as an `(n, n, len(tlist))` array; all zero
    /// before [`Self::solve`] is called.
    pub fn states_t(&self) -> &nd::Array3<C64> { &self.states_t }

    /// Summed populations of `levels` over time.
    pub fn populations(&self, levels: &[usize]) -> MbResult<nd::Array1<f64>> {
        check_levels(levels, self.atom.num_states())?;
        let mut pops: nd::Array1<f64> = nd::Array1::zeros(self.t.len());
        for &l in levels.iter() {
            pops.zip_mut_with(&self.states_t.slice(s![l, l, ..]), |p, r| *p += r.re);
        }
        Ok(pops)
    }

    /// Summed coherence magnitudes `|ρ[i, j]|` of `pairs` over time.
    pub fn coherences(&self, pairs: &[(usize, usize)]) -> MbResult<nd::Array1<f64>> {
        check_pairs(pairs, self.atom.num_states())?;
        let mut coh: nd::Array1<f64> = nd::Array1::zeros(self.t.len());
        for &(i, j) in pairs.iter() {
            coh.zip_mut_with(&self.states_t.slice(s![i, j, ..]), |c, r| *c += r.norm());
        }
        Ok(coh)
    }
}
