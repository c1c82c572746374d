//! Post-processing of solve results: pulse areas, populations, and
//! coherences over the `(z, t)` grid.

use ndarray::{ self as nd, s };
use num_traits::Zero;
use crate::{
    atom::Field,
    error::{ Error, MbResult },
    mb_solve::MbSolve,
    ob_solve::{ check_levels, check_pairs },
};

/// Apply trapezoidal rule to a 1D array sampled at even intervals.
pub(crate) fn trapz<A>(y: &nd::ArrayView1<A>, dx: f64) -> A
where A: Clone + Zero + std::ops::Add<Output = A> + std::ops::Mul<f64, Output = A>
{
    let n: usize = y.len();
    if n < 2 { return A::zero(); }
    y[0].clone() * (dx * 0.5)
        + y.slice(s![1..n - 1]).sum() * dx
        + y[n - 1].clone() * (dx * 0.5)
}

impl MbSolve {
    fn field(&self, field_idx: usize) -> MbResult<&Field> {
        let fields = self.atom().fields();
        fields.get(field_idx)
            .ok_or(Error::OutOfRange { what: "field", index: field_idx, len: fields.len() })
    }

    /// Pulse area `∫ |Ω| dt` of every field at every `z`, as a
    /// `(num_fields, len(zlist))` array.
    pub fn fields_area(&self) -> nd::Array2<f64> {
        let dt = self.t_step();
        let abs = self.omegas_zt().mapv(|w| w.norm());
        abs.map_axis(nd::Axis(2), |row| trapz(&row, dt))
    }

    /// Summed populations of `levels`, as a `(len(zlist), len(tlist))`
    /// array.
    pub fn populations(&self, levels: &[usize]) -> MbResult<nd::Array2<f64>> {
        check_levels(levels, self.atom().num_states())?;
        let states = self.states_zt();
        let mut pops: nd::Array2<f64>
            = nd::Array2::zeros((states.shape()[1], states.shape()[2]));
        for &l in levels.iter() {
            pops.zip_mut_with(
                &states.slice(s![self.element(l, l), .., ..]),
                |p, r| { *p += r.re; },
            );
        }
        Ok(pops)
    }

    /// Summed populations of the distinct upper (or lower) levels coupled by
    /// a field.
    pub fn populations_field(&self, field_idx: usize, upper: bool)
        -> MbResult<nd::Array2<f64>>
    {
        let levels = self.field(field_idx)?.levels(upper);
        self.populations(&levels)
    }

    /// Summed coherence magnitudes `|ρ[i, j]|` of `pairs`, as a
    /// `(len(zlist), len(tlist))` array.
    pub fn coherences(&self, pairs: &[(usize, usize)]) -> MbResult<nd::Array2<f64>> {
        check_pairs(pairs, self.atom().num_states())?;
        let states = self.states_zt();
        let mut coh: nd::Array2<f64>
            = nd::Array2::zeros((states.shape()[1], states.shape()[2]));
        for &(i, j) in pairs.iter() {
            coh.zip_mut_with(
                &states.slice(s![self.element(i, j), .., ..]),
                |c, r| { *c += r.norm(); },
            );
        }
        Ok(coh)
    }

    /// Summed coherence magnitudes over the pairs coupled by a field.
    pub fn coherences_field(&self, field_idx: usize) -> MbResult<nd::Array2<f64>> {
        let pairs = self.field(field_idx)?.coupled_levels.clone();
        self.coherences(&pairs)
    }
}
