//! Numerical integration of the Lindblad equation for a single atom.
//!
//! The last index of a 3D state array corresponds to time, all Hamiltonians
//! and decay rates are in units of angular frequency, and integration is via
//! fourth-order Runge-Kutta.

use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::atom::Atom;

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the non-Hermitian part of the RHS of the Lindblad master equation.
///
/// `Y` is a matrix of decay rates: the `(a, b)`-th entry is the rate from state
/// `a` into state `b`. A nonzero diagonal entry `(a, a)` dephases every
/// coherence involving `a`.
pub fn lindbladian<SA, SB>(
    Y: &nd::ArrayBase<SA, nd::Ix2>,
    rho: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = f64>,
    SB: nd::Data<Elem = C64>,
{
    let mut L: nd::Array2<C64> = nd::Array2::zeros(rho.raw_dim());
    let mut term: C64;
    for ((a, b), &y) in Y.indexed_iter() {
        if y.abs() <= f64::EPSILON { continue; }
        for ((i, j), l) in L.indexed_iter_mut() {
            term
                = if i == j {
                    y * (
                        if i == b { rho[[a, a]] } else { C64::zero() }
                        - if i == a { rho[[a, a]] } else { C64::zero() }
                    )
                } else {
                    -y * if i == a || j == a
                        { rho[[i, j]] / 2.0 } else { C64::zero() }
                };
            *l += term;
        }
    }
    L
}

fn rhs(H: &nd::Array2<C64>, Y: &nd::Array2<f64>, rho: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    -C64::i() * commutator(H, rho) + lindbladian(Y, rho)
}

fn trace(rho: &nd::Array2<C64>) -> C64 { rho.diag().sum() }

// fourth-order Runge-Kutta for a time-dependent Hamiltonian, taking `substeps`
// steps per interval of `t` and recording the state only at the points of `t`
fn do_evolve_fn<H, F>(
    rho0: &nd::Array2<C64>,
    h: H,
    rhs: F,
    t: &nd::Array1<f64>,
    substeps: usize,
) -> nd::Array3<C64>
where
    H: Fn(f64) -> nd::Array2<C64>,
    F: Fn(&nd::Array2<C64>, &nd::Array2<C64>) -> nd::Array2<C64>,
{
    let n = t.len();
    let (a, b) = rho0.dim();
    let substeps = substeps.max(1);
    let mut rho: nd::Array3<C64> = nd::Array3::zeros((a, b, n));
    if n == 0 { return rho; }
    let mut rho_old: nd::Array2<C64> = rho0.clone();
    let mut hk: nd::Array2<C64>;
    let mut hkp1h: nd::Array2<C64>;
    let mut hkp1: nd::Array2<C64>;
    let mut k1: nd::Array2<C64>;
    let mut k2: nd::Array2<C64>;
    let mut k3: nd::Array2<C64>;
    let mut k4: nd::Array2<C64>;
    let mut rho_new: nd::Array2<C64>;
    let mut norm: C64;
    let mut tk: f64;
    rho.slice_mut(s![.., .., 0]).assign(rho0);
    let iter = t.iter().zip(t.iter().skip(1)).enumerate();
    for (k, (&t0, &t1)) in iter {
        let dtk = (t1 - t0) / substeps as f64;
        for m in 0..substeps {
            tk = if m == 0 { t0 } else { t0 + dtk * m as f64 };
            hk = h(tk);
            hkp1h = h(tk + dtk / 2.0);
            hkp1 = if m + 1 == substeps { h(t1) } else { h(tk + dtk) };
            k1 = rhs(&hk, &rho_old);
            k2 = rhs(&hkp1h, &(&rho_old + &k1 * (dtk / 2.0)));
            k3 = rhs(&hkp1h, &(&rho_old + &k2 * (dtk / 2.0)));
            k4 = rhs(&hkp1, &(&rho_old + &k3 * dtk));
            rho_new = &rho_old + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dtk / 6.0);
            norm = trace(&rho_new);
            rho_old = rho_new / norm;
        }
        rho.slice_mut(s![.., .., k + 1]).assign(&rho_old);
    }
    rho
}

/// Numerically integrate the Lindblad equation for a time-dependent
/// Hamiltonian.
///
/// See also [`lindbladian`] for info on the decay coupling matrix `Y`.
pub fn evolve_fn<H>(
    rho0: &nd::Array2<C64>,
    h: H,
    Y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
    substeps: usize,
) -> nd::Array3<C64>
where H: Fn(f64) -> nd::Array2<C64>
{
    do_evolve_fn(rho0, h, |hk, rho| rhs(hk, Y, rho), t, substeps)
}

/// Propagates an [`Atom`]'s density matrix through time under externally
/// supplied field values.
#[derive(Copy, Clone, Debug)]
pub struct AtomicPropagator<'a> {
    atom: &'a Atom,
    substeps: usize,
}

impl<'a> AtomicPropagator<'a> {
    pub fn new(atom: &'a Atom, substeps: usize) -> Self {
        Self { atom, substeps: substeps.max(1) }
    }

    pub fn atom(&self) -> &Atom { self.atom }

    /// Evolve the atom's initial state over `t`.
    ///
    /// `omegas` gives the angular Rabi frequency of every field at an
    /// arbitrary time; `shift` offsets every field's detuning (in cycles).
    /// Returns an `(n, n, len(t))` array.
    pub fn evolve<F>(&self, omegas: F, t: &nd::Array1<f64>, shift: f64)
        -> nd::Array3<C64>
    where F: Fn(f64) -> nd::Array1<C64>
    {
        let H_static = self.atom.H_static(shift);
        evolve_fn(
            self.atom.initial_state(),
            |tk| self.atom.hamiltonian(&H_static, &omegas(tk)),
            self.atom.decay_matrix(),
            t,
            self.substeps,
        )
    }
}
