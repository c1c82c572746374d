//! Spectral analysis of propagated fields.
//!
//! Field spectra are taken over `t` with the forward FFT convention
//! `F(f) = Σ Ω(t) exp(-i 2π f t)`, and always returned in fft-shifted order
//! (most negative frequency first). Frequencies are in cycles.
//!
//! Also provides the linear susceptibility of a weakly driven two-level
//! medium, with and without Doppler broadening, for comparison against
//! propagated spectra.

use std::f64::consts::PI;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use rustfft::FftPlanner;
use crate::{
    error::{ Error, MbResult },
    mb_solve::MbSolve,
};

/// Sample frequencies of an `n`-point FFT with sample spacing `d`, in
/// standard (unshifted) order.
pub fn fft_freq(n: usize, d: f64) -> nd::Array1<f64> {
    let span = n as f64 * d;
    (0..n)
        .map(|i| {
            let k = if i < (n + 1) / 2 { i as f64 } else { i as f64 - n as f64 };
            k / span
        })
        .collect()
}

/// Rotate `x` so that the zero-frequency entry sits at index `n / 2`.
pub fn fft_shift<T: Clone>(x: &nd::ArrayView1<T>) -> nd::Array1<T> {
    let n = x.len();
    (0..n).map(|i| x[(i + n - n / 2) % n].clone()).collect()
}

/// Fft-shifted sample frequencies for an evenly spaced `tlist`.
pub fn freq_list(tlist: &nd::Array1<f64>) -> nd::Array1<f64> {
    let n = tlist.len();
    if n < 2 { return nd::Array1::zeros(n); }
    let dt = tlist[1] - tlist[0];
    fft_shift(&fft_freq(n, dt).view())
}

/// Fft-shifted spectrum over `t` of one field at every `z`, as a
/// `(len(zlist), len(tlist))` array.
pub fn rabi_freq(omegas_zt: &nd::Array3<C64>, field_idx: usize)
    -> MbResult<nd::Array2<C64>>
{
    let nf = omegas_zt.shape()[0];
    if field_idx >= nf {
        return Err(Error::OutOfRange { what: "field", index: field_idx, len: nf });
    }
    let nt = omegas_zt.shape()[2];
    let fft = FftPlanner::<f64>::new().plan_fft_forward(nt);
    let mut spectra: nd::Array2<C64>
        = nd::Array2::zeros((omegas_zt.shape()[1], nt));
    let field = omegas_zt.slice(s![field_idx, .., ..]);
    for (row, mut out) in field.outer_iter().zip(spectra.outer_iter_mut()) {
        let mut buf: Vec<C64> = row.to_vec();
        fft.process(&mut buf);
        out.assign(&fft_shift(&nd::ArrayView1::from(buf.as_slice())));
    }
    Ok(spectra)
}

fn spectrum_pair(omegas_zt: &nd::Array3<C64>, field_idx: usize, z_idx: usize)
    -> MbResult<(nd::Array1<C64>, nd::Array1<C64>)>
{
    let nz = omegas_zt.shape()[1];
    if z_idx >= nz {
        return Err(Error::OutOfRange { what: "z", index: z_idx, len: nz });
    }
    let spectra = rabi_freq(omegas_zt, field_idx)?;
    Ok((spectra.row(0).to_owned(), spectra.row(z_idx).to_owned()))
}

/// Absorption `-ln(|F_z| / |F_0|)` of one field between the input and slice
/// `z_idx`, per shifted frequency.
pub fn absorption(omegas_zt: &nd::Array3<C64>, field_idx: usize, z_idx: usize)
    -> MbResult<nd::Array1<f64>>
{
    let (f0, fz) = spectrum_pair(omegas_zt, field_idx, z_idx)?;
    Ok(
        f0.iter().zip(fz.iter())
            .map(|(a, b)| -(b.norm() / a.norm()).ln())
            .collect()
    )
}

/// Dispersion `arg F_0 - arg F_z` of one field between the input and slice
/// `z_idx`, per shifted frequency.
pub fn dispersion(omegas_zt: &nd::Array3<C64>, field_idx: usize, z_idx: usize)
    -> MbResult<nd::Array1<f64>>
{
    let (f0, fz) = spectrum_pair(omegas_zt, field_idx, z_idx)?;
    Ok(
        f0.iter().zip(fz.iter())
            .map(|(a, b)| a.arg() - b.arg())
            .collect()
    )
}

/// Linear susceptibility `i g / (Γ/2 - i f)` of a two-level medium with
/// interaction strength `g` and decay rate `gamma`.
pub fn susceptibility_two_linear_known(freq: &nd::Array1<f64>, g: f64, gamma: f64)
    -> nd::Array1<C64>
{
    freq.mapv(|f| C64::i() * g / C64::new(gamma / 2.0, -f))
}

/// Absorption coefficient of the linear two-level susceptibility.
pub fn absorption_two_linear_known(freq: &nd::Array1<f64>, g: f64, gamma: f64)
    -> nd::Array1<f64>
{
    susceptibility_two_linear_known(freq, g, gamma).mapv(|x| x.im / 2.0)
}

/// Phase shift coefficient of the linear two-level susceptibility.
pub fn dispersion_two_linear_known(freq: &nd::Array1<f64>, g: f64, gamma: f64)
    -> nd::Array1<f64>
{
    susceptibility_two_linear_known(freq, g, gamma).mapv(|x| x.re / 2.0)
}

/// Linear two-level susceptibility averaged over a Maxwell-Boltzmann
/// distribution `exp(-(δ/σ)²) / (σ √π)` of detunings with width
/// `thermal_width`.
///
/// The average is done by trapezoid quadrature over `|δ| ≤ 8σ` on a grid
/// fine compared to both `σ` and `Γ`. A zero width gives the unbroadened
/// susceptibility.
pub fn voigt_two_linear_known(
    freq: &nd::Array1<f64>,
    g: f64,
    gamma: f64,
    thermal_width: f64,
) -> nd::Array1<C64>
{
    if thermal_width <= 0.0 {
        return susceptibility_two_linear_known(freq, g, gamma);
    }
    let sigma = thermal_width;
    let h
        = if gamma > 0.0 {
            (sigma / 250.0).min(gamma / 40.0)
        } else {
            sigma / 250.0
        };
    let m = (8.0 * sigma / h).ceil() as usize;
    let deltas = nd::Array1::linspace(-8.0 * sigma, 8.0 * sigma, 2 * m + 1);
    let dd = deltas[1] - deltas[0];
    let weights: nd::Array1<f64>
        = deltas.iter().enumerate()
        .map(|(k, &d)| {
            let q = if k == 0 || k == 2 * m { dd / 2.0 } else { dd };
            q * (-(d / sigma).powi(2)).exp() / (sigma * PI.sqrt())
        })
        .collect();
    let norm: f64 = weights.sum();
    freq.mapv(|f| {
        deltas.iter().zip(weights.iter())
            .map(|(&d, &w)| C64::i() * g / C64::new(gamma / 2.0, -(f - d)) * w)
            .sum::<C64>()
            / norm
    })
}

/// Absorption coefficient of the Doppler-broadened two-level
/// susceptibility.
pub fn absorption_voigt_known(
    freq: &nd::Array1<f64>,
    g: f64,
    gamma: f64,
    thermal_width: f64,
) -> nd::Array1<f64>
{
    voigt_two_linear_known(freq, g, gamma, thermal_width).mapv(|x| x.im / 2.0)
}

impl MbSolve {
    /// Fft-shifted sample frequencies of the solve's time grid.
    pub fn freq_list(&self) -> nd::Array1<f64> { freq_list(self.tlist()) }

    /// See [`rabi_freq`].
    pub fn rabi_freq(&self, field_idx: usize) -> MbResult<nd::Array2<C64>> {
        rabi_freq(self.omegas_zt(), field_idx)
    }

    /// See [`absorption`].
    pub fn absorption(&self, field_idx: usize, z_idx: usize)
        -> MbResult<nd::Array1<f64>>
    {
        absorption(self.omegas_zt(), field_idx, z_idx)
    }

    /// See [`dispersion`].
    pub fn dispersion(&self, field_idx: usize, z_idx: usize)
        -> MbResult<nd::Array1<f64>>
    {
        dispersion(self.omegas_zt(), field_idx, z_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_frequencies() {
        let f = fft_freq(4, 0.5);
        assert_eq!(f, nd::array![0.0, 0.5, -1.0, -0.5]);
        assert_eq!(fft_shift(&f.view()), nd::array![-1.0, -0.5, 0.0, 0.5]);
        let f = fft_freq(5, 1.0);
        assert_eq!(fft_shift(&f.view()), nd::array![-0.4, -0.2, 0.0, 0.2, 0.4]);
        let t = nd::Array1::linspace(0.0, 1.5, 4);
        assert_eq!(freq_list(&t), nd::array![-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn spectrum_of_a_tone() {
        // exp(+i 2π f t) with f = 1 over 8 samples of spacing 1/8
        let nt = 8;
        let mut omegas = nd::Array3::<C64>::zeros((1, 2, nt));
        for k in 0..nt {
            let t = k as f64 / nt as f64;
            omegas[[0, 0, k]] = C64::cis(2.0 * PI * t);
            omegas[[0, 1, k]] = C64::cis(2.0 * PI * t) * 0.5;
        }
        let spectra = rabi_freq(&omegas, 0).unwrap();
        let freqs = fft_freq(nt, 1.0 / nt as f64);
        let freqs = fft_shift(&freqs.view());
        let peak
            = (0..nt)
            .max_by(|&a, &b| spectra[[0, a]].norm().total_cmp(&spectra[[0, b]].norm()))
            .unwrap();
        assert!((freqs[peak] - 1.0).abs() < 1e-12);
        assert!((spectra[[0, peak]].norm() - nt as f64).abs() < 1e-9);

        let abs = absorption(&omegas, 0, 1).unwrap();
        assert!((abs[peak] - 2.0_f64.ln()).abs() < 1e-12);
        let disp = dispersion(&omegas, 0, 1).unwrap();
        assert!(disp[peak].abs() < 1e-12);
        assert!(matches!(absorption(&omegas, 1, 0), Err(Error::OutOfRange { .. })));
        assert!(matches!(absorption(&omegas, 0, 2), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn lorentzian_line_shape() {
        let f = nd::array![-1.0, 0.0, 1.0];
        let abs = absorption_two_linear_known(&f, 1.0, 2.0);
        // g (Γ/2) / ((Γ/2)² + f²) / 2
        assert!((abs[1] - 0.5).abs() < 1e-15);
        assert!((abs[0] - 0.25).abs() < 1e-15);
        assert!((abs[0] - abs[2]).abs() < 1e-15);
        let disp = dispersion_two_linear_known(&f, 1.0, 2.0);
        assert!(disp[1].abs() < 1e-15);
        assert!((disp[0] + disp[2]).abs() < 1e-15);
    }

    #[test]
    fn voigt_limits() {
        let f = nd::Array1::linspace(-2.0, 2.0, 9);
        let lorentz = susceptibility_two_linear_known(&f, 0.5, 1.0);
        let zero_width = voigt_two_linear_known(&f, 0.5, 1.0, 0.0);
        assert_eq!(lorentz, zero_width);
        let narrow = voigt_two_linear_known(&f, 0.5, 1.0, 1e-3);
        lorentz.iter().zip(narrow.iter())
            .for_each(|(a, b)| assert!((a - b).norm() < 1e-5));

        // broadening lowers the peak and preserves the integrated absorption
        let wide = absorption_voigt_known(&f, 0.5, 1.0, 0.5);
        let bare = absorption_two_linear_known(&f, 0.5, 1.0);
        assert!(wide[4] < bare[4]);
        assert!((wide[0] - wide[8]).abs() < 1e-12);
    }
}
