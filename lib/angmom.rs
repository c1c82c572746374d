//! Angular momentum coupling coefficients for hyperfine dipole transitions.
//!
//! Quantum numbers are taken as `f64` and must be integers or half-integers;
//! internally they are carried as `i32` numbers of halves, which is what the
//! Wigner symbol evaluators work with.

use wigner_symbols::{ Wigner3jm, Wigner6j };
use crate::error::{ MbResult, config_err };

// number of halves in `x`
fn halves(x: f64, what: &str) -> MbResult<i32> {
    let tx = 2.0 * x;
    if !tx.is_finite() || tx.fract() != 0.0 || tx.abs() > i32::MAX as f64 {
        return Err(config_err(format!(
            "{} = {} is not an integer or half-integer", what, x)));
    }
    Ok(tx as i32)
}

fn total_halves(j: f64, what: &str) -> MbResult<i32> {
    let tj = halves(j, what)?;
    if tj < 0 {
        return Err(config_err(format!("{} = {} is negative", what, j)));
    }
    Ok(tj)
}

// (-1)^(tx / 2) for an even number of halves `tx`
fn phase(tx: i32, what: &str) -> MbResult<f64> {
    if tx.rem_euclid(2) != 0 {
        return Err(config_err(format!(
            "phase exponent {} for {} is not an integer", tx as f64 / 2.0, what)));
    }
    Ok(if (tx / 2).rem_euclid(2) == 0 { 1.0 } else { -1.0 })
}

fn triangle(ta: i32, tb: i32, tc: i32) -> bool {
    tc <= ta + tb && tc >= (ta - tb).abs() && (ta + tb + tc) % 2 == 0
}

/// Wigner 3j symbol
/// ```text
/// ( j1 j2 j3 )
/// ( m1 m2 m3 )
/// ```
///
/// Zero whenever the selection rules fail. Arguments that are not integers or
/// half-integers are an error.
pub fn wigner_3j(j1: f64, j2: f64, j3: f64, m1: f64, m2: f64, m3: f64)
    -> MbResult<f64>
{
    let tj1 = total_halves(j1, "j1")?;
    let tj2 = total_halves(j2, "j2")?;
    let tj3 = total_halves(j3, "j3")?;
    let tm1 = halves(m1, "m1")?;
    let tm2 = halves(m2, "m2")?;
    let tm3 = halves(m3, "m3")?;
    let allowed
        = tm1 + tm2 + tm3 == 0
        && [(tj1, tm1), (tj2, tm2), (tj3, tm3)].into_iter()
            .all(|(tj, tm)| tm.abs() <= tj && (tj - tm) % 2 == 0)
        && tj3 <= tj1 + tj2
        && tj3 >= (tj1 - tj2).abs();
    if !allowed { return Ok(0.0); }
    Ok(Wigner3jm { tj1, tm1, tj2, tm2, tj3, tm3 }.value().into())
}

/// Wigner 6j symbol
/// ```text
/// { j1 j2 j3 }
/// { J1 J2 J3 }
/// ```
///
/// Zero unless all four triads `(j1 j2 j3)`, `(j1 J2 J3)`, `(J1 j2 J3)`, and
/// `(J1 J2 j3)` satisfy the triangle rule with an integer sum.
pub fn wigner_6j(j1: f64, j2: f64, j3: f64, J1: f64, J2: f64, J3: f64)
    -> MbResult<f64>
{
    let tj1 = total_halves(j1, "j1")?;
    let tj2 = total_halves(j2, "j2")?;
    let tj3 = total_halves(j3, "j3")?;
    let tj4 = total_halves(J1, "J1")?;
    let tj5 = total_halves(J2, "J2")?;
    let tj6 = total_halves(J3, "J3")?;
    let allowed
        = triangle(tj1, tj2, tj3)
        && triangle(tj1, tj5, tj6)
        && triangle(tj4, tj2, tj6)
        && triangle(tj4, tj5, tj3);
    if !allowed { return Ok(0.0); }
    Ok(Wigner6j { tj1, tj2, tj3, tj4, tj5, tj6 }.value().into())
}

/// Clebsch-Gordan coefficient of the dipole matrix element between hyperfine
/// sublevels `|J_a I_a F_a mF_a>` and `|J_b I_b F_b mF_b>` for polarization
/// `q` in `{-1, 0, 1}`.
///
/// The coefficient is the product of the `F -> F'` reduction factor
/// ```text
/// (-1)^(F_b + J_a + 1 + I_a) sqrt((2 F_b + 1)(2 J_a + 1)) { J_a J_b 1 ; F_b F_a I_a }
/// ```
/// and the sublevel factor
/// ```text
/// (-1)^(F_b - 1 + mF_a) sqrt(2 F_a + 1) ( F_b 1 F_a ; mF_b q -mF_a )
/// ```
/// so it is nonzero only for `mF_b + q = mF_a`. The nuclear spin of the upper
/// level only enters through `F_b`, so `I_b` is validated but otherwise unused.
pub fn calc_clebsch_hf(
    J_a: f64,
    I_a: f64,
    F_a: f64,
    mF_a: f64,
    J_b: f64,
    I_b: f64,
    F_b: f64,
    mF_b: f64,
    q: f64,
) -> MbResult<f64>
{
    let tJ_a = total_halves(J_a, "J_a")?;
    let tI_a = total_halves(I_a, "I_a")?;
    let tF_a = total_halves(F_a, "F_a")?;
    let tmF_a = halves(mF_a, "mF_a")?;
    total_halves(J_b, "J_b")?;
    total_halves(I_b, "I_b")?;
    let tF_b = total_halves(F_b, "F_b")?;
    let tq = halves(q, "q")?;
    if tq.abs() > 2 || tq % 2 != 0 {
        return Err(config_err(format!("polarization q = {} is not -1, 0, or 1", q)));
    }

    let coeff_F
        = match wigner_6j(J_a, J_b, 1.0, F_b, F_a, I_a)? {
            w if w == 0.0 => return Ok(0.0),
            w => {
                phase(tF_b + tJ_a + 2 + tI_a, "the F reduction factor")?
                    * (((tF_b + 1) * (tJ_a + 1)) as f64).sqrt()
                    * w
            },
        };
    let coeff_hf
        = match wigner_3j(F_b, 1.0, F_a, mF_b, q, -mF_a)? {
            w if w == 0.0 => return Ok(0.0),
            w => {
                phase(tF_b - 2 + tmF_a, "the sublevel factor")?
                    * ((tF_a + 1) as f64).sqrt()
                    * w
            },
        };
    Ok(coeff_hf * coeff_F)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::error::Error;

    // Rb-87 D2 line: 5S1/2 -> 5P3/2, I = 3/2
    const J_G: f64 = 0.5;
    const J_E: f64 = 1.5;
    const I: f64 = 1.5;

    fn d2(F_a: f64, mF_a: f64, F_b: f64, mF_b: f64, q: f64) -> f64 {
        calc_clebsch_hf(J_G, I, F_a, mF_a, J_E, I, F_b, mF_b, q).unwrap()
    }

    #[test]
    fn known_3j_symbols() {
        assert_abs_diff_eq!(
            wigner_3j(1.0, 1.0, 0.0, 0.0, 0.0, 0.0).unwrap(),
            -1.0 / 3.0_f64.sqrt(),
            epsilon = 1e-12,
        );
        assert_abs_diff_eq!(
            wigner_3j(0.5, 0.5, 1.0, 0.5, -0.5, 0.0).unwrap(),
            1.0 / 6.0_f64.sqrt(),
            epsilon = 1e-12,
        );
        // projections don't sum to zero
        assert_eq!(wigner_3j(1.0, 1.0, 1.0, 1.0, 1.0, 0.0).unwrap(), 0.0);
        // |m| > j
        assert_eq!(wigner_3j(1.0, 1.0, 2.0, 2.0, -1.0, -1.0).unwrap(), 0.0);
        // j3 outside |j1 - j2|..j1 + j2
        assert_eq!(wigner_3j(1.0, 1.0, 3.0, 0.0, 0.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn known_6j_symbols() {
        assert_abs_diff_eq!(
            wigner_6j(1.0, 1.0, 1.0, 1.0, 1.0, 1.0).unwrap(),
            1.0 / 6.0,
            epsilon = 1e-12,
        );
        assert_abs_diff_eq!(
            wigner_6j(0.5, 1.5, 1.0, 3.0, 2.0, 1.5).unwrap(),
            1.0 / 20.0_f64.sqrt(),
            epsilon = 1e-12,
        );
        assert_eq!(wigner_6j(0.5, 1.5, 1.0, 0.0, 2.0, 1.5).unwrap(), 0.0);
        // half-integer triad sum
        assert_eq!(wigner_6j(0.5, 0.5, 0.5, 0.5, 0.5, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn non_half_integers_are_rejected() {
        assert!(matches!(wigner_3j(0.3, 1.0, 1.0, 0.0, 0.0, 0.0), Err(Error::Config(_))));
        assert!(matches!(wigner_6j(1.0, 1.0, 1.0, 1.0, 1.0, 0.25), Err(Error::Config(_))));
        assert!(matches!(wigner_6j(-1.0, 1.0, 1.0, 1.0, 1.0, 1.0), Err(Error::Config(_))));
        assert!(matches!(
            calc_clebsch_hf(J_G, I, 2.0, 2.0, J_E, I, 3.0, 3.0, 2.0),
            Err(Error::Config(_)),
        ));
        assert!(matches!(
            calc_clebsch_hf(J_G, I, 2.0, 2.0, J_E, f64::NAN, 3.0, 3.0, -1.0),
            Err(Error::Config(_)),
        ));
    }

    #[test]
    fn cycling_transition() {
        assert_abs_diff_eq!(d2(2.0, 2.0, 3.0, 3.0, -1.0), 0.5_f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(d2(2.0, -2.0, 3.0, -3.0, 1.0).abs(), 0.5_f64.sqrt(), epsilon = 1e-12);
        // wrong polarization
        assert_eq!(d2(2.0, 2.0, 3.0, 3.0, 1.0), 0.0);
        assert_eq!(d2(2.0, 2.0, 3.0, 3.0, 0.0), 0.0);
    }

    #[test]
    fn hyperfine_strength_factors() {
        // sum over upper sublevels and polarizations of c^2 is the relative
        // strength of F_a -> F_b, independent of mF_a
        let expected = [
            (1.0, [1.0 / 6.0, 5.0 / 12.0, 5.0 / 12.0, 0.0]),
            (2.0, [0.0, 0.05, 0.25, 0.7]),
        ];
        for (F_a, strengths) in expected {
            let mut mF_a = -F_a;
            while mF_a <= F_a {
                let mut total = 0.0;
                for (F_b, &s) in strengths.iter().enumerate() {
                    let F_b = F_b as f64;
                    let mut sum = 0.0;
                    let mut mF_b = -F_b;
                    while mF_b <= F_b {
                        for q in [-1.0, 0.0, 1.0] {
                            sum += d2(F_a, mF_a, F_b, mF_b, q).powi(2);
                        }
                        mF_b += 1.0;
                    }
                    assert_abs_diff_eq!(sum, s, epsilon = 1e-12);
                    total += sum;
                }
                assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
                mF_a += 1.0;
            }
        }
    }
}
