//! Time-envelope functions for field Rabi frequencies.
//!
//! Each envelope is dimensionless except for its amplitude, which is in cycles;
//! the angular Rabi frequency seen by an atom is `2π * rabi_freq * f(t)`.

use std::{ collections::BTreeMap, f64::consts::{ LN_2, PI } };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ MbResult, config_err },
    spline::CubicSpline,
};

/// Ratio of a sech pulse's width parameter to its full width at half maximum.
pub const SECH_FWHM_CONV: f64 = 1.0 / 2.6339157938;

/// A single argument value as given in a configuration table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TArg {
    Scalar(f64),
    List(Vec<f64>),
}

pub type TArgs = BTreeMap<String, TArg>;

/// A closed-form pulse shape or a sampled curve.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeFunc {
    Square { on: f64, off: f64, ampl: f64 },
    Gaussian { centre: f64, fwhm: f64, ampl: f64 },
    Sech { centre: f64, width: f64, ampl: f64 },
    RampOn { on: f64, fwhm: f64, ampl: f64 },
    RampOff { off: f64, fwhm: f64, ampl: f64 },
    RampOnOff { on: f64, off: f64, fwhm: f64, ampl: f64 },
    RampOffOn { off: f64, on: f64, fwhm: f64, ampl: f64 },
    Sinc { width: f64, ampl: f64 },
    /// Cubic interpolant through complex samples, zero outside the sample
    /// range.
    Intp(CubicSpline),
}

impl Default for TimeFunc {
    fn default() -> Self { Self::Square { on: 0.0, off: 1.0, ampl: 1.0 } }
}

fn gauss(x: f64, fwhm: f64) -> f64 { (-4.0 * LN_2 * (x / fwhm).powi(2)).exp() }

fn ramp_on(t: f64, on: f64, fwhm: f64) -> f64 {
    if t <= on { gauss(t - on, fwhm) } else { 1.0 }
}

fn ramp_off(t: f64, off: f64, fwhm: f64) -> f64 {
    if t >= off { gauss(t - off, fwhm) } else { 1.0 }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) }
}

impl TimeFunc {
    /// Configuration name of the function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Square { .. } => "square",
            Self::Gaussian { .. } => "gaussian",
            Self::Sech { .. } => "sech",
            Self::RampOn { .. } => "ramp_on",
            Self::RampOff { .. } => "ramp_off",
            Self::RampOnOff { .. } => "ramp_onoff",
            Self::RampOffOn { .. } => "ramp_offon",
            Self::Sinc { .. } => "sinc",
            Self::Intp(_) => "intp",
        }
    }

    /// Gaussian pulse whose area, with `rabi_freq = 1`, is `n_pi * π`.
    pub fn gaussian_n_pi(centre: f64, fwhm: f64, n_pi: f64) -> Self {
        let ampl = n_pi * (4.0 * PI * LN_2 / fwhm.powi(2)).sqrt() / (2.0 * PI);
        Self::Gaussian { centre, fwhm, ampl }
    }

    /// Sech pulse whose area, with `rabi_freq = 1`, is `n_pi * π`.
    pub fn sech_n_pi(centre: f64, width: f64, n_pi: f64) -> Self {
        let ampl = n_pi / width / (2.0 * PI);
        Self::Sech { centre, width, ampl }
    }

    /// Interpolant through complex samples.
    pub fn intp(tlist: &nd::Array1<f64>, ylist: &nd::Array1<C64>)
        -> MbResult<Self>
    {
        Ok(Self::Intp(CubicSpline::from_arrays(tlist, ylist)?))
    }

    pub fn eval(&self, t: f64) -> C64 {
        let re: f64
            = match *self {
                Self::Square { on, off, ampl }
                    => if on <= t && t <= off { ampl } else { 0.0 },
                Self::Gaussian { centre, fwhm, ampl }
                    => ampl * gauss(t - centre, fwhm),
                Self::Sech { centre, width, ampl }
                    => ampl / ((t - centre) / width).cosh(),
                Self::RampOn { on, fwhm, ampl }
                    => ampl * ramp_on(t, on, fwhm),
                Self::RampOff { off, fwhm, ampl }
                    => ampl * ramp_off(t, off, fwhm),
                Self::RampOnOff { on, off, fwhm, ampl }
                    => ampl * (ramp_on(t, on, fwhm) + ramp_off(t, off, fwhm) - 1.0),
                Self::RampOffOn { off, on, fwhm, ampl }
                    => ampl * (ramp_on(t, on, fwhm) + ramp_off(t, off, fwhm)),
                Self::Sinc { width, ampl }
                    => ampl * sinc(width * t) / (PI / 2.0).sqrt(),
                Self::Intp(ref spline) => { return spline.evaluate(t); },
            };
        C64::new(re, 0.0)
    }

    pub fn eval_list(&self, t: &nd::Array1<f64>) -> nd::Array1<C64> {
        t.mapv(|tk| self.eval(tk))
    }

    /// Build a time function from its configuration name and argument table.
    ///
    /// Missing, conflicting, or unknown arguments are reported as
    /// [`Error::Config`][crate::error::Error::Config].
    pub fn from_args(name: &str, args: &TArgs) -> MbResult<Self> {
        let mut reader = ArgReader::new(name, args);
        let func
            = match name {
                "square" => Self::Square {
                    on: reader.scalar("on")?,
                    off: reader.scalar("off")?,
                    ampl: reader.scalar("ampl")?,
                },
                "gaussian" => {
                    let centre = reader.scalar("centre")?;
                    let fwhm = reader.positive("fwhm")?;
                    match reader.one_of("ampl", "n_pi")? {
                        OneOf::First(ampl) => Self::Gaussian { centre, fwhm, ampl },
                        OneOf::Second(n_pi) => Self::gaussian_n_pi(centre, fwhm, n_pi),
                    }
                },
                "sech" => {
                    let centre = reader.scalar("centre")?;
                    let width
                        = match reader.one_of("width", "fwhm")? {
                            OneOf::First(w) => w,
                            OneOf::Second(fwhm) => fwhm * SECH_FWHM_CONV,
                        };
                    if width <= 0.0 {
                        return Err(config_err("sech: width must be positive"));
                    }
                    match reader.one_of("ampl", "n_pi")? {
                        OneOf::First(ampl) => Self::Sech { centre, width, ampl },
                        OneOf::Second(n_pi) => Self::sech_n_pi(centre, width, n_pi),
                    }
                },
                "ramp_on" => Self::RampOn {
                    on: reader.scalar("on")?,
                    fwhm: reader.positive("fwhm")?,
                    ampl: reader.scalar("ampl")?,
                },
                "ramp_off" => Self::RampOff {
                    off: reader.scalar("off")?,
                    fwhm: reader.positive("fwhm")?,
                    ampl: reader.scalar("ampl")?,
                },
                "ramp_onoff" => Self::RampOnOff {
                    on: reader.scalar("on")?,
                    off: reader.scalar("off")?,
                    fwhm: reader.positive("fwhm")?,
                    ampl: reader.scalar("ampl")?,
                },
                "ramp_offon" => Self::RampOffOn {
                    off: reader.scalar("off")?,
                    on: reader.scalar("on")?,
                    fwhm: reader.positive("fwhm")?,
                    ampl: reader.scalar("ampl")?,
                },
                "sinc" => Self::Sinc {
                    width: reader.scalar("width")?,
                    ampl: reader.scalar("ampl")?,
                },
                "intp" => {
                    let tlist = reader.list("tlist")?;
                    let re = reader.list("ylist")?;
                    let im = reader.optional_list("ylist_im")?
                        .unwrap_or_else(|| vec![0.0; re.len()]);
                    if im.len() != re.len() {
                        return Err(config_err(
                            "intp: ylist and ylist_im differ in length"));
                    }
                    let ylist: Vec<C64>
                        = re.into_iter().zip(im)
                        .map(|(r, i)| C64::new(r, i))
                        .collect();
                    Self::Intp(CubicSpline::new(tlist, ylist)?)
                },
                other => {
                    return Err(config_err(
                        format!("unknown time function '{}'", other)));
                },
            };
        reader.finish()?;
        Ok(func)
    }

    /// Argument table that [`Self::from_args`] maps back onto `self`.
    pub fn to_args(&self) -> TArgs {
        use TArg::*;
        let pairs: Vec<(&str, TArg)>
            = match self {
                Self::Square { on, off, ampl } => vec![
                    ("on", Scalar(*on)), ("off", Scalar(*off)), ("ampl", Scalar(*ampl)),
                ],
                Self::Gaussian { centre, fwhm, ampl } => vec![
                    ("centre", Scalar(*centre)), ("fwhm", Scalar(*fwhm)),
                    ("ampl", Scalar(*ampl)),
                ],
                Self::Sech { centre, width, ampl } => vec![
                    ("centre", Scalar(*centre)), ("width", Scalar(*width)),
                    ("ampl", Scalar(*ampl)),
                ],
                Self::RampOn { on, fwhm, ampl } => vec![
                    ("on", Scalar(*on)), ("fwhm", Scalar(*fwhm)), ("ampl", Scalar(*ampl)),
                ],
                Self::RampOff { off, fwhm, ampl } => vec![
                    ("off", Scalar(*off)), ("fwhm", Scalar(*fwhm)), ("ampl", Scalar(*ampl)),
                ],
                Self::RampOnOff { on, off, fwhm, ampl } => vec![
                    ("on", Scalar(*on)), ("off", Scalar(*off)),
                    ("fwhm", Scalar(*fwhm)), ("ampl", Scalar(*ampl)),
                ],
                Self::RampOffOn { off, on, fwhm, ampl } => vec![
                    ("off", Scalar(*off)), ("on", Scalar(*on)),
                    ("fwhm", Scalar(*fwhm)), ("ampl", Scalar(*ampl)),
                ],
                Self::Sinc { width, ampl } => vec![
                    ("width", Scalar(*width)), ("ampl", Scalar(*ampl)),
                ],
                Self::Intp(spline) => vec![
                    ("tlist", List(spline.knots().to_vec())),
                    ("ylist", List(spline.values().iter().map(|y| y.re).collect())),
                    ("ylist_im", List(spline.values().iter().map(|y| y.im).collect())),
                ],
            };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

enum OneOf {
    First(f64),
    Second(f64),
}

// tracks which arguments were consumed so that leftovers can be reported
struct ArgReader<'a> {
    name: &'a str,
    args: &'a TArgs,
    used: Vec<&'a str>,
}

impl<'a> ArgReader<'a> {
    fn new(name: &'a str, args: &'a TArgs) -> Self {
        Self { name, args, used: Vec::new() }
    }

    fn optional_scalar(&mut self, key: &'a str) -> MbResult<Option<f64>> {
        match self.args.get(key) {
            None => Ok(None),
            Some(TArg::Scalar(x)) => { self.used.push(key); Ok(Some(*x)) },
            Some(TArg::List(_)) => Err(config_err(format!(
                "{}: argument '{}' must be a number", self.name, key))),
        }
    }

    fn scalar(&mut self, key: &'a str) -> MbResult<f64> {
        self.optional_scalar(key)?
            .ok_or_else(|| config_err(format!(
                "{}: missing argument '{}'", self.name, key)))
    }

    fn positive(&mut self, key: &'a str) -> MbResult<f64> {
        let x = self.scalar(key)?;
        if x > 0.0 {
            Ok(x)
        } else {
            Err(config_err(format!(
                "{}: argument '{}' must be positive", self.name, key)))
        }
    }

    /// Exactly one of `a` or `b` must be present.
    fn one_of(&mut self, a: &'a str, b: &'a str) -> MbResult<OneOf> {
        let xa = self.optional_scalar(a)?;
        let xb = self.optional_scalar(b)?;
        match (xa, xb) {
            (Some(_), Some(_)) => Err(config_err(format!(
                "{}: can contain '{}' or '{}', not both", self.name, a, b))),
            (None, None) => Err(config_err(format!(
                "{}: must contain '{}' or '{}'", self.name, a, b))),
            (Some(x), None) => Ok(OneOf::First(x)),
            (None, Some(x)) => Ok(OneOf::Second(x)),
        }
    }

    fn optional_list(&mut self, key: &'a str) -> MbResult<Option<Vec<f64>>> {
        match self.args.get(key) {
            None => Ok(None),
            Some(TArg::List(v)) => { self.used.push(key); Ok(Some(v.clone())) },
            Some(TArg::Scalar(_)) => Err(config_err(format!(
                "{}: argument '{}' must be a list", self.name, key))),
        }
    }

    fn list(&mut self, key: &'a str) -> MbResult<Vec<f64>> {
        self.optional_list(key)?
            .ok_or_else(|| config_err(format!(
                "{}: missing argument '{}'", self.name, key)))
    }

    fn finish(self) -> MbResult<()> {
        let unknown: Vec<&String>
            = self.args.keys()
            .filter(|k| !self.used.contains(&k.as_str()))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(config_err(format!(
                "{}: unexpected arguments {:?}", self.name, unknown)))
        }
    }
}
