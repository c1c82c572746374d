#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Coupled Maxwell-Bloch propagation of optical fields through a medium of
//! multilevel atoms, with optional Doppler averaging over velocity classes.

pub mod error;
pub mod grid;
pub mod spline;
pub mod t_funcs;
pub mod config;
pub mod angmom;
pub mod atom;
pub mod rabi;
pub mod ob_solve;
pub mod maxwell;
pub mod thermal;
pub mod store;
pub mod mb_solve;
pub mod analysis;
pub mod spectral;

pub use error::{ Error, MbResult };
pub use config::{
    AtomConfig,
    DecayConfig,
    FieldConfig,
    MbSolveConfig,
    ObSolveConfig,
    SolveOpts,
    VelocityClassesConfig,
};
pub use atom::{ Atom, Field };
pub use t_funcs::{ TArg, TArgs, TimeFunc };
pub use ob_solve::ObSolve;
pub use maxwell::Step;
pub use thermal::VelocityClass;
pub use store::{ CacheRecord, ResultsStore };
pub use mb_solve::MbSolve;
