//! Error type shared by all solver stages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed atom topology, time function, grid, or solver setting.
    ///
    /// Always raised while building a solver, never partway through a solve.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Thermal weighting evaluated outside its domain (e.g. zero width with a
    /// nonzero detuning spread).
    #[error("numerical domain error: {0}")]
    NumericalDomain(String),

    /// Post-processing selector out of range.
    #[error("{what} index {index} out of range for length {len}")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Stored record is malformed or was produced by another configuration.
    #[error("results store: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read npz archive: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("failed to write npz archive: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    #[error("failed to parse configuration: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type MbResult<T> = Result<T, Error>;

/// Shorthand for building an [`Error::Config`].
pub(crate) fn config_err<S: Into<String>>(msg: S) -> Error {
    Error::Config(msg.into())
}
