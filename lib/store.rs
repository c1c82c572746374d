//! Persistent storage of solve results, keyed by configuration identity.
//!
//! Records are `.npz` archives holding the field tensor, the state tensor, and
//! the identity of the configuration that produced them. Writes go through a
//! temporary file in the same directory followed by a rename, so a reader
//! never sees a partially written record.

use std::{
    fs,
    path::{ Path, PathBuf },
    sync::atomic::{ AtomicUsize, Ordering },
};
use ndarray::{ self as nd, OwnedRepr };
use ndarray_npy::{ NpzReader, NpzWriter };
use num_complex::Complex64 as C64;
use sha2::{ Digest, Sha256 };
use crate::{
    config::{ MbSolveConfig, ObSolveConfig },
    error::{ Error, MbResult },
    maxwell::Step,
};

static TMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn hex_digest(config_toml: &str, tag: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_toml.as_bytes());
    hasher.update(b"\n");
    hasher.update(tag.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hex digest identifying every input that affects a Maxwell-Bloch solve's
/// result.
pub fn config_identity(config: &MbSolveConfig, step: Step) -> MbResult<String> {
    Ok(hex_digest(&config.to_toml_string()?, &format!("step = {}", step.name())))
}

/// Hex digest identifying every input that affects a single-point solve's
/// result.
///
/// Never equal to a [`config_identity`], so both kinds of record can share a
/// store.
pub fn ob_config_identity(config: &ObSolveConfig) -> MbResult<String> {
    Ok(hex_digest(&config.to_toml_string()?, "solve = ob"))
}

/// Result tensors of one solve, tagged with their configuration identity.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheRecord {
    pub identity: String,
    /// `(field, z, t)` angular Rabi frequencies.
    pub omegas_zt: nd::Array3<C64>,
    /// `(density-matrix element, z, t)` atomic states.
    pub states_zt: nd::Array3<C64>,
}

/// A directory of [`CacheRecord`]s.
#[derive(Clone, Debug)]
pub struct ResultsStore {
    dir: PathBuf,
}

fn read_named<S, D>(npz: &mut NpzReader<fs::File>, names: &[String], name: &str)
    -> MbResult<nd::ArrayBase<S, D>>
where
    S: nd::DataOwned,
    S::Elem: ndarray_npy::ReadableElement,
    D: nd::Dimension,
{
    let with_ext = format!("{}.npy", name);
    let entry
        = names.iter()
        .find(|n| n.as_str() == name || n.as_str() == with_ext)
        .ok_or_else(|| Error::Store(format!("record has no array '{}'", name)))?;
    npz.by_name::<S, D>(entry)
        .map_err(|err| Error::Store(format!("unreadable array '{}': {}", name, err)))
}

impl ResultsStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> MbResult<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self { dir: dir.as_ref().to_path_buf() })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("mbsolve-{}.npz", identity))
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.path_for(identity).is_file()
    }

    /// Write `record`, replacing any existing record with the same identity.
    pub fn save(&self, record: &CacheRecord) -> MbResult<PathBuf> {
        let path = self.path_for(&record.identity);
        let tmp = self.dir.join(format!(
            ".mbsolve-{}.{}.{}.tmp",
            record.identity,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed),
        ));
        let write = || -> MbResult<()> {
            let mut npz = NpzWriter::new(fs::File::create(&tmp)?);
            npz.add_array("omegas_zt", &record.omegas_zt)?;
            npz.add_array("states_zt", &record.states_zt)?;
            let identity: nd::Array1<u8>
                = record.identity.bytes().collect();
            npz.add_array("identity", &identity)?;
            npz.finish()?.sync_all()?;
            Ok(())
        };
        if let Err(err) = write() {
            fs::remove_file(&tmp).ok();
            return Err(err);
        }
        fs::rename(&tmp, &path)?;
        log::debug!("saved results to {}", path.display());
        Ok(path)
    }

    /// Read the record for `identity`, or `None` if there is none.
    pub fn load(&self, identity: &str) -> MbResult<Option<CacheRecord>> {
        let path = self.path_for(identity);
        if !path.is_file() { return Ok(None); }
        let mut npz
            = NpzReader::new(fs::File::open(&path)?)
            .map_err(|err| Error::Store(format!("{}: {}", path.display(), err)))?;
        let names
            = npz.names()
            .map_err(|err| Error::Store(format!("{}: {}", path.display(), err)))?;
        let stored: nd::Array1<u8>
            = read_named::<OwnedRepr<u8>, nd::Ix1>(&mut npz, &names, "identity")?;
        let stored = String::from_utf8(stored.to_vec())
            .map_err(|_| Error::Store("stored identity is not valid UTF-8".into()))?;
        if stored != identity {
            return Err(Error::Store(format!(
                "{} holds results for {}, not {}", path.display(), stored, identity)));
        }
        let omegas_zt: nd::Array3<C64>
            = read_named::<OwnedRepr<C64>, nd::Ix3>(&mut npz, &names, "omegas_zt")?;
        let states_zt: nd::Array3<C64>
            = read_named::<OwnedRepr<C64>, nd::Ix3>(&mut npz, &names, "states_zt")?;
        if omegas_zt.shape()[1..] != states_zt.shape()[1..] {
            return Err(Error::Store(format!(
                "{} has mismatched tensor shapes {:?} and {:?}",
                path.display(), omegas_zt.shape(), states_zt.shape())));
        }
        log::debug!("loaded results from {}", path.display());
        Ok(Some(CacheRecord { identity: stored, omegas_zt, states_zt }))
    }

    /// Delete the record for `identity`; returns whether one existed.
    pub fn remove(&self, identity: &str) -> MbResult<bool> {
        match fs::remove_file(self.path_for(identity)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
