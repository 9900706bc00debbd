use crate::cache::write_atomically;
use crate::error::{CollaboratorError, GridStoreError, HaloGridError, InterpolationError};
use crate::interp::cubic::CubicSpline;
use crate::potential::PotentialFamily;

use serde::{Deserialize, Serialize};
use serde_pickle::{DeOptions, SerOptions};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Halo mass required by each disk mass of the model family, sampled on a fixed grid
///
/// Both columns are in units of the fiducial disk mass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaloMassGrid {
    pub disk_fractions: Vec<f64>,
    pub halo_masses: Vec<f64>,
}

impl HaloMassGrid {
    pub const START: f64 = 0.35;
    pub const STEP: f64 = 0.04;
    pub const LEN: usize = 37;

    /// Disk-mass fractions 0.35, 0.39, ..., 1.79
    pub fn disk_fraction_nodes() -> Vec<f64> {
        (0..Self::LEN)
            .map(|i| Self::START + Self::STEP * i as f64)
            .collect()
    }

    /// Fit the halo mass at every grid node
    ///
    /// Each node builds a full potential, so this is slow and meant to run once per cache.
    pub fn build<F>(family: &F) -> Result<Self, CollaboratorError>
    where
        F: PotentialFamily + ?Sized,
    {
        let fiducial = family.fiducial_disk_mass();
        let disk_fractions = Self::disk_fraction_nodes();
        tracing::info!(
            nodes = disk_fractions.len(),
            "computing potential halo-mass grid"
        );
        let halo_masses = disk_fractions
            .iter()
            .enumerate()
            .map(|(i, &fraction)| {
                let halo_mass = family.fit_halo_mass(fraction * fiducial)?;
                tracing::debug!(
                    "halo-mass grid node {}/{}: disk fraction {fraction:.2}",
                    i + 1,
                    Self::LEN
                );
                Ok(halo_mass / fiducial)
            })
            .collect::<Result<Vec<_>, CollaboratorError>>()?;
        Ok(Self {
            disk_fractions,
            halo_masses,
        })
    }

    /// Load the grid from `store`, building and storing it first if the store is empty
    pub fn load_or_build<S, F>(store: &S, family: &F) -> Result<Self, HaloGridError>
    where
        S: GridStore + ?Sized,
        F: PotentialFamily + ?Sized,
    {
        if let Some(grid) = store.load()? {
            tracing::debug!("halo-mass grid loaded from cache");
            return Ok(grid);
        }
        let grid = Self::build(family)?;
        store.store(&grid)?;
        Ok(grid)
    }

    pub fn interpolator(&self) -> Result<HaloMassInterpolator, InterpolationError> {
        Ok(HaloMassInterpolator {
            spline: CubicSpline::new(self.disk_fractions.clone(), self.halo_masses.clone())?,
        })
    }
}

/// Cubic interpolation of the halo mass over disk-mass fraction
///
/// Outside of the sampled range the values are extrapolated and must not be trusted.
#[derive(Clone, Debug, PartialEq)]
pub struct HaloMassInterpolator {
    spline: CubicSpline,
}

impl HaloMassInterpolator {
    /// Halo mass in units of the fiducial disk mass
    pub fn halo_mass_fraction(&self, disk_fraction: f64) -> Result<f64, InterpolationError> {
        self.spline.eval(disk_fraction)
    }

    pub fn spline(&self) -> &CubicSpline {
        &self.spline
    }
}

/// Persistence of the halo-mass grid
pub trait GridStore {
    fn load(&self) -> Result<Option<HaloMassGrid>, GridStoreError>;

    fn store(&self, grid: &HaloMassGrid) -> Result<(), GridStoreError>;
}

/// Pickle file store, the file is authoritative until deleted
///
/// The file holds the pickled tuple `(disk_fractions, halo_masses)` of two float sequences.
#[derive(Clone, Debug)]
pub struct FileGridStore {
    path: PathBuf,
}

impl FileGridStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> GridStoreError {
        GridStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn pickle_error(&self, source: serde_pickle::Error) -> GridStoreError {
        GridStoreError::Pickle {
            path: self.path.clone(),
            source,
        }
    }
}

impl GridStore for FileGridStore {
    fn load(&self) -> Result<Option<HaloMassGrid>, GridStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let (disk_fractions, halo_masses): (Vec<f64>, Vec<f64>) =
            serde_pickle::from_slice(&bytes, DeOptions::new())
                .map_err(|err| self.pickle_error(err))?;
        if disk_fractions.len() != halo_masses.len() {
            return Err(GridStoreError::Inconsistent {
                path: self.path.clone(),
                disk_fractions: disk_fractions.len(),
                halo_masses: halo_masses.len(),
            });
        }
        Ok(Some(HaloMassGrid {
            disk_fractions,
            halo_masses,
        }))
    }

    fn store(&self, grid: &HaloMassGrid) -> Result<(), GridStoreError> {
        let pickle = serde_pickle::to_vec(
            &(&grid.disk_fractions, &grid.halo_masses),
            SerOptions::new(),
        )
        .map_err(|err| self.pickle_error(err))?;
        write_atomically(&self.path, |w| w.write_all(&pickle)).map_err(|err| self.io_error(err))
    }
}

/// Store that keeps the grid in memory, for tests and single-process sessions
#[derive(Debug, Default)]
pub struct MemoryGridStore {
    grid: Mutex<Option<HaloMassGrid>>,
}

impl MemoryGridStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(grid: HaloMassGrid) -> Self {
        Self {
            grid: Mutex::new(Some(grid)),
        }
    }
}

impl GridStore for MemoryGridStore {
    fn load(&self) -> Result<Option<HaloMassGrid>, GridStoreError> {
        self.grid
            .lock()
            .map(|grid| grid.clone())
            .map_err(|_| GridStoreError::Poisoned)
    }

    fn store(&self, grid: &HaloMassGrid) -> Result<(), GridStoreError> {
        let mut guard = self.grid.lock().map_err(|_| GridStoreError::Poisoned)?;
        *guard = Some(grid.clone());
        Ok(())
    }
}
