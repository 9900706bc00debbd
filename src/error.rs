use std::path::PathBuf;

/// Failure reported by an external capability: potential construction, action solver or
/// torus fitter
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{capability} failed: {message}")]
pub struct CollaboratorError {
    pub capability: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(capability: &'static str, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
        }
    }
}

/// Name lookup in a [crate::Registry] failed
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind} {name:?}")]
pub struct LookupError {
    pub kind: &'static str,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("column {name:?} has {actual} rows, {expected} expected")]
    LengthMismatch {
        name: String,
        actual: usize,
        expected: usize,
    },

    #[error("column {0:?} is missing")]
    MissingColumn(String),

    #[error("cannot parse value {value:?} of column {column:?} at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Fits(#[from] fitsio::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("cubic interpolation needs at least {minimum} nodes, {actual} given")]
    TooFewPoints { actual: usize, minimum: usize },

    #[error("interpolation nodes must be strictly increasing")]
    Unsorted,

    #[error("interpolation nodes and values must be finite")]
    NonFinite,

    #[error("{x} nodes but {y} values")]
    LengthMismatch { x: usize, y: usize },

    #[error("spline interpolation failed: {0}")]
    Spline(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PotentialError {
    #[error(
        "integration potential {integration:?} and action potential {action:?} disagree on parameters"
    )]
    Inconsistent { integration: String, action: String },

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, thiserror::Error)]
pub enum GridStoreError {
    #[error("cannot access halo-mass grid at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed halo-mass grid at {path}: {source}")]
    Pickle {
        path: PathBuf,
        source: serde_pickle::Error,
    },

    #[error("halo-mass grid at {path} has {disk_fractions} disk fractions but {halo_masses} halo masses")]
    Inconsistent {
        path: PathBuf,
        disk_fractions: usize,
        halo_masses: usize,
    },

    #[error("halo-mass grid store is poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum HaloGridError {
    #[error(transparent)]
    Store(#[from] GridStoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("cannot build worker thread pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),

    #[error("worker {0} stopped before returning its result")]
    WorkerLost(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Potential(#[from] PotentialError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: TableError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectiveError {
    #[error("neighbour count must be positive")]
    ZeroNeighbours,

    #[error("disk-mass fraction {0} is outside of the calibrated range")]
    Infeasible(f64),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    HaloGrid(#[from] HaloGridError),

    #[error(transparent)]
    Potential(#[from] PotentialError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read frame file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed frame file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}
