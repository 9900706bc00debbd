#![doc = include_str!("../README.md")]


mod actions;
pub use actions::{ActionGrid, ActionSolver};

mod cache;
pub use cache::{CacheLayout, write_atomically, write_file_atomically};

pub mod cli;

mod config;
pub use config::Config;

pub mod data;
pub use data::{AafTable, Dataset, DatasetRegistry, PhaseSpace, SkyObservations};

mod error;
pub use error::{
    CollaboratorError, ConfigError, GridStoreError, HaloGridError, InterpolationError,
    LookupError, ObjectiveError, PipelineError, PoolError, PotentialError, TableError,
};

mod frame;
pub use frame::GalactocentricFrame;

pub mod interp;
pub use interp::{CubicSpline, GridStore, HaloMassGrid, HaloMassInterpolator};

mod objective;
pub use objective::{CalibrationParams, DEFAULT_TREE_K, TorusImagingObjective};

pub mod optimize;
pub use optimize::{Cobyla, MinimizeAlgorithm, MinimizeResult, MinimizerTrait, NelderMead};

mod pipeline;
pub use pipeline::{ActionPipeline, Task, generate_tasks};

pub mod pool;
pub use pool::{Pool, PoolTrait};

mod potential;
pub use potential::{
    ActionPotential, IntegrationPotential, MILKY_WAY_FIDUCIAL_DISK_MASS, MilkyWayParameters,
    PotentialFamily, PotentialPair, PotentialRegistry,
};

mod registry;
pub use registry::Registry;

mod sorted_array;

mod torus;
pub use torus::{AbundanceColumn, AbundanceTorusTable, TorusCoefficients, TorusFitter};

pub use ndarray;
