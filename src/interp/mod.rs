//! Disk-mass → halo-mass interpolation cache

mod cubic;
pub use cubic::CubicSpline;

mod halo_grid;
pub use halo_grid::{
    FileGridStore, GridStore, HaloMassGrid, HaloMassInterpolator, MemoryGridStore,
};
