//! Action-angle-frequency solvers

use crate::data::{AafTable, PhaseSpace};
use crate::error::CollaboratorError;
use crate::potential::PotentialPair;

/// Staeckel-fudge estimator of actions, angles and frequencies
pub trait ActionSolver: Send + Sync {
    fn actions(&self, potential: &PotentialPair, w: &PhaseSpace)
    -> Result<AafTable, CollaboratorError>;
}

/// Action solver backed by precomputed per-potential grids
///
/// `disk_mass_fraction` keys the grid, the potential must be the model built for that fraction.
pub trait ActionGrid {
    fn get_aaf(
        &self,
        w: &PhaseSpace,
        disk_mass_fraction: f64,
        potential: &PotentialPair,
    ) -> Result<AafTable, CollaboratorError>;
}

/// Any exact solver can stand in for a grid
impl<S> ActionGrid for S
where
    S: ActionSolver,
{
    fn get_aaf(
        &self,
        w: &PhaseSpace,
        _disk_mass_fraction: f64,
        potential: &PotentialPair,
    ) -> Result<AafTable, CollaboratorError> {
        self.actions(potential, w)
    }
}
