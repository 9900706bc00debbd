//! Milky Way potential model family and its two matched representations

use crate::error::{CollaboratorError, PotentialError};
use crate::registry::Registry;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Disk mass of the fiducial Milky Way model, solar masses
pub const MILKY_WAY_FIDUCIAL_DISK_MASS: f64 = 6.8e10;

/// Free masses of the Milky Way model family, solar masses
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MilkyWayParameters {
    pub disk_mass: f64,
    pub halo_mass: f64,
}

impl MilkyWayParameters {
    pub fn is_close(&self, other: &Self, rtol: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= rtol * a.abs().max(b.abs());
        close(self.disk_mass, other.disk_mass) && close(self.halo_mass, other.halo_mass)
    }
}

/// Potential representation used for orbit integration
pub trait IntegrationPotential: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> MilkyWayParameters;
}

/// Potential representation consumed by the action solver
pub trait ActionPotential: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn parameters(&self) -> MilkyWayParameters;
}

/// Two representations of the same potential
///
/// Construction checks that both report the same masses, so an action computed with one is
/// consistent with orbits integrated in the other.
#[derive(Clone, Debug)]
pub struct PotentialPair {
    integration: Arc<dyn IntegrationPotential>,
    action: Arc<dyn ActionPotential>,
}

impl PotentialPair {
    pub const RTOL: f64 = 1e-10;

    pub fn new(
        integration: impl IntegrationPotential + 'static,
        action: impl ActionPotential + 'static,
    ) -> Result<Self, PotentialError> {
        Self::from_shared(Arc::new(integration), Arc::new(action))
    }

    pub fn from_shared(
        integration: Arc<dyn IntegrationPotential>,
        action: Arc<dyn ActionPotential>,
    ) -> Result<Self, PotentialError> {
        if !integration
            .parameters()
            .is_close(&action.parameters(), Self::RTOL)
        {
            return Err(PotentialError::Inconsistent {
                integration: integration.name().to_owned(),
                action: action.name().to_owned(),
            });
        }
        Ok(Self {
            integration,
            action,
        })
    }

    pub fn integration(&self) -> &dyn IntegrationPotential {
        self.integration.as_ref()
    }

    pub fn action(&self) -> &dyn ActionPotential {
        self.action.as_ref()
    }

    pub fn parameters(&self) -> MilkyWayParameters {
        self.integration.parameters()
    }
}

/// Constructor of Milky Way models with a free disk mass
pub trait PotentialFamily: Send + Sync {
    fn fiducial_disk_mass(&self) -> f64 {
        MILKY_WAY_FIDUCIAL_DISK_MASS
    }

    /// Halo mass that keeps the enclosed mass of the model with `disk_mass` consistent with the
    /// fiducial model
    fn fit_halo_mass(&self, disk_mass: f64) -> Result<f64, CollaboratorError>;

    /// Matched representations of the model with the given masses
    fn build(&self, parameters: MilkyWayParameters) -> Result<PotentialPair, PotentialError>;
}

pub type PotentialRegistry = Registry<PotentialPair>;

impl Registry<PotentialPair> {
    pub fn potentials() -> Self {
        Self::new("potential")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tests::{ToyActionPotential, ToyIntegrationPotential};

    fn params(disk_mass: f64, halo_mass: f64) -> MilkyWayParameters {
        MilkyWayParameters {
            disk_mass,
            halo_mass,
        }
    }

    #[test]
    fn matched_pair() {
        let p = params(6.8e10, 5.4e11);
        let pair = PotentialPair::new(
            ToyIntegrationPotential::new("mw", p),
            ToyActionPotential::new("mw", p),
        )
        .unwrap();
        assert_eq!(pair.parameters(), p);
        assert_eq!(pair.action().name(), "mw");
    }

    #[test]
    fn mismatched_pair() {
        let err = PotentialPair::new(
            ToyIntegrationPotential::new("mw", params(6.8e10, 5.4e11)),
            ToyActionPotential::new("mw-light", params(6.0e10, 5.4e11)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PotentialError::Inconsistent { ref action, .. } if action == "mw-light"
        ));
    }

    #[test]
    fn closeness_is_relative() {
        let a = params(6.8e10, 5.4e11);
        let b = params(6.8e10 * (1.0 + 1e-12), 5.4e11);
        assert!(a.is_close(&b, PotentialPair::RTOL));
        assert!(!a.is_close(&params(6.8e10 + 1e3, 5.4e11), PotentialPair::RTOL));
    }
}
