//! Torus-imaging calibration of the disk mass and the solar position
//!
//! A potential that matches the Galaxy maps every star onto its true orbital torus. Stars on
//! the same torus share their birth abundances, so the abundance must not vary with the orbital
//! angles. The objective measures the remaining angle dependence for a candidate disk mass and
//! solar offset.

use crate::actions::ActionGrid;
use crate::data::{Dataset, SkyObservations};
use crate::error::{HaloGridError, ObjectiveError};
use crate::frame::GalactocentricFrame;
use crate::interp::{GridStore, HaloMassGrid, HaloMassInterpolator};
use crate::optimize::{MinimizeAlgorithm, MinimizeResult, MinimizerTrait};
use crate::potential::{MilkyWayParameters, PotentialFamily, PotentialPair};
use crate::torus::{AbundanceColumn, AbundanceTorusTable, TorusCoefficients, TorusFitter};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Free parameters of the calibration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationParams {
    /// Disk mass in units of the fiducial disk mass
    pub disk_mass_fraction: f64,
    /// Height of the Sun above the midplane, pc
    pub z_sun: f64,
    /// Vertical solar velocity, km/s
    pub vz_sun: f64,
}

impl CalibrationParams {
    /// Open interval of disk-mass fractions the potential grid supports
    pub const DISK_FRACTION_BOUNDS: (f64, f64) = (0.4, 1.8);

    pub fn fiducial() -> Self {
        Self {
            disk_mass_fraction: 1.0,
            z_sun: 20.8,
            vz_sun: 7.78,
        }
    }

    pub fn is_feasible(&self) -> bool {
        let (lower, upper) = Self::DISK_FRACTION_BOUNDS;
        lower < self.disk_mass_fraction && self.disk_mass_fraction < upper
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self::fiducial()
    }
}

impl From<[f64; 3]> for CalibrationParams {
    fn from([disk_mass_fraction, z_sun, vz_sun]: [f64; 3]) -> Self {
        Self {
            disk_mass_fraction,
            z_sun,
            vz_sun,
        }
    }
}

impl From<CalibrationParams> for [f64; 3] {
    fn from(params: CalibrationParams) -> Self {
        [params.disk_mass_fraction, params.z_sun, params.vz_sun]
    }
}

/// Number of action-space neighbours used when the caller has no preference
pub const DEFAULT_TREE_K: usize = 64;

/// Residual angle dependence of an abundance as a function of [CalibrationParams]
///
/// Evaluation takes `&self` and keeps no state between calls. The halo-mass interpolation is
/// loaded or built once, in [TorusImagingObjective::new].
pub struct TorusImagingObjective<P, G, M> {
    observations: SkyObservations,
    abundance: AbundanceColumn,
    tree_k: usize,
    frame: GalactocentricFrame,
    family: P,
    interpolator: HaloMassInterpolator,
    action_grid: G,
    fitter: M,
}

impl<P, G, M> TorusImagingObjective<P, G, M>
where
    P: PotentialFamily,
    G: ActionGrid,
    M: TorusFitter,
{
    /// Select the abundance and its uncertainty from `dataset` and prepare the potential grid
    ///
    /// `frame` is the reference frame, its solar height and vertical velocity are replaced by
    /// the evaluated parameters. `tree_k` defaults to [DEFAULT_TREE_K].
    #[allow(clippy::too_many_arguments)]
    pub fn new<S>(
        dataset: &Dataset,
        elem_name: &str,
        tree_k: Option<usize>,
        frame: GalactocentricFrame,
        family: P,
        grid_store: &S,
        action_grid: G,
        fitter: M,
    ) -> Result<Self, ObjectiveError>
    where
        S: GridStore + ?Sized,
    {
        let tree_k = tree_k.unwrap_or(DEFAULT_TREE_K);
        if tree_k == 0 {
            return Err(ObjectiveError::ZeroNeighbours);
        }
        let abundance = AbundanceColumn::from_dataset(dataset, elem_name)?;
        let interpolator = HaloMassGrid::load_or_build(grid_store, &family)?
            .interpolator()
            .map_err(HaloGridError::from)?;
        Ok(Self {
            observations: dataset.observations().clone(),
            abundance,
            tree_k,
            frame,
            family,
            interpolator,
            action_grid,
            fitter,
        })
    }

    pub fn elem_name(&self) -> &str {
        &self.abundance.name
    }

    pub fn tree_k(&self) -> usize {
        self.tree_k
    }

    pub fn action_grid(&self) -> &G {
        &self.action_grid
    }

    /// Milky Way model with the given disk mass and the halo mass interpolated for it
    pub fn potential(&self, disk_mass_fraction: f64) -> Result<PotentialPair, ObjectiveError> {
        let fiducial = self.family.fiducial_disk_mass();
        let halo_mass_fraction = self
            .interpolator
            .halo_mass_fraction(disk_mass_fraction)
            .map_err(HaloGridError::from)?;
        let parameters = MilkyWayParameters {
            disk_mass: disk_mass_fraction * fiducial,
            halo_mass: halo_mass_fraction * fiducial,
        };
        Ok(self.family.build(parameters)?)
    }

    /// Torus coefficients of the abundance for feasible parameters
    pub fn coefficients(
        &self,
        params: &CalibrationParams,
    ) -> Result<TorusCoefficients, ObjectiveError> {
        if !params.is_feasible() {
            return Err(ObjectiveError::Infeasible(params.disk_mass_fraction));
        }
        let frame = self.frame.with_solar_offset(params.z_sun, params.vz_sun);
        let w = frame.transform(&self.observations);
        let potential = self.potential(params.disk_mass_fraction)?;
        let aaf = self
            .action_grid
            .get_aaf(&w, params.disk_mass_fraction, &potential)?;
        let table = AbundanceTorusTable::join(&aaf, &self.abundance)?;
        Ok(self
            .fitter
            .coefficients(&table, &self.abundance.name, self.tree_k)?)
    }

    /// Sum of squared harmonic coefficients, infinite for an infeasible disk mass
    pub fn evaluate(&self, params: &CalibrationParams) -> Result<f64, ObjectiveError> {
        if !params.is_feasible() {
            return Ok(f64::INFINITY);
        }
        let residual = self.coefficients(params)?.residual();
        tracing::trace!("objective at {params:?}: {residual}");
        Ok(residual)
    }

    /// Minimize the objective starting from `x0`, or from the fiducial parameters
    ///
    /// The disk-mass interval is a constraint for algorithms which support one. Nelder-Mead is
    /// unconstrained and only sees the infinite objective outside of it.
    pub fn minimize(
        &self,
        x0: Option<CalibrationParams>,
        algorithm: &MinimizeAlgorithm,
    ) -> Result<MinimizeResult<3>, ObjectiveError> {
        let x0: [f64; 3] = x0.unwrap_or_default().into();
        let (lower, upper) = CalibrationParams::DISK_FRACTION_BOUNDS;
        let lower = [lower, f64::NEG_INFINITY, f64::NEG_INFINITY];
        let upper = [upper, f64::INFINITY, f64::INFINITY];
        let result = algorithm.minimize(&x0, (&lower, &upper), |x| {
            self.evaluate(&CalibrationParams::from(*x))
        })?;
        tracing::info!(
            "{} calibration finished after {} evaluations: {:?} -> {}",
            self.abundance.name,
            result.nfev,
            CalibrationParams::from(result.x),
            result.fun
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::TableError;
    use crate::interp::MemoryGridStore;
    use crate::optimize::{Cobyla, NelderMead};
    use crate::tests::{
        RecordingGrid, ToyActionSolver, ToyFamily, ToyTorusFitter, finishes_within,
        synthetic_dataset,
    };

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    type ToyObjective = TorusImagingObjective<ToyFamily, ToyActionSolver, ToyTorusFitter>;

    fn objective_with_store(store: &MemoryGridStore) -> ToyObjective {
        TorusImagingObjective::new(
            &synthetic_dataset("synthetic", 120, 7),
            "MG_FE",
            Some(16),
            GalactocentricFrame::default(),
            ToyFamily::default(),
            store,
            ToyActionSolver::default(),
            ToyTorusFitter,
        )
        .unwrap()
    }

    fn objective() -> ToyObjective {
        objective_with_store(&MemoryGridStore::new())
    }

    #[test]
    fn infeasible_disk_mass_is_infinite() {
        let objective = objective();
        for x in [
            [0.39, 20.8, 7.78],
            [1.81, 0.0, 0.0],
            [0.4, 20.8, 7.78],
            [1.8, 20.8, 7.78],
            [f64::NAN, 20.8, 7.78],
            [-1.0, 1e3, -1e3],
        ] {
            assert_eq!(objective.evaluate(&x.into()).unwrap(), f64::INFINITY, "{x:?}");
        }
        assert_eq!(objective.action_grid().calls(), 0);
    }

    #[test]
    fn feasible_residual_is_finite() {
        let objective = objective();
        let params = CalibrationParams::fiducial();
        let residual = objective.evaluate(&params).unwrap();
        assert!(residual.is_finite() && residual >= 0.0);
        let coefficients = objective.coefficients(&params).unwrap();
        assert_eq!(coefficients.residual(), residual);
        assert_eq!(objective.action_grid().calls(), 2);
    }

    #[test]
    fn coefficients_reject_infeasible() {
        let err = objective()
            .coefficients(&[1.9, 20.8, 7.78].into())
            .unwrap_err();
        assert!(matches!(err, ObjectiveError::Infeasible(f) if f == 1.9));
    }

    #[test]
    fn potential_uses_interpolated_halo() {
        let objective = objective();
        let fraction = 0.35 + 0.04 * 10.0;
        let parameters = objective.potential(fraction).unwrap().parameters();
        assert_relative_eq!(
            parameters.halo_mass,
            ToyFamily::halo_mass(parameters.disk_mass),
            max_relative = 1e-10
        );
    }

    #[test]
    fn grid_store_is_reused() {
        let store = MemoryGridStore::new();
        let first = objective_with_store(&store);
        assert_eq!(first.family.halo_fits(), HaloMassGrid::LEN);
        let second = objective_with_store(&store);
        assert_eq!(second.family.halo_fits(), 0);
    }

    #[test]
    fn minimize_improves_on_fiducial() {
        let objective = objective();
        let start = objective.evaluate(&CalibrationParams::fiducial()).unwrap();
        let result = objective
            .minimize(None, &MinimizeAlgorithm::default())
            .unwrap();
        assert!(result.fun <= start);
        assert!(result.nfev > 0);
        assert!(CalibrationParams::from(result.x).is_feasible());
    }

    #[test]
    fn minimize_with_cobyla() {
        let objective = objective();
        let start = objective.evaluate(&CalibrationParams::fiducial()).unwrap();
        let algorithm: MinimizeAlgorithm = Cobyla::new(60, 0.05, 1e-6).into();
        let result = objective.minimize(None, &algorithm).unwrap();
        assert!(result.fun <= start);
        assert!(result.x[0] >= 0.4 && result.x[0] <= 1.8);
    }

    #[test]
    fn minimize_starts_from_given_point() {
        let objective = objective();
        let algorithm: MinimizeAlgorithm = NelderMead::new(1e-4, Some(1)).into();
        let x0 = CalibrationParams {
            disk_mass_fraction: 1.2,
            z_sun: 0.0,
            vz_sun: 0.0,
        };
        let result = objective.minimize(Some(x0), &algorithm).unwrap();
        assert_eq!(result.fun, objective.evaluate(&x0).unwrap());
        assert_eq!(result.x, <[f64; 3]>::from(x0));
        assert_eq!(result.nfev, 1);
        assert!(!result.success);
    }

    #[test]
    fn zero_neighbours_rejected() {
        let err = TorusImagingObjective::new(
            &synthetic_dataset("synthetic", 10, 0),
            "MG_FE",
            Some(0),
            GalactocentricFrame::default(),
            ToyFamily::default(),
            &MemoryGridStore::new(),
            ToyActionSolver::default(),
            ToyTorusFitter,
        )
        .err()
        .unwrap();
        assert!(matches!(err, ObjectiveError::ZeroNeighbours));
    }

    #[test]
    fn missing_abundance_column() {
        let err = TorusImagingObjective::new(
            &synthetic_dataset("synthetic", 10, 0),
            "FE_H",
            Some(4),
            GalactocentricFrame::default(),
            ToyFamily::default(),
            &MemoryGridStore::new(),
            ToyActionSolver::default(),
            ToyTorusFitter,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ObjectiveError::Table(TableError::MissingColumn(ref c)) if c == "FE_H"
        ));
    }

    #[test]
    fn fitter_failure_propagates() {
        let objective = TorusImagingObjective::new(
            &synthetic_dataset("synthetic", 10, 0),
            "MG_FE",
            Some(50),
            GalactocentricFrame::default(),
            ToyFamily::default(),
            &MemoryGridStore::new(),
            ToyActionSolver::default(),
            ToyTorusFitter,
        )
        .unwrap();
        let err = objective
            .evaluate(&CalibrationParams::fiducial())
            .unwrap_err();
        assert!(matches!(err, ObjectiveError::Collaborator(_)));
    }

    #[test]
    fn default_tree_k() {
        let objective = TorusImagingObjective::new(
            &synthetic_dataset("synthetic", 10, 0),
            "MG_FE",
            None,
            GalactocentricFrame::default(),
            ToyFamily::default(),
            &MemoryGridStore::new(),
            ToyActionSolver::default(),
            ToyTorusFitter,
        )
        .unwrap();
        assert_eq!(objective.tree_k(), 64);
        // 64 neighbours can't be found among 10 stars
        assert!(objective.evaluate(&CalibrationParams::fiducial()).is_err());
    }

    #[test]
    fn minimize_starts_from_fiducial() {
        let dataset = synthetic_dataset("synthetic", 120, 7);
        let objective = TorusImagingObjective::new(
            &dataset,
            "MG_FE",
            Some(16),
            GalactocentricFrame::default(),
            ToyFamily::default(),
            &MemoryGridStore::new(),
            RecordingGrid::default(),
            ToyTorusFitter,
        )
        .unwrap();
        let algorithm: MinimizeAlgorithm = NelderMead::new(1e-4, Some(10)).into();
        objective.minimize(None, &algorithm).unwrap();

        let requests = objective.action_grid().requests();
        let (fraction, x, v) = &requests[0];
        assert_eq!(*fraction, 1.0);
        let expected = GalactocentricFrame::default()
            .with_solar_offset(20.8, 7.78)
            .transform(dataset.observations());
        assert_abs_diff_eq!(x, &expected.x().to_owned(), epsilon = 1e-12);
        assert_abs_diff_eq!(v, &expected.v().to_owned(), epsilon = 1e-12);
        // The rest of the initial simplex perturbs one parameter at a time
        assert_abs_diff_eq!(requests[1].0, 1.05, epsilon = 1e-12);
        assert_eq!(requests[2].0, 1.0);
        assert_eq!(requests[3].0, 1.0);
    }

    #[test]
    fn minimize_near_upper_bound_finishes() {
        for algorithm in [
            MinimizeAlgorithm::default(),
            Cobyla::default().into(),
        ] {
            let x = finishes_within(60, move || {
                let objective = objective();
                let x0 = CalibrationParams {
                    disk_mass_fraction: 1.79,
                    ..CalibrationParams::fiducial()
                };
                let start = objective.evaluate(&x0).unwrap();
                let result = objective.minimize(Some(x0), &algorithm).unwrap();
                assert!(result.fun.is_finite() && result.fun <= start);
                result.x
            });
            assert!(CalibrationParams::from(x).is_feasible(), "{x:?}");
        }
    }

    #[test]
    fn cobyla_returns_fitter_error() {
        let is_collaborator_error = finishes_within(60, || {
            let objective = TorusImagingObjective::new(
                &synthetic_dataset("synthetic", 10, 0),
                "MG_FE",
                Some(50),
                GalactocentricFrame::default(),
                ToyFamily::default(),
                &MemoryGridStore::new(),
                ToyActionSolver::default(),
                ToyTorusFitter,
            )
            .unwrap();
            let result = objective.minimize(None, &Cobyla::default().into());
            matches!(result, Err(ObjectiveError::Collaborator(_)))
        });
        assert!(is_collaborator_error);
    }
}
