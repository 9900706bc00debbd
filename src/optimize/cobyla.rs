use crate::optimize::{MinimizeResult, MinimizerTrait};

use cobyla::{Func, RhoBeg, StopTols, minimize};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// COBYLA (Constrained Optimization BY Linear Approximations) wrapper
///
/// Derivative-free trust-region method which builds linear approximations of the objective, see
/// M.J.D. Powell 1994, "A direct search optimization method that models the objective and
/// constraint functions by linear interpolation". Bounds are passed to the solver as constraints,
/// an unbounded parameter is confined to a box of `1e4 * rhobeg` around the initial guess. The
/// solver never sees non-finite values: `inf`, NaN and every evaluation after an objective error
/// are replaced by a large finite penalty.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "Cobyla")]
pub struct Cobyla {
    pub niterations: u32,
    pub rhobeg: f64,
    pub ftol_rel: f64,
}

impl Cobyla {
    /// Create a new [Cobyla].
    ///
    /// # Arguments
    /// - `niterations`: maximum number of function evaluations
    /// - `rhobeg`: initial change to parameters
    /// - `ftol_rel`: relative tolerance on function value for convergence
    pub fn new(niterations: u32, rhobeg: f64, ftol_rel: f64) -> Self {
        assert!(niterations > 0, "niterations must be positive");
        assert!(
            rhobeg > 0.0 && rhobeg.is_finite(),
            "rhobeg must be positive and finite"
        );
        assert!(
            ftol_rel >= 0.0 && ftol_rel.is_finite(),
            "ftol_rel must be non-negative and finite"
        );
        Self {
            niterations,
            rhobeg,
            ftol_rel,
        }
    }

    #[inline]
    pub fn default_niterations() -> u32 {
        1000
    }

    #[inline]
    pub fn default_rhobeg() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_ftol_rel() -> f64 {
        1e-6
    }

    /// Bounds as the solver takes them, an infinite side is replaced by a wide box around `x0`
    fn finite_bounds<const N: usize>(
        &self,
        x0: &[f64; N],
        bounds: (&[f64; N], &[f64; N]),
    ) -> Vec<(f64, f64)> {
        let half_width = FREE_HALF_WIDTH * self.rhobeg;
        x0.iter()
            .zip(bounds.0.iter().zip(bounds.1.iter()))
            .map(|(&x, (&lower, &upper))| {
                let lower = if lower.is_finite() { lower } else { x - half_width };
                let upper = if upper.is_finite() { upper } else { x + half_width };
                (lower, upper)
            })
            .collect()
    }
}

impl Default for Cobyla {
    fn default() -> Self {
        Self::new(
            Self::default_niterations(),
            Self::default_rhobeg(),
            Self::default_ftol_rel(),
        )
    }
}

/// Finite stand-in for non-finite objective values, the solver never recovers from `inf` or NaN
const PENALTY: f64 = 1e100;

/// Half-width of the box replacing an infinite bound, in units of `rhobeg`
const FREE_HALF_WIDTH: f64 = 1e4;

struct ObjectiveState<F, E> {
    objective: F,
    nfev: usize,
    error: Option<E>,
}

impl MinimizerTrait for Cobyla {
    fn minimize<F, E, const N: usize>(
        &self,
        x0: &[f64; N],
        bounds: (&[f64; N], &[f64; N]),
        objective: F,
    ) -> Result<MinimizeResult<N>, E>
    where
        F: FnMut(&[f64; N]) -> Result<f64, E>,
    {
        let state = RefCell::new(ObjectiveState {
            objective,
            nfev: 0,
            error: None,
        });

        // The solver can't be interrupted, after the first failure the objective is flat
        let wrapped = |x: &[f64], _user_data: &mut ()| -> f64 {
            let mut state = state.borrow_mut();
            if state.error.is_some() {
                return PENALTY;
            }
            let Ok(params) = <[f64; N]>::try_from(x) else {
                return PENALTY;
            };
            state.nfev += 1;
            match (state.objective)(&params) {
                Ok(value) if value.is_finite() => value.min(PENALTY),
                Ok(_) => PENALTY,
                Err(err) => {
                    state.error = Some(err);
                    PENALTY
                }
            }
        };

        let cobyla_bounds = self.finite_bounds(x0, bounds);

        let constraints: Vec<&dyn Func<()>> = vec![];

        let stop_tol = StopTols {
            ftol_rel: self.ftol_rel,
            ..StopTols::default()
        };

        let result = minimize(
            wrapped,
            x0,
            &cobyla_bounds,
            &constraints,
            (),
            self.niterations as usize,
            RhoBeg::All(self.rhobeg),
            Some(stop_tol),
        );

        let state = state.into_inner();
        if let Some(err) = state.error {
            return Err(err);
        }

        let (success, x_vec, fun) = match result {
            Ok((status, x_vec, fun)) => (
                matches!(
                    status,
                    cobyla::SuccessStatus::Success
                        | cobyla::SuccessStatus::FtolReached
                        | cobyla::SuccessStatus::XtolReached
                ),
                x_vec,
                fun,
            ),
            Err((status, x_vec, fun)) => {
                tracing::warn!("COBYLA failed: {status:?}");
                (false, x_vec, fun)
            }
        };
        let fun = if fun < PENALTY { fun } else { f64::INFINITY };
        // The solver reports a vector of the same length as the initial guess
        let x = <[f64; N]>::try_from(x_vec.as_slice()).unwrap_or(*x0);
        Ok(MinimizeResult {
            x,
            fun,
            nfev: state.nfev,
            nit: 0,
            success,
        })
    }
}
