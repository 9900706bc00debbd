//! Derivative-free minimizers for the calibration objective
//!
//! Every algorithm takes an initial guess, a box of bounds (`±inf` for unbounded parameters) and a
//! fallible objective. Constrained algorithms keep trial points inside the box, unconstrained ones
//! ignore it. The first error raised by the objective aborts the minimization and is returned to
//! the caller.

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod cobyla;
pub use cobyla::Cobyla;

mod nelder_mead;
pub use nelder_mead::NelderMead;

/// Outcome of a minimization
#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeResult<const N: usize> {
    /// Best parameters found
    pub x: [f64; N],
    /// Objective value at `x`
    pub fun: f64,
    /// Number of objective evaluations
    pub nfev: usize,
    /// Number of iterations, zero when the algorithm doesn't report it
    pub nit: usize,
    /// `false` if the evaluation or iteration budget ran out before convergence
    pub success: bool,
}

#[enum_dispatch]
pub trait MinimizerTrait {
    fn minimize<F, E, const N: usize>(
        &self,
        x0: &[f64; N],
        bounds: (&[f64; N], &[f64; N]),
        objective: F,
    ) -> Result<MinimizeResult<N>, E>
    where
        F: FnMut(&[f64; N]) -> Result<f64, E>;
}

/// Minimization algorithm selector
#[enum_dispatch(MinimizerTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum MinimizeAlgorithm {
    NelderMead,
    Cobyla,
}

impl Default for MinimizeAlgorithm {
    fn default() -> Self {
        NelderMead::default().into()
    }
}
