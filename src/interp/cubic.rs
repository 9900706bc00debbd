use crate::error::InterpolationError;
use crate::sorted_array::SortedArray;

use ndarray::{Array1, ArrayView1};
use ndarray_interp::interp1d::Interp1DBuilder;
use ndarray_interp::interp1d::cubic_spline::CubicSpline as CubicSplineStrategy;
use std::fmt;
use std::sync::Arc;

type Evaluator = dyn Fn(f64) -> Result<f64, InterpolationError> + Send + Sync;

/// Cubic spline interpolant with not-a-knot boundary conditions
///
/// The third derivative is continuous at the second and the penultimate nodes, which makes the
/// first two and the last two intervals share a single cubic each. This is the spline `scipy`
/// builds for `interp1d(kind="cubic")`, and it reproduces any cubic polynomial exactly. The
/// spline itself comes from [ndarray_interp].
///
/// Evaluation outside of the node range extrapolates the first or the last polynomial piece,
/// no bounds error is raised. Extrapolated values get unreliable quickly away from the nodes.
#[derive(Clone)]
pub struct CubicSpline {
    x: SortedArray,
    y: Array1<f64>,
    evaluator: Arc<Evaluator>,
}

impl CubicSpline {
    pub const MIN_POINTS: usize = 4;

    pub fn new(x: impl Into<Vec<f64>>, y: impl Into<Vec<f64>>) -> Result<Self, InterpolationError> {
        let x = x.into();
        let y = y.into();
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < Self::MIN_POINTS {
            return Err(InterpolationError::TooFewPoints {
                actual: x.len(),
                minimum: Self::MIN_POINTS,
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(InterpolationError::NonFinite);
        }
        let x = SortedArray::from_sorted(x)?;
        let y = Array1::from_vec(y);

        let interpolant = Interp1DBuilder::new(y.clone())
            .x(x.view().to_owned())
            .strategy(CubicSplineStrategy::new().extrapolate(true))
            .build()
            .map_err(|err| InterpolationError::Spline(err.to_string()))?;
        let evaluator: Arc<Evaluator> = Arc::new(move |x| {
            interpolant
                .interp_scalar(x)
                .map_err(|err| InterpolationError::Spline(err.to_string()))
        });
        Ok(Self { x, y, evaluator })
    }

    pub fn nodes(&self) -> &[f64] {
        &self.x
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    pub fn eval(&self, x: f64) -> Result<f64, InterpolationError> {
        (self.evaluator)(x)
    }

    pub fn eval_many(&self, x: ArrayView1<f64>) -> Result<Array1<f64>, InterpolationError> {
        x.iter().map(|&x| self.eval(x)).collect()
    }
}

impl fmt::Debug for CubicSpline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CubicSpline")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CubicSpline {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}
