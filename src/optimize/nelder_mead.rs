use crate::optimize::{MinimizeResult, MinimizerTrait};

use argmin::core::{CostFunction, Error as ArgminError, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead as NelderMeadSolver;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Downhill simplex minimizer backed by [argmin]
///
/// The initial simplex perturbs every non-zero coordinate of the guess by 5% and every zero
/// coordinate by 0.00025. The method is unconstrained: bounds are not enforced, infeasible
/// regions must be walled off by the objective returning `inf`. Convergence requires the standard
/// deviation of the objective over the simplex to fall below `sd_tolerance`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename = "NelderMead")]
pub struct NelderMead {
    pub sd_tolerance: f64,
    /// Maximum number of both iterations and evaluations, `200 * N` if `None`
    pub max_iterations: Option<usize>,
}

impl NelderMead {
    const NONZERO_DELTA: f64 = 0.05;
    const ZERO_DELTA: f64 = 0.00025;

    pub fn new(sd_tolerance: f64, max_iterations: Option<usize>) -> Self {
        assert!(
            sd_tolerance >= 0.0 && sd_tolerance.is_finite(),
            "sd_tolerance must be non-negative and finite"
        );
        assert!(
            max_iterations.is_none_or(|n| n > 0),
            "max_iterations must be positive"
        );
        Self {
            sd_tolerance,
            max_iterations,
        }
    }

    #[inline]
    pub fn default_sd_tolerance() -> f64 {
        1e-4
    }

    fn initial_simplex<const N: usize>(x0: &[f64; N]) -> Vec<Vec<f64>> {
        let mut simplex = Vec::with_capacity(N + 1);
        simplex.push(x0.to_vec());
        for k in 0..N {
            let mut vertex = x0.to_vec();
            vertex[k] = if vertex[k] != 0.0 {
                (1.0 + Self::NONZERO_DELTA) * vertex[k]
            } else {
                Self::ZERO_DELTA
            };
            simplex.push(vertex);
        }
        simplex
    }
}

impl Default for NelderMead {
    fn default() -> Self {
        Self::new(Self::default_sd_tolerance(), None)
    }
}

/// Bookkeeping of the user objective shared with the solver
struct Evaluations<F, E, const N: usize> {
    objective: F,
    budget: usize,
    nfev: usize,
    best: Option<([f64; N], f64)>,
    error: Option<E>,
}

impl<F, E, const N: usize> Evaluations<F, E, N> {
    fn halted(&self) -> bool {
        self.error.is_some() || self.nfev >= self.budget
    }
}

struct SimplexProblem<'a, F, E, const N: usize>(&'a RefCell<Evaluations<F, E, N>>);

impl<F, E, const N: usize> CostFunction for SimplexProblem<'_, F, E, N>
where
    F: FnMut(&[f64; N]) -> Result<f64, E>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let mut evaluations = self.0.borrow_mut();
        // -inf hits the executor's default target cost, which stops it after the current step.
        // The solver unwraps the costs of the initial simplex, so an error can't be used here.
        if evaluations.halted() {
            return Ok(f64::NEG_INFINITY);
        }
        let x = <[f64; N]>::try_from(param.as_slice())?;
        evaluations.nfev += 1;
        match (evaluations.objective)(&x) {
            Ok(value) => {
                let value = if value.is_nan() { f64::INFINITY } else { value };
                match evaluations.best {
                    Some((_, best)) if best <= value => {}
                    _ => evaluations.best = Some((x, value)),
                }
                Ok(value)
            }
            Err(err) => {
                evaluations.error = Some(err);
                Ok(f64::NEG_INFINITY)
            }
        }
    }
}

impl MinimizerTrait for NelderMead {
    fn minimize<F, E, const N: usize>(
        &self,
        x0: &[f64; N],
        _bounds: (&[f64; N], &[f64; N]),
        objective: F,
    ) -> Result<MinimizeResult<N>, E>
    where
        F: FnMut(&[f64; N]) -> Result<f64, E>,
    {
        let max_iterations = self.max_iterations.unwrap_or(200 * N);
        let evaluations = RefCell::new(Evaluations {
            objective,
            budget: max_iterations,
            nfev: 0,
            best: None,
            error: None,
        });

        let outcome = NelderMeadSolver::new(Self::initial_simplex(x0))
            .with_sd_tolerance(self.sd_tolerance)
            .and_then(|solver| {
                Executor::new(SimplexProblem(&evaluations), solver)
                    .configure(|state| {
                        state
                            .max_iters(max_iterations as u64)
                            .target_cost(f64::NEG_INFINITY)
                    })
                    .run()
            })
            .map(|result| {
                let state = result.state();
                (
                    state.get_termination_reason() == Some(&TerminationReason::SolverConverged),
                    state.get_iter() as usize,
                )
            });

        let evaluations = evaluations.into_inner();
        if let Some(err) = evaluations.error {
            return Err(err);
        }

        let (converged, nit) = match outcome {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!("Nelder-Mead solver failed: {err}");
                (false, 0)
            }
        };
        if !converged {
            tracing::warn!(
                nfev = evaluations.nfev,
                nit,
                "Nelder-Mead stopped before convergence"
            );
        }
        let (x, fun) = evaluations.best.unwrap_or((*x0, f64::INFINITY));
        Ok(MinimizeResult {
            x,
            fun,
            nfev: evaluations.nfev,
            nit,
            success: converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    fn rosenbrock(x: &[f64; 2]) -> Result<f64, ()> {
        Ok(100.0 * (x[1] - x[0].powi(2)).powi(2) + (1.0 - x[0]).powi(2))
    }

    const UNBOUNDED: (&[f64; 2], &[f64; 2]) = (&[f64::NEG_INFINITY; 2], &[f64::INFINITY; 2]);

    #[test]
    fn initial_simplex_perturbation() {
        let simplex = NelderMead::initial_simplex(&[2.0, 0.0]);
        assert_eq!(
            simplex,
            vec![vec![2.0, 0.0], vec![2.1, 0.0], vec![2.0, 0.00025]]
        );
    }

    #[test]
    fn first_evaluations_are_initial_simplex() {
        let mut points = vec![];
        NelderMead::default()
            .minimize(&[1.0, 20.8, 7.78], (&[0.0; 3], &[1.0; 3]), |x: &[f64; 3]| {
                points.push(*x);
                Ok::<_, ()>(x.iter().map(|v| v * v).sum())
            })
            .unwrap();
        assert_eq!(points[0], [1.0, 20.8, 7.78]);
        assert_abs_diff_eq!(&points[1][..], &[1.05, 20.8, 7.78][..], epsilon = 1e-12);
        assert_abs_diff_eq!(&points[2][..], &[1.0, 21.84, 7.78][..], epsilon = 1e-12);
        assert_abs_diff_eq!(&points[3][..], &[1.0, 20.8, 8.169][..], epsilon = 1e-12);
    }

    #[test]
    fn rosenbrock_minimum() {
        let nm = NelderMead::new(1e-10, Some(5000));
        let result = nm.minimize(&[-1.2, 1.0], UNBOUNDED, rosenbrock).unwrap();
        assert!(result.success);
        assert!(result.nit > 0);
        assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-3);
        assert!(result.fun < 1e-6);
        assert_eq!(result.fun, rosenbrock(&result.x).unwrap());
    }

    #[test]
    fn bounds_are_not_enforced() {
        let mut outside = 0;
        let result = NelderMead::default()
            .minimize(&[0.5], (&[0.0], &[1.0]), |x: &[f64; 1]| {
                if !(0.0..=1.0).contains(&x[0]) {
                    outside += 1;
                }
                Ok::<_, ()>((x[0] - 3.0).powi(2))
            })
            .unwrap();
        assert!(outside > 0);
        assert_abs_diff_eq!(result.x[0], 3.0, epsilon = 0.05);
    }

    #[test]
    fn budget_exhausted() {
        let nm = NelderMead::new(1e-12, Some(10));
        let mut calls = 0;
        let result = nm
            .minimize(&[-1.2, 1.0], UNBOUNDED, |x: &[f64; 2]| {
                calls += 1;
                rosenbrock(x)
            })
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.nfev, 10);
        assert_eq!(calls, 10);
        assert!(result.fun <= rosenbrock(&[-1.2, 1.0]).unwrap());
    }

    #[test]
    fn infinite_region_is_escaped() {
        let nm = NelderMead::default();
        let f = |x: &[f64; 1]| -> Result<f64, ()> {
            Ok(if x[0] > 2.0 {
                f64::INFINITY
            } else {
                (x[0] - 1.0).powi(2)
            })
        };
        let result = nm
            .minimize(&[1.9], (&[f64::NEG_INFINITY], &[f64::INFINITY]), f)
            .unwrap();
        assert!(result.fun < 1e-3);
        assert!(result.fun.is_finite());
    }

    #[test]
    fn objective_error_aborts() {
        let nm = NelderMead::default();
        let mut calls = 0;
        let err = nm
            .minimize(&[1.0, 1.0], UNBOUNDED, |x: &[f64; 2]| {
                calls += 1;
                if calls > 5 {
                    Err("failed")
                } else {
                    Ok(x[0].powi(2) + x[1].powi(2))
                }
            })
            .unwrap_err();
        assert_eq!(err, "failed");
        assert_eq!(calls, 6);
    }

    #[test]
    fn error_in_initial_simplex_aborts() {
        let mut calls = 0;
        let err = NelderMead::default()
            .minimize(&[1.0, 1.0, 1.0], (&[0.0; 3], &[2.0; 3]), |_: &[f64; 3]| {
                calls += 1;
                if calls == 2 { Err("first vertex") } else { Ok(1.0) }
            })
            .unwrap_err();
        assert_eq!(err, "first vertex");
        assert_eq!(calls, 2);
    }
}
