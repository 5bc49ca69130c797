use nalgebra::{DMatrix, RealField};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::control::problem::LqProblem;
use crate::error::{LqError, LqResult};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiccatiOptions<T> {
    pub max_iterations: usize,
    /// Stop once `max |P' - P|` drops below this. `None` always runs the full budget.
    pub tolerance: Option<T>,
}

impl<T> Default for RiccatiOptions<T> {
    fn default() -> Self {
        RiccatiOptions {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiccatiSolution<T: RealField> {
    /// Feedback gain K, u = -Kx
    pub gain: DMatrix<T>,
    /// P after the last update
    pub value: DMatrix<T>,
    pub iterations: usize,
    /// `max |P' - P|` of the last update, zero if no update ran
    pub residual: T,
    /// `None` when no tolerance was requested
    pub converged: Option<bool>,
}

/// K = γ (R + γ BᵀPB)⁻¹ BᵀPA
pub(crate) fn riccati_gain<T: RealField + Copy>(
    problem: &LqProblem<T>,
    p: &DMatrix<T>,
) -> LqResult<DMatrix<T>> {
    let gamma = problem.gamma();
    let b = problem.b();
    let bt_p = b.transpose() * p;
    let s = problem.r() + &bt_p * b * gamma;
    let s_inv = s.try_inverse().ok_or(LqError::SingularSystem {
        context: "riccati gain",
    })?;
    Ok(s_inv * bt_p * problem.a() * gamma)
}

/// Q + γ(AᵀPA - KᵀBᵀPA - AᵀPBK + KᵀBᵀPBK) + KᵀRK
pub(crate) fn riccati_rhs<T: RealField + Copy>(
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
    p: &DMatrix<T>,
) -> DMatrix<T> {
    let a = problem.a();
    let b = problem.b();
    let at = a.transpose();
    let kt_bt = (b * k).transpose();
    let pa = p * a;
    let pbk = p * b * k;

    let inner = &at * &pa - &kt_bt * &pa - &at * &pbk + &kt_bt * &pbk;
    problem.q() + inner * problem.gamma() + k.transpose() * problem.r() * k
}

/// Discounted Riccati fixed-point iteration starting from P = I.
pub fn solve_riccati<T: RealField + Copy>(
    problem: &LqProblem<T>,
    options: &RiccatiOptions<T>,
) -> LqResult<RiccatiSolution<T>> {
    let n = problem.state_dim();
    let mut p = DMatrix::<T>::identity(n, n);
    let mut k = riccati_gain(problem, &p)?;

    let mut residual = T::zero();
    let mut iterations = 0;
    let mut converged = options.tolerance.map(|_| false);

    while iterations < options.max_iterations {
        let pn = riccati_rhs(problem, &k, &p);
        residual = (&pn - &p).abs().max();
        p = pn;
        k = riccati_gain(problem, &p)?;
        iterations += 1;

        if let Some(tolerance) = options.tolerance {
            if residual < tolerance {
                converged = Some(true);
                break;
            }
        }
    }

    if converged == Some(false) {
        warn!(
            iterations,
            residual = %residual,
            "riccati iteration did not reach tolerance"
        );
    }
    debug!(iterations, residual = %residual, "riccati iteration done");

    Ok(RiccatiSolution {
        gain: k,
        value: p,
        iterations,
        residual,
        converged,
    })
}

/// Optimal gain after exactly `max_iterations` updates, no convergence test.
pub fn solve_riccati_gain<T: RealField + Copy>(
    problem: &LqProblem<T>,
    max_iterations: usize,
) -> LqResult<DMatrix<T>> {
    let options = RiccatiOptions {
        max_iterations,
        tolerance: None,
    };
    Ok(solve_riccati(problem, &options)?.gain)
}
