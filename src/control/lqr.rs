use nalgebra::{DMatrix, DVector, RealField};

use crate::control::problem::{LinearModel, LqProblem};
use crate::control::riccati::{solve_riccati, RiccatiOptions};
use crate::error::LqResult;
use crate::utils::linalg::check_len;

/// u = -Kx
pub fn feedback<T: RealField + Copy>(k: &DMatrix<T>, x: &DVector<T>) -> LqResult<DVector<T>> {
    check_len("x", x, k.ncols())?;
    Ok(-(k * x))
}

/// Discounted LQR action for a linear model discretised at `dt`.
pub fn lqr<T: RealField + Copy>(
    x: &DVector<T>,
    dt: T,
    linear_model: &impl LinearModel<T>,
    gamma: T,
    options: &RiccatiOptions<T>,
) -> LqResult<DVector<T>> {
    let problem = LqProblem::from_model(linear_model, dt, gamma)?;
    problem.check_state(x)?;

    // Discrete time Algebraic Riccati Equation (DARE)
    let solution = solve_riccati(&problem, options)?;

    // LQR control
    feedback(&solution.gain, x)
}
