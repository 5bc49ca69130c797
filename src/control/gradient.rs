use nalgebra::{DMatrix, DVector, RealField};
use rayon::prelude::*;
use tracing::debug;

use crate::control::problem::LqProblem;
use crate::control::value::{lyapunov_system, LyapunovSystem};
use crate::error::{LqError, LqResult};
use crate::utils::linalg::{one_hot, quadratic_form, trace_of_product, unvectorize, vectorize};

/// Gradient of the LQG state value J(x, K, Σ) with respect to K
///
/// Component `i` is the derivative along the one-hot direction δKᵢ, with `i`
/// running over K in row-major order. Differentiating M vec(P) = vec(L)
/// gives
///
/// vec(dPᵢ) = M⁻¹ (vec(dLᵢ) - dMᵢ vec(P))
/// dLᵢ = δKᵢᵀRK + KᵀRδKᵢ
/// dMᵢ = γ (Aᵀ⊗δKᵢᵀBᵀ + δKᵢᵀBᵀ⊗Aᵀ - δKᵢᵀBᵀ⊗KᵀBᵀ - KᵀBᵀ⊗δKᵢᵀBᵀ)
///
/// and the component itself is -(xᵀdPᵢx + γ tr(ΣBᵀdPᵢB) / (1 - γ)).
/// M⁻¹ is formed once and shared by all entries, which are evaluated in
/// parallel.
pub fn lqg_gradient<T>(
    x: &DVector<T>,
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
    sigma: &DMatrix<T>,
) -> LqResult<DVector<T>>
where
    T: RealField + Copy + Send + Sync,
{
    problem.check_state(x)?;
    problem.check_covariance(sigma)?;
    let LyapunovSystem { l, m } = lyapunov_system(problem, k)?;
    let m_inv = m.try_inverse().ok_or(LqError::SingularSystem {
        context: "gradient",
    })?;
    let vec_p = &m_inv * vectorize(&l);

    let n = problem.state_dim();
    let (rows, cols) = k.shape();
    let gamma = problem.gamma();
    let noise_scale = gamma / (T::one() - gamma);

    let a = problem.a();
    let b = problem.b();
    let at = a.transpose();
    let bt = b.transpose();
    let kt_bt = (b * k).transpose();
    let kt_r = k.transpose() * problem.r();
    let r_k = problem.r() * k;

    let entries = rows * cols;
    debug!(entries, size = n * n, "lqg gradient");

    let grad: Vec<T> = (0..entries)
        .into_par_iter()
        .map(|i| {
            let dk = one_hot::<T>(rows, cols, i);
            let dkt_bt = (b * &dk).transpose();

            let dl = dk.transpose() * &r_k + &kt_r * &dk;
            let dm = (at.kronecker(&dkt_bt) + dkt_bt.kronecker(&at)
                - dkt_bt.kronecker(&kt_bt)
                - kt_bt.kronecker(&dkt_bt))
                * gamma;

            let vec_dp = &m_inv * (vectorize(&dl) - dm * &vec_p);
            let dp = unvectorize(&vec_dp, n, n);

            let noise = trace_of_product(sigma, &(&bt * &dp * b));
            -(quadratic_form(x, &dp) + noise * noise_scale)
        })
        .collect();

    Ok(DVector::from_vec(grad))
}
