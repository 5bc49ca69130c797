use nalgebra::{DMatrix, RealField};
use tracing::debug;

use crate::control::problem::LqProblem;
use crate::error::{LqError, LqResult};
use crate::utils::linalg::{unvectorize, vectorize};

/// Vectorised discounted Lyapunov equation `M vec(P) = vec(L)` of a fixed gain
///
/// For u = -Kx the value matrix solves P = L + γ(A - BK)ᵀ P (A - BK) with
/// L = Q + KᵀRK. Expanding the closed loop and applying the Kronecker identity
/// gives
///
/// M = I - γ (Aᵀ⊗Aᵀ - Aᵀ⊗KᵀBᵀ - KᵀBᵀ⊗Aᵀ + KᵀBᵀ⊗KᵀBᵀ)
///
/// an n²×n² system, so every solve costs O(n⁶).
#[derive(Debug, Clone)]
pub struct LyapunovSystem<T: RealField> {
    pub l: DMatrix<T>,
    pub m: DMatrix<T>,
}

pub fn lyapunov_system<T: RealField + Copy>(
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
) -> LqResult<LyapunovSystem<T>> {
    problem.check_gain(k)?;
    let n = problem.state_dim();

    let at = problem.a().transpose();
    let kt_bt = (problem.b() * k).transpose();

    let l = problem.q() + k.transpose() * problem.r() * k;
    let kron = at.kronecker(&at) - at.kronecker(&kt_bt) - kt_bt.kronecker(&at)
        + kt_bt.kronecker(&kt_bt);
    let m = DMatrix::identity(n * n, n * n) - kron * problem.gamma();
    debug!(size = n * n, "assembled lyapunov system");

    Ok(LyapunovSystem { l, m })
}

impl<T: RealField + Copy> LyapunovSystem<T> {
    /// Exact LU solve for P.
    pub fn solve(&self) -> LqResult<DMatrix<T>> {
        let n = self.l.nrows();
        let vec_p = self
            .m
            .clone()
            .lu()
            .solve(&vectorize(&self.l))
            .ok_or(LqError::SingularSystem {
                context: "value matrix",
            })?;
        Ok(unvectorize(&vec_p, n, n))
    }
}

/// P such that V(x) = -xᵀPx is the discounted return of u = -Kx.
pub fn solve_value_matrix<T: RealField + Copy>(
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
) -> LqResult<DMatrix<T>> {
    lyapunov_system(problem, k)?.solve()
}
