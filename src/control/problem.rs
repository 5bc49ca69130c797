use approx::AbsDiffEq;
use nalgebra::{DMatrix, DVector, RealField};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LqError, LqResult};
use crate::utils::linalg::{check_len, check_shape, is_symmetric};

/// Continuous-time system that can be discretised into an [`LqProblem`].
pub trait LinearModel<T: RealField> {
    fn a(&self, dt: T) -> DMatrix<T>;
    fn b(&self, dt: T) -> DMatrix<T>;
    fn q(&self) -> &DMatrix<T>;
    fn r(&self) -> &DMatrix<T>;
}

/// Discounted infinite-horizon linear-quadratic problem
///
/// x' = A x + B u, stage cost xᵀQx + uᵀRu, discount γ.
///
/// Shapes, symmetry of Q and R and `0 < γ < 1` are checked once in
/// [`LqProblem::new`]; the matrices are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LqProblem<T: RealField> {
    a: DMatrix<T>,
    b: DMatrix<T>,
    q: DMatrix<T>,
    r: DMatrix<T>,
    gamma: T,
}

impl<T: RealField + Copy> LqProblem<T> {
    pub fn new(
        a: DMatrix<T>,
        b: DMatrix<T>,
        q: DMatrix<T>,
        r: DMatrix<T>,
        gamma: T,
    ) -> LqResult<LqProblem<T>> {
        let n = a.nrows();
        let m = b.ncols();
        check_shape("A", &a, (n, n))?;
        check_shape("B", &b, (n, m))?;
        check_shape("Q", &q, (n, n))?;
        check_shape("R", &r, (m, m))?;

        let tol = T::default_epsilon().sqrt();
        if !is_symmetric(&q, tol) {
            return Err(LqError::NotSymmetric { name: "Q" });
        }
        if !is_symmetric(&r, tol) {
            return Err(LqError::NotSymmetric { name: "R" });
        }
        if !(gamma > T::zero() && gamma < T::one()) {
            return Err(LqError::InvalidDiscount {
                gamma: nalgebra::try_convert(gamma).unwrap_or(f64::NAN),
            });
        }

        Ok(LqProblem { a, b, q, r, gamma })
    }

    pub fn from_model(model: &impl LinearModel<T>, dt: T, gamma: T) -> LqResult<LqProblem<T>> {
        LqProblem::new(
            model.a(dt),
            model.b(dt),
            model.q().clone(),
            model.r().clone(),
            gamma,
        )
    }

    pub fn a(&self) -> &DMatrix<T> {
        &self.a
    }

    pub fn b(&self) -> &DMatrix<T> {
        &self.b
    }

    pub fn q(&self) -> &DMatrix<T> {
        &self.q
    }

    pub fn r(&self) -> &DMatrix<T> {
        &self.r
    }

    pub fn gamma(&self) -> T {
        self.gamma
    }

    /// n
    pub fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    /// m
    pub fn action_dim(&self) -> usize {
        self.b.ncols()
    }

    pub(crate) fn check_gain(&self, k: &DMatrix<T>) -> LqResult<()> {
        check_shape("K", k, (self.action_dim(), self.state_dim()))
    }

    pub(crate) fn check_covariance(&self, sigma: &DMatrix<T>) -> LqResult<()> {
        let m = self.action_dim();
        check_shape("Sigma", sigma, (m, m))
    }

    pub(crate) fn check_state(&self, x: &DVector<T>) -> LqResult<()> {
        check_len("x", x, self.state_dim())
    }

    pub(crate) fn check_state_action(&self, z: &DVector<T>) -> LqResult<()> {
        check_len("z", z, self.state_dim() + self.action_dim())
    }
}

#[derive(Deserialize)]
struct LqProblemData<T: RealField> {
    a: DMatrix<T>,
    b: DMatrix<T>,
    q: DMatrix<T>,
    r: DMatrix<T>,
    gamma: T,
}

// Deserialisation goes through `new` so a loaded problem is validated like a built one.
impl<'de, T> Deserialize<'de> for LqProblem<T>
where
    T: RealField + Copy + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = LqProblemData::<T>::deserialize(deserializer)?;
        LqProblem::new(data.a, data.b, data.q, data.r, data.gamma)
            .map_err(serde::de::Error::custom)
    }
}
