use nalgebra::{DMatrix, DVector, RealField};

use crate::control::problem::LqProblem;
use crate::control::value::solve_value_matrix;
use crate::error::LqResult;
use crate::utils::linalg::{block2x2, check_shape, quadratic_form, trace_of_product};

/// Quadratic value function of one gain, with P solved once.
///
/// Every free function in this module builds one of these and throws it away,
/// so callers evaluating many states under the same K should hold on to it
/// (or go through [`crate::control::ValueMatrixCache`]).
#[derive(Debug, Clone)]
pub struct QuadraticValue<'a, T: RealField> {
    problem: &'a LqProblem<T>,
    p: DMatrix<T>,
}

impl<'a, T: RealField + Copy> QuadraticValue<'a, T> {
    pub fn new(problem: &'a LqProblem<T>, k: &DMatrix<T>) -> LqResult<QuadraticValue<'a, T>> {
        let p = solve_value_matrix(problem, k)?;
        Ok(QuadraticValue { problem, p })
    }

    /// Wrap an already solved value matrix.
    pub fn from_value_matrix(
        problem: &'a LqProblem<T>,
        p: DMatrix<T>,
    ) -> LqResult<QuadraticValue<'a, T>> {
        let n = problem.state_dim();
        check_shape("P", &p, (n, n))?;
        Ok(QuadraticValue { problem, p })
    }

    pub fn value_matrix(&self) -> &DMatrix<T> {
        &self.p
    }

    pub fn into_value_matrix(self) -> DMatrix<T> {
        self.p
    }

    // R + γBᵀPB
    fn action_block(&self) -> DMatrix<T> {
        let b = self.problem.b();
        self.problem.r() + b.transpose() * &self.p * b * self.problem.gamma()
    }

    /// tr(Σ (R + γBᵀPB)): expected one-step cost of the Gaussian action noise.
    pub fn noise_penalty(&self, sigma: &DMatrix<T>) -> LqResult<T> {
        self.problem.check_covariance(sigma)?;
        Ok(trace_of_product(sigma, &self.action_block()))
    }

    /// V(x) = -xᵀPx
    pub fn state_value(&self, x: &DVector<T>) -> LqResult<T> {
        self.problem.check_state(x)?;
        Ok(-quadratic_form(x, &self.p))
    }

    /// V(x) = -xᵀPx - tr(Σ(R + γBᵀPB)) / (1 - γ)
    pub fn lqg_state_value(&self, x: &DVector<T>, sigma: &DMatrix<T>) -> LqResult<T> {
        let penalty = self.noise_penalty(sigma)?;
        Ok(self.state_value(x)? - penalty / (T::one() - self.problem.gamma()))
    }

    /// [[Q + γAᵀPA, γAᵀPB], [γBᵀPA, R + γBᵀPB]]
    pub fn action_value_matrix(&self) -> DMatrix<T> {
        let gamma = self.problem.gamma();
        let a = self.problem.a();
        let b = self.problem.b();
        let at_p = a.transpose() * &self.p;

        let xx = self.problem.q() + &at_p * a * gamma;
        let xu = &at_p * b * gamma;
        let ux = xu.transpose();
        block2x2(&xx, &xu, &ux, &self.action_block())
    }

    /// Q(z) = -zᵀMz for z = [x; u]
    pub fn action_value(&self, z: &DVector<T>) -> LqResult<T> {
        self.problem.check_state_action(z)?;
        Ok(-quadratic_form(z, &self.action_value_matrix()))
    }

    /// Q(z) = -zᵀMz - γ/(1 - γ) tr(Σ(R + γBᵀPB))
    pub fn lqg_action_value(&self, z: &DVector<T>, sigma: &DMatrix<T>) -> LqResult<T> {
        let gamma = self.problem.gamma();
        let penalty = self.noise_penalty(sigma)?;
        Ok(self.action_value(z)? - penalty * gamma / (T::one() - gamma))
    }
}

pub fn lqr_state_value<T: RealField + Copy>(
    x: &DVector<T>,
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
) -> LqResult<T> {
    problem.check_state(x)?;
    QuadraticValue::new(problem, k)?.state_value(x)
}

pub fn lqg_state_value<T: RealField + Copy>(
    x: &DVector<T>,
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
    sigma: &DMatrix<T>,
) -> LqResult<T> {
    problem.check_state(x)?;
    problem.check_covariance(sigma)?;
    QuadraticValue::new(problem, k)?.lqg_state_value(x, sigma)
}

pub fn lqr_action_value<T: RealField + Copy>(
    z: &DVector<T>,
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
) -> LqResult<T> {
    problem.check_state_action(z)?;
    QuadraticValue::new(problem, k)?.action_value(z)
}

pub fn lqg_action_value<T: RealField + Copy>(
    z: &DVector<T>,
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
    sigma: &DMatrix<T>,
) -> LqResult<T> {
    problem.check_state_action(z)?;
    problem.check_covariance(sigma)?;
    QuadraticValue::new(problem, k)?.lqg_action_value(z, sigma)
}

pub fn action_value_matrix<T: RealField + Copy>(
    problem: &LqProblem<T>,
    k: &DMatrix<T>,
) -> LqResult<DMatrix<T>> {
    Ok(QuadraticValue::new(problem, k)?.action_value_matrix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::lqr::feedback;
    use crate::error::LqError;
    use nalgebra::{dmatrix, dvector};
    use std::error::Error;

    fn double_integrator() -> LqResult<LqProblem<f64>> {
        LqProblem::new(
            dmatrix![1.0, 0.1; 0.0, 1.0],
            dmatrix![0.0; 0.1],
            dmatrix![1.0, 0.0; 0.0, 0.5],
            dmatrix![0.1],
            0.95,
        )
    }

    fn gain() -> DMatrix<f64> {
        dmatrix![1.0, 2.0]
    }

    fn stack(x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(x.len() + u.len(), x.iter().chain(u.iter()).copied())
    }

    #[test]
    fn scalar_state_value() -> Result<(), Box<dyn Error>> {
        let problem = LqProblem::new(dmatrix![1.0], dmatrix![1.0], dmatrix![1.0], dmatrix![1.0], 0.9)?;
        let v = lqr_state_value(&dvector![2.0], &problem, &dmatrix![0.5])?;
        approx::assert_abs_diff_eq!(v, -4.0 * 1.25 / 0.775, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn action_value_at_policy_action_is_state_value() -> Result<(), Box<dyn Error>> {
        let problem = double_integrator()?;
        let k = gain();
        for x in [dvector![1.0, -0.5], dvector![0.0, 3.0], dvector![-2.0, 0.25]] {
            let u = feedback(&k, &x)?;
            let q = lqr_action_value(&stack(&x, &u), &problem, &k)?;
            let v = lqr_state_value(&x, &problem, &k)?;
            approx::assert_abs_diff_eq!(q, v, epsilon = 1e-8);
        }
        Ok(())
    }

    #[test]
    fn lqg_without_noise_is_lqr() -> Result<(), Box<dyn Error>> {
        let problem = double_integrator()?;
        let k = gain();
        let x = dvector![1.0, -0.5];
        let z = dvector![1.0, -0.5, 0.3];
        let zero = DMatrix::zeros(1, 1);

        assert_eq!(
            lqg_state_value(&x, &problem, &k, &zero)?,
            lqr_state_value(&x, &problem, &k)?
        );
        assert_eq!(
            lqg_action_value(&z, &problem, &k, &zero)?,
            lqr_action_value(&z, &problem, &k)?
        );
        Ok(())
    }

    #[test]
    fn noise_penalty_terms() -> Result<(), Box<dyn Error>> {
        let problem = double_integrator()?;
        let value = QuadraticValue::new(&problem, &gain())?;
        let sigma = dmatrix![0.2];
        let x = dvector![1.0, -0.5];

        let p = value.value_matrix();
        let b = problem.b();
        let c = 0.2 * (0.1 + 0.95 * (b.transpose() * p * b)[(0, 0)]);
        approx::assert_abs_diff_eq!(value.noise_penalty(&sigma)?, c, epsilon = 1e-12);

        let v = value.lqg_state_value(&x, &sigma)?;
        approx::assert_abs_diff_eq!(v, value.state_value(&x)? - c / 0.05, epsilon = 1e-9);

        // V(x) = E[Q(x, u)] for u ~ N(-Kx, Σ)
        let z = stack(&x, &feedback(&gain(), &x)?);
        let q = value.lqg_action_value(&z, &sigma)?;
        approx::assert_abs_diff_eq!(v, q - c, epsilon = 1e-8);
        Ok(())
    }

    #[test]
    fn action_value_matrix_blocks() -> Result<(), Box<dyn Error>> {
        let problem = double_integrator()?;
        let value = QuadraticValue::new(&problem, &gain())?;
        let m = value.action_value_matrix();
        assert_eq!(m.shape(), (3, 3));
        approx::assert_abs_diff_eq!(m.clone(), m.transpose(), epsilon = 1e-9);

        let p = value.value_matrix();
        let uu = problem.r() + problem.b().transpose() * p * problem.b() * 0.95;
        approx::assert_abs_diff_eq!(m[(2, 2)], uu[(0, 0)], epsilon = 1e-12);
        assert_eq!(action_value_matrix(&problem, &gain())?, m);
        Ok(())
    }

    #[test]
    fn shapes_are_checked_first() -> Result<(), Box<dyn Error>> {
        let problem = double_integrator()?;
        let k = gain();

        let err = lqr_state_value(&dvector![1.0], &problem, &k).unwrap_err();
        assert!(matches!(err, LqError::ShapeMismatch { name: "x", .. }));

        let err = lqr_action_value(&dvector![1.0, 2.0], &problem, &k).unwrap_err();
        assert!(matches!(err, LqError::ShapeMismatch { name: "z", .. }));

        let err = lqg_state_value(&dvector![1.0, 2.0], &problem, &k, &DMatrix::zeros(2, 2))
            .unwrap_err();
        assert!(matches!(err, LqError::ShapeMismatch { name: "Sigma", .. }));

        let err = QuadraticValue::from_value_matrix(&problem, DMatrix::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, LqError::ShapeMismatch { name: "P", .. }));
        Ok(())
    }
}
