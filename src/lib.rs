//! Infinite-horizon, discounted, discrete-time LQR and LQG solvers.
//!
//! Optimal gains from the discounted Riccati iteration, quadratic value
//! functions of arbitrary linear policies through the Kronecker-vectorised
//! Lyapunov equation, state and state-action values, and the analytic policy
//! gradient of the Gaussian (LQG) objective with respect to the gain.
//!
//! The action convention throughout is u = -Kx and values are rewards, so
//! V(x) = -xᵀPx.

pub mod control;
pub mod error;
pub mod utils;

pub use error::{LqError, LqResult};
