mod cache;
mod evaluate;
mod gradient;
mod lqr;
mod problem;
mod riccati;
mod value;

pub use cache::ValueMatrixCache;
pub use evaluate::{
    action_value_matrix, lqg_action_value, lqg_state_value, lqr_action_value, lqr_state_value,
    QuadraticValue,
};
pub use gradient::lqg_gradient;
pub use lqr::{feedback, lqr};
pub use problem::{LinearModel, LqProblem};
pub use riccati::{
    solve_riccati, solve_riccati_gain, RiccatiOptions, RiccatiSolution, DEFAULT_MAX_ITERATIONS,
};
pub use value::{lyapunov_system, solve_value_matrix, LyapunovSystem};
