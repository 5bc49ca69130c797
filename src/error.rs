use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LqError {
    #[error("{name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("{name} must be symmetric")]
    NotSymmetric { name: &'static str },
    #[error("discount factor must lie in (0, 1), got {gamma}")]
    InvalidDiscount { gamma: f64 },
    /// A matrix inverse or linear solve hit a zero pivot.
    #[error("singular system in {context}")]
    SingularSystem { context: &'static str },
}

pub type LqResult<T> = Result<T, LqError>;
