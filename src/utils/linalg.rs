use nalgebra::{DMatrix, DVector, RealField};

use crate::error::{LqError, LqResult};

pub fn check_shape<T: RealField>(
    name: &'static str,
    m: &DMatrix<T>,
    expected: (usize, usize),
) -> LqResult<()> {
    if m.shape() != expected {
        return Err(LqError::ShapeMismatch {
            name,
            expected,
            found: m.shape(),
        });
    }
    Ok(())
}

pub fn check_len<T: RealField>(name: &'static str, v: &DVector<T>, len: usize) -> LqResult<()> {
    if v.len() != len {
        return Err(LqError::ShapeMismatch {
            name,
            expected: (len, 1),
            found: v.shape(),
        });
    }
    Ok(())
}

/// Symmetric up to `tol`, relative to the largest entry.
pub fn is_symmetric<T: RealField + Copy>(m: &DMatrix<T>, tol: T) -> bool {
    if !m.is_square() {
        return false;
    }
    let scale = T::one() + m.abs().max();
    (m - m.transpose()).abs().max() <= tol * scale
}

/// Column-major `vec(M)`.
///
/// Every matrix that goes through the Kronecker system (L, dL, P) is
/// symmetric, and M itself is invariant under swapping the Kronecker factors,
/// so the storage order of nalgebra can be used directly.
pub fn vectorize<T: RealField + Copy>(m: &DMatrix<T>) -> DVector<T> {
    DVector::from_column_slice(m.as_slice())
}

pub fn unvectorize<T: RealField + Copy>(v: &DVector<T>, rows: usize, cols: usize) -> DMatrix<T> {
    DMatrix::from_column_slice(rows, cols, v.as_slice())
}

/// Matrix with a single one at `index`, counted in row-major order.
pub fn one_hot<T: RealField + Copy>(rows: usize, cols: usize, index: usize) -> DMatrix<T> {
    let mut m = DMatrix::zeros(rows, cols);
    m[(index / cols, index % cols)] = T::one();
    m
}

/// `tr(A B)` without forming the product.
pub fn trace_of_product<T: RealField + Copy>(a: &DMatrix<T>, b: &DMatrix<T>) -> T {
    a.component_mul(&b.transpose()).sum()
}

/// `xᵀ M x`
pub fn quadratic_form<T: RealField + Copy>(x: &DVector<T>, m: &DMatrix<T>) -> T {
    x.dot(&(m * x))
}

/// Assemble `[[a, b], [c, d]]`.
pub fn block2x2<T: RealField + Copy>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    c: &DMatrix<T>,
    d: &DMatrix<T>,
) -> DMatrix<T> {
    let (n, m) = (a.nrows(), d.nrows());
    let mut out = DMatrix::zeros(n + m, n + m);
    out.view_mut((0, 0), (n, n)).copy_from(a);
    out.view_mut((0, n), (n, m)).copy_from(b);
    out.view_mut((n, 0), (m, n)).copy_from(c);
    out.view_mut((n, n), (m, m)).copy_from(d);
    out
}
