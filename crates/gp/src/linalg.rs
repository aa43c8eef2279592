//! Dense linear algebra primitives used by the GP inference engine.
//!
//! This is a thin layer over [linfa-linalg](https://github.com/rust-ml/linfa-linalg)
//! Cholesky factorization and triangular solves. All factors are lower triangular.

use crate::errors::{GpError, Result};
use linfa::Float;
use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

/// Lower triangular Cholesky factor `L` of the symmetric positive definite matrix `m`
/// such that `m = L.L^T`.
///
/// Fails with [GpError::LinalgError] when `m` is not positive definite.
pub fn cholesky<F: Float>(m: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    Ok(m.cholesky()?)
}

/// Returns `m` with `v` added to each diagonal entry
pub fn add_diagonal<F: Float>(mut m: Array2<F>, v: F) -> Array2<F> {
    m.diag_mut().mapv_inplace(|d| d + v);
    m
}

/// Solves `L.x = b` (or `L^T.x = b` when `trans` is true) where `L` is lower triangular
/// and `b` is a (n, k) matrix.
pub fn solve_triangular<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    trans: bool,
) -> Result<Array2<F>> {
    let x = if trans {
        l.t().solve_triangular(b, UPLO::Upper)?
    } else {
        l.solve_triangular(b, UPLO::Lower)?
    };
    Ok(x)
}

/// Same as [solve_triangular] for a right-hand side given as a vector
pub fn solve_triangular_vec<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix1>,
    trans: bool,
) -> Result<Array1<F>> {
    let x = solve_triangular(l, &b.view().insert_axis(Axis(1)), trans)?;
    Ok(x.remove_axis(Axis(1)))
}

/// Extends the Cholesky factor `l` of a (n, n) matrix `K` to the factor of
///
/// ```text
/// | K    B |
/// | B^T  C |
/// ```
///
/// where `b` is the (n, m) cross term and `c` the (m, m) new diagonal block.
/// The whitened vector `a` solving `L.a = res` is extended with the new residuals `r`
/// so that it solves the extended system.
///
/// Costs O(n.m^2 + m^3) instead of O((n+m)^3) for a factorization from scratch.
pub fn cholesky_update<F: Float>(
    l: &ArrayBase<impl Data<Elem = F>, Ix2>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    c: &ArrayBase<impl Data<Elem = F>, Ix2>,
    a: &ArrayBase<impl Data<Elem = F>, Ix1>,
    r: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<(Array2<F>, Array1<F>)> {
    let n = l.nrows();
    let m = c.nrows();
    if b.dim() != (n, m) || c.ncols() != m || a.len() != n || r.len() != m {
        return Err(GpError::DimensionMismatch(format!(
            "cholesky update of a ({n}, {n}) factor expects a ({n}, {m}) cross term, \
             got B {:?}, C {:?}, a ({}), r ({})",
            b.dim(),
            c.dim(),
            a.len(),
            r.len()
        )));
    }

    // lower left block of the new factor, transposed
    let l21t = solve_triangular(l, b, false)?;
    let schur = c - &l21t.t().dot(&l21t);
    let l22 = cholesky(&schur)?;
    let a2 = solve_triangular_vec(&l22, &(r - &l21t.t().dot(a)), false)?;

    let mut l_ext = Array2::zeros((n + m, n + m));
    l_ext.slice_mut(s![..n, ..n]).assign(l);
    l_ext.slice_mut(s![n.., ..n]).assign(&l21t.t());
    l_ext.slice_mut(s![n.., n..]).assign(&l22);

    let mut a_ext = Array1::zeros(n + m);
    a_ext.slice_mut(s![..n]).assign(a);
    a_ext.slice_mut(s![n..]).assign(&a2);

    Ok((l_ext, a_ext))
}

/// Inverse `L^-T.L^-1` of the matrix whose Cholesky factor is `l`
pub fn cholesky_inverse<F: Float>(l: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
    let l_inv = solve_triangular(l, &Array2::eye(l.nrows()), false)?;
    Ok(l_inv.t().dot(&l_inv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn spd() -> Array2<f64> {
        array![
            [4.0, 1.0, 0.5, 0.2],
            [1.0, 3.0, 0.3, 0.1],
            [0.5, 0.3, 2.0, 0.4],
            [0.2, 0.1, 0.4, 1.5]
        ]
    }

    #[test]
    fn test_cholesky() {
        let m = spd();
        let l = cholesky(&m).unwrap();
        assert_abs_diff_eq!(l.dot(&l.t()), m, epsilon = 1e-12);
        assert_eq!(l[[0, 1]], 0.);
    }

    #[test]
    fn test_cholesky_not_positive_definite() {
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(cholesky(&m), Err(GpError::LinalgError(_))));
    }

    #[test]
    fn test_add_diagonal() {
        let m = add_diagonal(Array2::<f64>::zeros((3, 3)), 0.5);
        assert_eq!(m, Array2::<f64>::eye(3) * 0.5);
    }

    #[test]
    fn test_solve_triangular() {
        let l = cholesky(&spd()).unwrap();
        let b = array![[1.0], [2.0], [3.0], [4.0]];
        let x = solve_triangular(&l, &b, false).unwrap();
        assert_abs_diff_eq!(l.dot(&x), b, epsilon = 1e-12);
        let x = solve_triangular(&l, &b, true).unwrap();
        assert_abs_diff_eq!(l.t().dot(&x), b, epsilon = 1e-12);
        let v = solve_triangular_vec(&l, &array![1.0, 2.0, 3.0, 4.0], true).unwrap();
        assert_abs_diff_eq!(v, x.column(0), epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_update() {
        let m = spd();
        let res = array![0.3, -1.2, 0.7, 2.0];
        let l = cholesky(&m).unwrap();
        let a = solve_triangular_vec(&l, &res, false).unwrap();

        let l0 = cholesky(&m.slice(s![..2, ..2])).unwrap();
        let a0 = solve_triangular_vec(&l0, &res.slice(s![..2]), false).unwrap();
        let (l1, a1) = cholesky_update(
            &l0,
            &m.slice(s![..2, 2..]),
            &m.slice(s![2.., 2..]),
            &a0,
            &res.slice(s![2..]),
        )
        .unwrap();

        assert_abs_diff_eq!(l1, l, epsilon = 1e-12);
        assert_abs_diff_eq!(a1, a, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_update_bad_shapes() {
        let l = cholesky(&spd()).unwrap();
        let err = cholesky_update(
            &l,
            &Array2::zeros((3, 1)),
            &Array2::eye(1),
            &Array1::zeros(4),
            &Array1::zeros(1),
        );
        assert!(matches!(err, Err(GpError::DimensionMismatch(_))));
    }

    #[test]
    fn test_cholesky_inverse() {
        let m = spd();
        let l = cholesky(&m).unwrap();
        let inv = cholesky_inverse(&l).unwrap();
        assert_abs_diff_eq!(inv.dot(&m), Array2::<f64>::eye(4), epsilon = 1e-12);
    }
}
