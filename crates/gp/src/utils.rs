use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Ix1, Ix2, Zip};

/// Divides each component of the `x` points by the lengthscale `ell`,
/// either a single value shared by all components or one value per component.
pub fn rescale<F: Float>(
    ell: &ArrayBase<impl Data<Elem = F>, Ix1>,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    if ell.len() == 1 {
        x.mapv(|v| v / ell[0])
    } else {
        x / ell
    }
}

/// Computes differences between each element of x and each element of y
/// resulting in a 3d array of shape (nrows(x), nrows(y), ncols(x)).
/// *Panics* if x and y have not the same column numbers
pub fn differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array3<F> {
    assert!(x.ncols() == y.ncols());

    let mut result = Array3::zeros((x.nrows(), y.nrows(), x.ncols()));
    Zip::from(result.outer_iter_mut())
        .and(x.rows())
        .for_each(|mut res_i, x_i| {
            Zip::from(res_i.rows_mut())
                .and(y.rows())
                .for_each(|mut res_ij, y_j| res_ij.assign(&(&x_i - &y_j)));
        });
    result
}

/// Euclidean distances between each element of x and each element of y
/// as a (nrows(x), nrows(y)) matrix.
pub fn distances<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    differences(x, y)
        .mapv(|v| v * v)
        .sum_axis(Axis(2))
        .mapv(|v| v.sqrt())
}

/// Checks that `x` points have `ndim` components
pub(crate) fn check_ndim<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ndim: usize,
) -> Result<()> {
    if x.ncols() != ndim {
        return Err(GpError::DimensionMismatch(format!(
            "expected points with {ndim} components, got {}",
            x.ncols()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![[-1.26491106], [-0.63245553], [0.], [0.63245553], [1.26491106]];
        let expected = array![
            [0.31622777, -0.31622777, -0.9486833, -1.58113883, -2.21359436],
            [0.44271887, -0.18973666, -0.82219219, -1.45464772, -2.08710326]
        ];
        let d = differences(&x, &y);
        assert_eq!(d.dim(), (2, 5, 1));
        assert_abs_diff_eq!(d.index_axis(Axis(2), 0), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_distances() {
        let x = array![[0., 0.], [3., 4.]];
        let d = distances(&x, &x);
        assert_abs_diff_eq!(d, array![[0., 5.], [5., 0.]], epsilon = 1e-12);
    }

    #[test]
    fn test_rescale() {
        let x = array![[1., 2.], [3., 4.]];
        assert_eq!(rescale(&array![2.], &x), array![[0.5, 1.], [1.5, 2.]]);
        assert_eq!(rescale(&array![1., 4.], &x), array![[1., 0.5], [3., 1.]]);
    }

    #[test]
    fn test_check_ndim() {
        let x = array![[1., 2.], [3., 4.]];
        assert!(check_ndim(&x, 2).is_ok());
        assert!(matches!(
            check_ndim(&x, 3),
            Err(GpError::DimensionMismatch(_))
        ));
    }
}
