//! A module for covariance functions (kernels) of the GP model.
//!
//! The following kernels are implemented:
//! * matern with smoothness d = 1, 3 or 5,
//! * squared exponential.
//!
//! Both come in two flavours: isotropic (one lengthscale shared by all input components)
//! or ARD (automatic relevance determination, one lengthscale per input component).

use crate::errors::{GpError, Result};
use crate::params::{check_values, Domain, ParamSpec, Parameterized};
use crate::utils::{check_ndim, differences, distances, rescale};
use linfa::Float;
use ndarray::{Array1, Array2, Array3, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance under which the lengthscale and input gradients are set to zero
pub const DIST_EPSILON: f64 = 1e-12;

/// A trait for using a covariance function in GP inference
pub trait Kernel<F: Float>: Parameterized<F> + Clone + fmt::Display {
    /// Dimension of input points
    fn ndim(&self) -> usize;

    /// Covariance matrix k(x1, x2) of shape (n1, n2)
    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>>;

    /// Covariance matrix k(x, x)
    fn value_sym(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.value(x, x)
    }

    /// Diagonal of k(x, x)
    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>>;

    /// Derivatives of k(x1, x2) wrt each hyperparameter component in
    /// [Parameterized::param_specs] order
    fn grad(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Vec<Array2<F>>>;

    /// Derivatives of the diagonal of k(x, x) wrt each hyperparameter component
    fn diag_grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>>;

    /// Derivatives of k(x1, x2) wrt the components of `x1` as a (n1, n2, ndim) array
    fn gradx(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>>;
}

/// Shared lengthscale handling of stationary kernels
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
struct Lengthscale<F: Float> {
    ell: Array1<F>,
    iso: bool,
    ndim: usize,
}

impl<F: Float> Lengthscale<F> {
    fn new(ell: Array1<F>, ndim: Option<usize>) -> Result<Self> {
        let (iso, ndim) = match ndim {
            Some(ndim) => {
                if ell.len() != 1 {
                    return Err(GpError::DimensionMismatch(format!(
                        "isotropic kernel expects a single lengthscale, got {ell}"
                    )));
                }
                (true, ndim)
            }
            None => (false, ell.len()),
        };
        if ndim == 0 {
            return Err(GpError::InvalidParameter(
                "kernel input dimension should be positive".to_string(),
            ));
        }
        if ell.iter().any(|&l| !Domain::Positive.contains(l)) {
            return Err(GpError::InvalidParameter(format!(
                "lengthscale should be positive, got {ell}"
            )));
        }
        Ok(Lengthscale { ell, iso, ndim })
    }

    /// One lengthscale value per input component
    fn per_dim(&self) -> Array1<F> {
        if self.iso {
            Array1::from_elem(self.ndim, self.ell[0])
        } else {
            self.ell.to_owned()
        }
    }

    fn rescaled(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>)> {
        check_ndim(x1, self.ndim)?;
        check_ndim(x2, self.ndim)?;
        Ok((rescale(&self.ell, x1), rescale(&self.ell, x2)))
    }

    fn spec(&self) -> ParamSpec {
        ParamSpec::vector("ell", self.ell.len(), Domain::Positive)
    }
}

fn check_amplitude<F: Float>(rho: F) -> Result<()> {
    if !Domain::Positive.contains(rho) {
        return Err(GpError::InvalidParameter(format!(
            "amplitude rho should be positive, got {rho}"
        )));
    }
    Ok(())
}

/// Smoothness class of the matern kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
enum Smoothness {
    D1,
    D3,
    D5,
}

impl Smoothness {
    /// Polynomial factor of the kernel
    fn f<F: Float>(&self, r: F) -> F {
        match self {
            Smoothness::D1 => F::one(),
            Smoothness::D3 => F::one() + r,
            Smoothness::D5 => F::one() + r * (F::one() + r / F::cast(3.)),
        }
    }

    /// `f(r) - f'(r) = g(r)`, factor of the kernel derivative wrt distance
    fn g<F: Float>(&self, r: F) -> F {
        match self {
            Smoothness::D1 => F::one(),
            Smoothness::D3 => r,
            Smoothness::D5 => r * (F::one() + r) / F::cast(3.),
        }
    }

    fn order(&self) -> usize {
        match self {
            Smoothness::D1 => 1,
            Smoothness::D3 => 3,
            Smoothness::D5 => 5,
        }
    }
}

/// Matern kernel
///
/// `k(x, x') = rho * exp(-r) * f_d(r)` where `r = |(x - x') / ell|` and
/// * `f_1(r) = 1`
/// * `f_3(r) = 1 + r`
/// * `f_5(r) = 1 + r + r^2 / 3`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Matern<F: Float> {
    rho: F,
    ell: Lengthscale<F>,
    d: Smoothness,
}

impl<F: Float> Matern<F> {
    /// Matern kernel constructor.
    ///
    /// `d` has to be one of 1, 3 or 5. When `ndim` is given the kernel is isotropic and `ell`
    /// should hold one value, otherwise the kernel is ARD with one lengthscale per
    /// input component (ie `ndim = ell.len()`).
    pub fn new(rho: F, ell: Array1<F>, d: usize, ndim: Option<usize>) -> Result<Self> {
        let d = match d {
            1 => Smoothness::D1,
            3 => Smoothness::D3,
            5 => Smoothness::D5,
            _ => {
                return Err(GpError::InvalidParameter(format!(
                    "d must be one of 1, 3, or 5, got {d}"
                )))
            }
        };
        check_amplitude(rho)?;
        Ok(Matern {
            rho,
            ell: Lengthscale::new(ell, ndim)?,
            d,
        })
    }

    /// Isotropic matern kernel on `ndim`-dimensional inputs
    pub fn iso(rho: F, ell: F, d: usize, ndim: usize) -> Result<Self> {
        Self::new(rho, Array1::from_elem(1, ell), d, Some(ndim))
    }

    /// ARD matern kernel with one lengthscale per input component
    pub fn ard(rho: F, ell: Array1<F>, d: usize) -> Result<Self> {
        Self::new(rho, ell, d, None)
    }

    /// Smoothness class d
    pub fn d(&self) -> usize {
        self.d.order()
    }

    /// Whether the lengthscale is shared by all input components
    pub fn is_iso(&self) -> bool {
        self.ell.iso
    }

    /// Amplitude
    pub fn rho(&self) -> F {
        self.rho
    }

    /// Lengthscale(s)
    pub fn ell(&self) -> &Array1<F> {
        &self.ell.ell
    }

    /// rho * exp(-r) * g_d(r) / r, set to 0 for (nearly) coincident points
    fn dist_factor(&self, dist: &Array2<F>) -> Array2<F> {
        let eps = F::cast(DIST_EPSILON);
        dist.mapv(|r| {
            if r < eps {
                F::zero()
            } else {
                self.rho * (-r).exp() * self.d.g(r) / r
            }
        })
    }
}

impl<F: Float> Parameterized<F> for Matern<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::scalar("rho", Domain::Positive), self.ell.spec()]
    }

    fn params(&self) -> Array1<F> {
        let mut theta = vec![self.rho];
        theta.extend(self.ell.ell.iter());
        Array1::from(theta)
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_values(&self.param_specs(), theta)?;
        self.rho = theta[0];
        self.ell.ell.assign(&theta.slice(ndarray::s![1..]));
        Ok(())
    }
}

impl<F: Float> Kernel<F> for Matern<F> {
    fn ndim(&self) -> usize {
        self.ell.ndim
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        let (x1, x2) = self.ell.rescaled(x1, x2)?;
        let dist = distances(&x1, &x2);
        Ok(dist.mapv(|r| self.rho * (-r).exp() * self.d.f(r)))
    }

    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        check_ndim(x, self.ell.ndim)?;
        Ok(Array1::from_elem(x.nrows(), self.rho))
    }

    fn grad(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Vec<Array2<F>>> {
        let (x1, x2) = self.ell.rescaled(x1, x2)?;
        let dist = distances(&x1, &x2);
        let eps = F::cast(DIST_EPSILON);

        // derivative wrt rho
        let mut grads = vec![dist.mapv(|r| (-r).exp() * self.d.f(r))];
        let m = dist.mapv(|r| self.rho * (-r).exp() * self.d.g(r));
        if self.ell.iso {
            let ell = self.ell.ell[0];
            grads.push(
                Zip::from(&m)
                    .and(&dist)
                    .map_collect(|&m, &r| if r < eps { F::zero() } else { m * r / ell }),
            );
        } else {
            let diff = differences(&x1, &x2);
            for (i, &ell) in self.ell.ell.iter().enumerate() {
                grads.push(
                    Zip::from(&m)
                        .and(&dist)
                        .and(diff.index_axis(Axis(2), i))
                        .map_collect(|&m, &r, &di| {
                            if r < eps {
                                F::zero()
                            } else {
                                m * di * di / r / ell
                            }
                        }),
                );
            }
        }
        Ok(grads)
    }

    fn diag_grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>> {
        check_ndim(x, self.ell.ndim)?;
        let mut grads = vec![Array1::ones(x.nrows())];
        grads.extend((0..self.ell.ell.len()).map(|_| Array1::zeros(x.nrows())));
        Ok(grads)
    }

    fn gradx(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        let (x1, x2) = self.ell.rescaled(x1, x2)?;
        let mut g = differences(&x1, &x2);
        let m = self.dist_factor(&distances(&x1, &x2));
        let ell = self.ell.per_dim();
        Zip::from(g.lanes_mut(Axis(2)))
            .and(&m)
            .for_each(|mut lane, &mij| {
                Zip::from(&mut lane)
                    .and(&ell)
                    .for_each(|v, &l| *v = -mij * *v / l);
            });
        Ok(g)
    }
}

impl<F: Float> fmt::Display for Matern<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ell.iso {
            write!(
                f,
                "Matern(rho={}, ell={}, d={}, ndim={})",
                self.rho,
                self.ell.ell[0],
                self.d.order(),
                self.ell.ndim
            )
        } else {
            write!(
                f,
                "Matern(rho={}, ell={}, d={})",
                self.rho,
                self.ell.ell,
                self.d.order()
            )
        }
    }
}

/// Squared exponential kernel
///
/// `k(x, x') = rho * exp(-r^2 / 2)` where `r = |(x - x') / ell|`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponential<F: Float> {
    rho: F,
    ell: Lengthscale<F>,
}

impl<F: Float> SquaredExponential<F> {
    /// Squared exponential kernel constructor, isotropic when `ndim` is given, ARD otherwise.
    pub fn new(rho: F, ell: Array1<F>, ndim: Option<usize>) -> Result<Self> {
        check_amplitude(rho)?;
        Ok(SquaredExponential {
            rho,
            ell: Lengthscale::new(ell, ndim)?,
        })
    }

    /// Whether the lengthscale is shared by all input components
    pub fn is_iso(&self) -> bool {
        self.ell.iso
    }

    /// Amplitude
    pub fn rho(&self) -> F {
        self.rho
    }

    /// Lengthscales
    pub fn ell(&self) -> &Array1<F> {
        &self.ell.ell
    }

    /// Squared rescaled distances, kernel matrix and rescaled differences
    fn components(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array2<F>, Array2<F>, Array3<F>)> {
        let (x1, x2) = self.ell.rescaled(x1, x2)?;
        let diff = differences(&x1, &x2);
        let sq_dist = diff.mapv(|v| v * v).sum_axis(Axis(2));
        let k = sq_dist.mapv(|d2| self.rho * (F::cast(-0.5) * d2).exp());
        Ok((sq_dist, k, diff))
    }
}

impl<F: Float> Parameterized<F> for SquaredExponential<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::scalar("rho", Domain::Positive), self.ell.spec()]
    }

    fn params(&self) -> Array1<F> {
        let mut theta = vec![self.rho];
        theta.extend(self.ell.ell.iter());
        Array1::from(theta)
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_values(&self.param_specs(), theta)?;
        self.rho = theta[0];
        self.ell.ell.assign(&theta.slice(ndarray::s![1..]));
        Ok(())
    }
}

impl<F: Float> Kernel<F> for SquaredExponential<F> {
    fn ndim(&self) -> usize {
        self.ell.ndim
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        Ok(self.components(x1, x2)?.1)
    }

    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        check_ndim(x, self.ell.ndim)?;
        Ok(Array1::from_elem(x.nrows(), self.rho))
    }

    fn grad(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Vec<Array2<F>>> {
        let (sq_dist, k, diff) = self.components(x1, x2)?;
        let mut grads = vec![k.mapv(|v| v / self.rho)];
        if self.ell.iso {
            let ell = self.ell.ell[0];
            grads.push(&k * &sq_dist / ell);
        } else {
            for (i, &ell) in self.ell.ell.iter().enumerate() {
                let di = diff.index_axis(Axis(2), i);
                grads.push(&k * &di.mapv(|v| v * v) / ell);
            }
        }
        Ok(grads)
    }

    fn diag_grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>> {
        check_ndim(x, self.ell.ndim)?;
        let mut grads = vec![Array1::ones(x.nrows())];
        grads.extend((0..self.ell.ell.len()).map(|_| Array1::zeros(x.nrows())));
        Ok(grads)
    }

    fn gradx(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        let (_, k, mut g) = self.components(x1, x2)?;
        let ell = self.ell.per_dim();
        Zip::from(g.lanes_mut(Axis(2)))
            .and(&k)
            .for_each(|mut lane, &kij| {
                Zip::from(&mut lane)
                    .and(&ell)
                    .for_each(|v, &l| *v = -kij * *v / l);
            });
        Ok(g)
    }
}

impl<F: Float> fmt::Display for SquaredExponential<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ell.iso {
            write!(
                f,
                "SE(rho={}, ell={}, ndim={})",
                self.rho, self.ell.ell[0], self.ell.ndim
            )
        } else {
            write!(f, "SE(rho={}, ell={})", self.rho, self.ell.ell)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::{array, s};
    use paste::paste;

    fn xpoints() -> Array2<f64> {
        array![
            [0.1, -0.4],
            [1.2, 0.3],
            [-0.7, 0.9],
            [0.5, 0.5],
            [2.0, -1.1]
        ]
    }

    #[test]
    fn test_matern_bad_smoothness() {
        let res = Matern::new(1., array![1.], 2, Some(1));
        assert!(matches!(res, Err(GpError::InvalidParameter(_))));
    }

    #[test]
    fn test_matern_bad_values() {
        assert!(Matern::iso(-1., 1., 3, 1).is_err());
        assert!(Matern::iso(1., 0., 3, 1).is_err());
        assert!(Matern::new(1., array![1., 2.], 3, Some(2)).is_err());
        assert!(Matern::<f64>::ard(1., Array1::from(vec![]), 3).is_err());
    }

    #[test]
    fn test_matern_modes() {
        let iso = Matern::iso(1., 0.5, 5, 3).unwrap();
        assert!(iso.is_iso());
        assert_eq!(iso.ndim(), 3);
        assert_eq!(iso.nparams(), 2);
        let ard = Matern::ard(1., array![0.5, 1., 2.], 5).unwrap();
        assert!(!ard.is_iso());
        assert_eq!(ard.ndim(), 3);
        assert_eq!(ard.nparams(), 4);
        assert_eq!(ard.params(), array![1., 0.5, 1., 2.]);
    }

    #[test]
    fn test_matern_values() {
        let x = array![[0.], [1.], [2.]];
        let k1 = Matern::iso(2., 1., 1, 1).unwrap().value_sym(&x).unwrap();
        assert_abs_diff_eq!(k1[[0, 2]], 2. * (-2f64).exp(), epsilon = 1e-12);
        let k3 = Matern::iso(1., 1., 3, 1).unwrap().value_sym(&x).unwrap();
        assert_abs_diff_eq!(k3[[0, 1]], 2. * (-1f64).exp(), epsilon = 1e-12);
        let k5 = Matern::iso(1., 2., 5, 1).unwrap().value_sym(&x).unwrap();
        assert_abs_diff_eq!(
            k5[[0, 2]],
            (1. + 1. + 1. / 3.) * (-1f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let kern = Matern::iso(1., 1., 3, 3).unwrap();
        assert!(matches!(
            kern.value_sym(&xpoints()),
            Err(GpError::DimensionMismatch(_))
        ));
        assert!(kern.diag(&xpoints()).is_err());
        assert!(kern.gradx(&xpoints(), &xpoints()).is_err());
    }

    #[test]
    fn test_set_params() {
        let mut kern = Matern::ard(1., array![1., 1.], 3).unwrap();
        kern.set_params(&array![2., 0.5, 3.]).unwrap();
        assert_eq!(kern.rho(), 2.);
        assert_eq!(kern.ell(), &array![0.5, 3.]);
        assert!(kern.set_params(&array![2., 0.5]).is_err());
        assert!(kern.set_params(&array![2., -0.5, 1.]).is_err());
        assert_eq!(kern.params(), array![2., 0.5, 3.]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Matern::iso(1., 2., 5, 1).unwrap().to_string(),
            "Matern(rho=1, ell=2, d=5, ndim=1)"
        );
        assert_eq!(
            SquaredExponential::new(1., array![2.], Some(1))
                .unwrap()
                .to_string(),
            "SE(rho=1, ell=2, ndim=1)"
        );
    }

    #[test]
    fn test_near_duplicate_points_gradients() {
        let x1 = array![[0.3, 0.3]];
        let x2 = array![[0.3 + 1e-14, 0.3]];
        for d in [1, 3, 5] {
            let kern = Matern::ard(1.5, array![0.7, 1.3], d).unwrap();
            let grads = kern.grad(&x1, &x2).unwrap();
            assert_eq!(grads[1][[0, 0]], 0.);
            assert_eq!(grads[2][[0, 0]], 0.);
            let gx = kern.gradx(&x1, &x2).unwrap();
            assert!(gx.iter().all(|&v| v == 0.));

            let kern = Matern::iso(1.5, 0.7, d, 2).unwrap();
            assert_eq!(kern.grad(&x1, &x1).unwrap()[1][[0, 0]], 0.);
            assert!(kern.gradx(&x1, &x1).unwrap().iter().all(|&v| v == 0.));
        }
    }

    macro_rules! test_kernel {
        ($name:ident, $kernel:expr) => {
            paste! {
                #[test]
                fn [<test_ $name _symmetric_psd>]() {
                    let kern = $kernel;
                    let x = xpoints();
                    let k = kern.value_sym(&x).unwrap();
                    assert_abs_diff_eq!(k, k.t(), epsilon = 1e-14);
                    // positive semi-definite: factorizable once a tiny jitter is added
                    let kj = crate::linalg::add_diagonal(k.to_owned(), 1e-10);
                    assert!(crate::linalg::cholesky(&kj).is_ok());
                    assert_abs_diff_eq!(kern.diag(&x).unwrap(), k.diag(), epsilon = 1e-14);
                }

                #[test]
                fn [<test_ $name _grad_finite_diff>]() {
                    let kern = $kernel;
                    let x1 = xpoints();
                    let x2 = xpoints().slice(s![1..4, ..]).mapv(|v| v + 0.25);
                    let grads = kern.grad(&x1, &x2).unwrap();
                    assert_eq!(grads.len(), kern.nparams());

                    let theta = kern.params().to_vec();
                    for i in 0..x1.nrows() {
                        for j in 0..x2.nrows() {
                            let f = |t: &Vec<f64>| {
                                let mut k = kern.clone();
                                k.set_params(&Array1::from(t.clone())).unwrap();
                                k.value(&x1, &x2).unwrap()[[i, j]]
                            };
                            let fdiff = theta.central_diff(&f);
                            for (p, g) in grads.iter().enumerate() {
                                assert_abs_diff_eq!(g[[i, j]], fdiff[p], epsilon = 1e-6);
                            }
                        }
                    }

                    let dgrads = kern.diag_grad(&x1).unwrap();
                    assert_eq!(dgrads.len(), kern.nparams());
                    let self_grads = kern.grad(&x1, &x1).unwrap();
                    for (dg, g) in dgrads.iter().zip(self_grads.iter()) {
                        assert_abs_diff_eq!(*dg, g.diag(), epsilon = 1e-12);
                    }
                }

                #[test]
                fn [<test_ $name _gradx_finite_diff>]() {
                    let kern = $kernel;
                    let x1 = xpoints();
                    let x2 = xpoints().slice(s![1..4, ..]).mapv(|v| v - 0.35);
                    let gx = kern.gradx(&x1, &x2).unwrap();
                    assert_eq!(gx.dim(), (5, 3, 2));
                    for i in 0..x1.nrows() {
                        for j in 0..x2.nrows() {
                            let f = |x: &Vec<f64>| {
                                let xi = Array2::from_shape_vec((1, 2), x.clone()).unwrap();
                                kern.value(&xi, &x2.slice(s![j..j + 1, ..])).unwrap()[[0, 0]]
                            };
                            let fdiff = x1.row(i).to_vec().central_diff(&f);
                            assert_abs_diff_eq!(
                                gx.slice(s![i, j, ..]),
                                Array1::from(fdiff),
                                epsilon = 1e-6
                            );
                        }
                    }
                }
            }
        };
    }

    test_kernel!(matern1_iso, Matern::iso(1.3, 0.8, 1, 2).unwrap());
    test_kernel!(matern3_iso, Matern::iso(1.3, 0.8, 3, 2).unwrap());
    test_kernel!(matern5_iso, Matern::iso(1.3, 0.8, 5, 2).unwrap());
    test_kernel!(matern1_ard, Matern::ard(0.9, array![0.6, 1.7], 1).unwrap());
    test_kernel!(matern3_ard, Matern::ard(0.9, array![0.6, 1.7], 3).unwrap());
    test_kernel!(matern5_ard, Matern::ard(0.9, array![0.6, 1.7], 5).unwrap());
    test_kernel!(se_iso, SquaredExponential::new(1.3, array![0.8], Some(2)).unwrap());
    test_kernel!(se_ard, SquaredExponential::new(0.9, array![0.6, 1.7], None).unwrap());
}
