//! A ready to use GP model: gaussian likelihood, constant mean and a kernel chosen by name.
//!
//! Hyperparameters are exposed with short names: `sn2` (noise variance), `rho` (kernel
//! amplitude), `ell` (kernel lengthscales) and `mean` (constant mean value).

use crate::errors::{GpError, Result};
use crate::gp::Gp;
use crate::kernels::{Kernel, Matern, SquaredExponential};
use crate::likelihood::Gaussian;
use crate::mean::ConstantMean;
use crate::params::{ParamSpec, Parameterized};

use linfa::prelude::{DatasetBase, Fit, Float};
use linfa::ParamGuard;
use ndarray::{array, Array1, Array2, Array3, ArrayBase, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Kernel tags accepted by [BasicGp]
pub const KERNEL_TYPES: [&str; 4] = ["se", "matern1", "matern3", "matern5"];

/// Kernels selectable in a [BasicGp]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub enum BasicKernel<F: Float> {
    /// Squared exponential
    Se(SquaredExponential<F>),
    /// Matern
    Matern(Matern<F>),
}

impl<F: Float> BasicKernel<F> {
    /// Builds the kernel given its tag, one of [KERNEL_TYPES]
    pub fn new(kernel: &str, rho: F, ell: Array1<F>, ndim: Option<usize>) -> Result<Self> {
        let kern = match kernel {
            "se" => BasicKernel::Se(SquaredExponential::new(rho, ell, ndim)?),
            "matern1" => BasicKernel::Matern(Matern::new(rho, ell, 1, ndim)?),
            "matern3" => BasicKernel::Matern(Matern::new(rho, ell, 3, ndim)?),
            "matern5" => BasicKernel::Matern(Matern::new(rho, ell, 5, ndim)?),
            _ => {
                return Err(GpError::InvalidParameter(format!(
                    "unknown kernel type {kernel}, expected one of {KERNEL_TYPES:?}"
                )))
            }
        };
        Ok(kern)
    }

    /// Kernel tag
    pub fn kernel_type(&self) -> &'static str {
        match self {
            BasicKernel::Se(_) => "se",
            BasicKernel::Matern(k) => match k.d() {
                1 => "matern1",
                3 => "matern3",
                _ => "matern5",
            },
        }
    }

    /// Amplitude
    pub fn rho(&self) -> F {
        match self {
            BasicKernel::Se(k) => k.rho(),
            BasicKernel::Matern(k) => k.rho(),
        }
    }

    /// Lengthscales
    pub fn ell(&self) -> &Array1<F> {
        match self {
            BasicKernel::Se(k) => k.ell(),
            BasicKernel::Matern(k) => k.ell(),
        }
    }
}

impl<F: Float> Parameterized<F> for BasicKernel<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        match self {
            BasicKernel::Se(k) => k.param_specs(),
            BasicKernel::Matern(k) => k.param_specs(),
        }
    }

    fn params(&self) -> Array1<F> {
        match self {
            BasicKernel::Se(k) => k.params(),
            BasicKernel::Matern(k) => k.params(),
        }
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        match self {
            BasicKernel::Se(k) => k.set_params(theta),
            BasicKernel::Matern(k) => k.set_params(theta),
        }
    }
}

impl<F: Float> Kernel<F> for BasicKernel<F> {
    fn ndim(&self) -> usize {
        match self {
            BasicKernel::Se(k) => k.ndim(),
            BasicKernel::Matern(k) => k.ndim(),
        }
    }

    fn value(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array2<F>> {
        match self {
            BasicKernel::Se(k) => k.value(x1, x2),
            BasicKernel::Matern(k) => k.value(x1, x2),
        }
    }

    fn diag(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        match self {
            BasicKernel::Se(k) => k.diag(x),
            BasicKernel::Matern(k) => k.diag(x),
        }
    }

    fn grad(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Vec<Array2<F>>> {
        match self {
            BasicKernel::Se(k) => k.grad(x1, x2),
            BasicKernel::Matern(k) => k.grad(x1, x2),
        }
    }

    fn diag_grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>> {
        match self {
            BasicKernel::Se(k) => k.diag_grad(x),
            BasicKernel::Matern(k) => k.diag_grad(x),
        }
    }

    fn gradx(
        &self,
        x1: &ArrayBase<impl Data<Elem = F>, Ix2>,
        x2: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        match self {
            BasicKernel::Se(k) => k.gradx(x1, x2),
            BasicKernel::Matern(k) => k.gradx(x1, x2),
        }
    }
}

impl<F: Float> fmt::Display for BasicKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BasicKernel::Se(k) => write!(f, "{k}"),
            BasicKernel::Matern(k) => write!(f, "{k}"),
        }
    }
}

/// A GP with a gaussian likelihood, a constant mean and a [BasicKernel].
///
/// Dereferences to the underlying [Gp] for inference.
///
/// # Example
///
/// ```no_run
/// use reggie_gp::BasicGp;
/// use ndarray::array;
///
/// let mut gp = BasicGp::new(1e-6, 1.0, array![1.0], 0.0, Some(1), "matern3").unwrap();
/// gp.set_data(&array![[0.0], [1.0], [2.0]], &array![0.0, 1.0, 0.0]).unwrap();
/// gp.set_param("ell", &array![0.5]).unwrap();
/// let (mu, s2) = gp.posterior(&array![[1.0]], false).unwrap();
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct BasicGp<F: Float> {
    gp: Gp<F, BasicKernel<F>, ConstantMean<F>>,
}

impl<F: Float> BasicGp<F> {
    /// Constructor of an empty model.
    ///
    /// `kernel` is one of [KERNEL_TYPES]. When `ndim` is given, the kernel is isotropic
    /// and `ell` holds a single value, otherwise one lengthscale per input component is expected.
    pub fn new(
        sn2: F,
        rho: F,
        ell: Array1<F>,
        mean: F,
        ndim: Option<usize>,
        kernel: &str,
    ) -> Result<Self> {
        let kern = BasicKernel::new(kernel, rho, ell, ndim)?;
        let mut gp = Gp::new(Gaussian::new(sn2)?, kern, ConstantMean::new(mean));
        gp.rename(&[
            ("like.sn2", "sn2"),
            ("kern.rho", "rho"),
            ("kern.ell", "ell"),
            ("mean.bias", "mean"),
        ])?;
        Ok(BasicGp { gp })
    }

    /// Model parameters builder to be fitted on a dataset, see [BasicGpParams]
    pub fn params(sn2: F, rho: F, ell: Array1<F>) -> BasicGpParams<F> {
        BasicGpParams::new(sn2, rho, ell)
    }

    /// Kernel tag
    pub fn kernel_type(&self) -> &'static str {
        self.gp.kernel().kernel_type()
    }

    /// Underlying model
    pub fn into_inner(self) -> Gp<F, BasicKernel<F>, ConstantMean<F>> {
        self.gp
    }
}

impl<F: Float> Deref for BasicGp<F> {
    type Target = Gp<F, BasicKernel<F>, ConstantMean<F>>;

    fn deref(&self) -> &Self::Target {
        &self.gp
    }
}

impl<F: Float> DerefMut for BasicGp<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.gp
    }
}

impl<F: Float> fmt::Display for BasicGp<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BasicGp(kernel={}, sn2={}, rho={}, ell={}, mean={})",
            self.kernel_type(),
            self.gp.likelihood().sn2(),
            self.gp.kernel().rho(),
            self.gp.kernel().ell(),
            self.gp.mean().bias()
        )
    }
}

/// A set of validated [BasicGp] parameters
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub struct BasicGpValidParams<F: Float> {
    /// Noise variance
    sn2: F,
    /// Kernel amplitude
    rho: F,
    /// Kernel lengthscales
    ell: Array1<F>,
    /// Constant mean value
    mean: F,
    /// Input dimension of an isotropic kernel
    ndim: Option<usize>,
    /// Kernel tag
    kernel: String,
}

impl<F: Float> Default for BasicGpValidParams<F> {
    fn default() -> Self {
        BasicGpValidParams {
            sn2: F::cast(0.1),
            rho: F::one(),
            ell: array![F::one()],
            mean: F::zero(),
            ndim: None,
            kernel: "se".to_string(),
        }
    }
}

impl<F: Float> BasicGpValidParams<F> {
    /// Get noise variance
    pub fn sn2(&self) -> F {
        self.sn2
    }

    /// Get kernel amplitude
    pub fn rho(&self) -> F {
        self.rho
    }

    /// Get kernel lengthscales
    pub fn ell(&self) -> &Array1<F> {
        &self.ell
    }

    /// Get constant mean value
    pub fn mean(&self) -> F {
        self.mean
    }

    /// Get input dimension of an isotropic kernel
    pub fn ndim(&self) -> Option<usize> {
        self.ndim
    }

    /// Get kernel tag
    pub fn kernel(&self) -> &str {
        &self.kernel
    }
}

/// The set of hyperparameters that can be specified to build a [BasicGp]
/// fitted on a dataset.
///
/// When `ndim` is not specified and a single lengthscale is given, the kernel is
/// isotropic over the dataset input dimension.
#[derive(Clone, Debug)]
pub struct BasicGpParams<F: Float>(BasicGpValidParams<F>);

impl<F: Float> BasicGpParams<F> {
    /// A constructor for parameters given noise variance, kernel amplitude and lengthscales
    pub fn new(sn2: F, rho: F, ell: Array1<F>) -> Self {
        Self(BasicGpValidParams {
            sn2,
            rho,
            ell,
            ..Default::default()
        })
    }

    /// Set constant mean value.
    pub fn mean(mut self, mean: F) -> Self {
        self.0.mean = mean;
        self
    }

    /// Set input dimension, making the kernel isotropic.
    pub fn ndim(mut self, ndim: usize) -> Self {
        self.0.ndim = Some(ndim);
        self
    }

    /// Set kernel, one of [KERNEL_TYPES].
    pub fn kernel(mut self, kernel: &str) -> Self {
        self.0.kernel = kernel.to_string();
        self
    }
}

impl<F: Float> From<BasicGpValidParams<F>> for BasicGpParams<F> {
    fn from(valid: BasicGpValidParams<F>) -> Self {
        BasicGpParams(valid)
    }
}

impl<F: Float> ParamGuard for BasicGpParams<F> {
    type Checked = BasicGpValidParams<F>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let p = &self.0;
        BasicGp::new(p.sn2, p.rho, p.ell.clone(), p.mean, p.ndim, &p.kernel)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError>
    for BasicGpValidParams<F>
{
    type Object = BasicGp<F>;

    /// Build a [BasicGp] conditioned on the dataset
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        let ndim = match self.ndim {
            None if self.ell.len() == 1 => Some(x.ncols()),
            ndim => ndim,
        };
        let mut gp = BasicGp::new(
            self.sn2,
            self.rho,
            self.ell.clone(),
            self.mean,
            ndim,
            &self.kernel,
        )?;
        gp.set_data(x, y)?;
        Ok(gp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use linfa::prelude::{Dataset, Predict};
    use ndarray::{Array, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use paste::paste;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_unknown_kernel() {
        let res = BasicGp::new(0.1, 1., array![1.], 0., None, "unknown");
        assert!(matches!(res, Err(GpError::InvalidParameter(_))));
        let res = BasicGp::params(0.1, 1., array![1.]).kernel("matern2").check();
        assert!(matches!(res, Err(GpError::InvalidParameter(_))));
    }

    #[test]
    fn test_invalid_values() {
        assert!(BasicGp::new(-0.1, 1., array![1.], 0., None, "se").is_err());
        assert!(BasicGp::new(0.1, 0., array![1.], 0., None, "se").is_err());
        assert!(BasicGp::new(0.1, 1., array![1., 2.], 0., Some(2), "matern3").is_err());
        assert!(BasicGp::params(0.1, 1., array![1., -2.]).check().is_err());
    }

    #[test]
    fn test_aliases() {
        let mut gp = BasicGp::new(0.1, 1.5, array![1., 2.], 0.2, None, "matern5").unwrap();
        assert_eq!(gp.param_names(), vec!["sn2", "rho", "ell", "mean"]);
        assert_eq!(gp.params(), array![0.1, 1.5, 1., 2., 0.2]);
        assert_eq!(gp.nparams(), 5);
        gp.set_param("ell", &array![3., 4.]).unwrap();
        gp.set_param("mean", &array![-1.]).unwrap();
        assert_eq!(gp.param("ell").unwrap(), array![3., 4.]);
        assert_eq!(gp.mean().bias(), -1.);
        assert!(gp.param("kern.ell").is_err());
    }

    #[test]
    fn test_kernel_types() {
        for tag in KERNEL_TYPES {
            let gp = BasicGp::new(0.1, 1., array![1.], 0., Some(3), tag).unwrap();
            assert_eq!(gp.kernel_type(), tag);
            assert_eq!(gp.ndim(), 3);
            assert_eq!(gp.param("ell").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_observed_point() {
        let mut gp = BasicGp::new(1e-6, 1., array![1.], 0., Some(1), "matern3").unwrap();
        gp.set_data(&array![[0.], [1.], [2.]], &array![0., 1., 0.])
            .unwrap();
        let (mu, s2) = gp.posterior(&array![[1.]], false).unwrap();
        assert_abs_diff_eq!(mu[0], 1., epsilon = 1e-4);
        assert_abs_diff_eq!(s2[0], 1e-6, epsilon = 1e-6);
    }

    #[test]
    fn test_fit() {
        let xt = array![[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]];
        let yt = xt.column(0).mapv(|v: f64| v.sin());
        let gp = BasicGp::params(1e-8, 1., array![3.])
            .kernel("matern5")
            .mean(0.1)
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("GP fitted");
        assert_eq!(gp.ndata(), 7);
        assert_eq!(gp.ndim(), 1);
        assert_abs_diff_eq!(gp.predict(&xt), yt, epsilon = 1e-4);
        assert_eq!(
            gp.to_string(),
            "BasicGp(kernel=matern5, sn2=0.00000001, rho=1, ell=[3], mean=0.1)"
        );
    }

    #[test]
    fn test_fit_iso_dimension() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let xt = Array2::random_using((10, 3), Uniform::new(-1f64, 1.), &mut rng);
        let yt = xt.sum_axis(Axis(1));
        let gp = BasicGp::params(0.01, 1., array![0.5])
            .fit(&Dataset::new(xt.clone(), yt))
            .unwrap();
        assert_eq!(gp.ndim(), 3);
        assert_eq!(gp.param("ell").unwrap().len(), 1);

        let res = BasicGp::params(0.01, 1., array![0.5, 0.5])
            .fit(&Dataset::new(xt, Array1::<f64>::zeros(10)));
        assert!(matches!(res, Err(GpError::DimensionMismatch(_))));
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_save_load() {
        let mut gp = BasicGp::new(0.01, 1.2, array![0.7, 1.3], 0.4, None, "matern3").unwrap();
        gp.set_data(
            &array![[0., 1.], [1., 0.5], [2., 2.], [0.3, 1.7]],
            &array![0., 1., 0.5, -0.2],
        )
        .unwrap();

        let json = serde_json::to_string(&gp).expect("GP saved");
        let loaded: BasicGp<f64> = serde_json::from_str(&json).expect("GP loaded");

        assert_eq!(loaded.kernel_type(), "matern3");
        assert_eq!(loaded.param_names(), gp.param_names());
        assert_eq!(loaded.ndata(), 4);
        assert_abs_diff_eq!(loaded.loglike(), gp.loglike(), epsilon = 1e-10);
        let xq = array![[0.5, 0.5], [1.5, 1.]];
        let (mu, s2) = gp.posterior(&xq, false).unwrap();
        let (mu_loaded, s2_loaded) = loaded.posterior(&xq, false).unwrap();
        assert_abs_diff_eq!(mu_loaded, mu, epsilon = 1e-10);
        assert_abs_diff_eq!(s2_loaded, s2, epsilon = 1e-10);
    }

    macro_rules! test_basic_loglike_grad {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_loglike_grad_basic_ $kernel>]() {
                    let mut rng = Xoshiro256Plus::seed_from_u64(0);
                    let xt = Array2::random_using((8, 2), Uniform::new(0f64, 3.), &mut rng);
                    let yt = xt.map_axis(Axis(1), |r| (r[0] * r[1]).cos());
                    let ell = array![0.7, 1.3];
                    let mut gp =
                        BasicGp::new(0.05, 1.2, ell, 0.4, None, stringify!($kernel)).unwrap();
                    gp.set_data(&xt, &yt).unwrap();

                    let (_, dlz) = gp.loglike_grad().unwrap();
                    let f = |t: &Vec<f64>| {
                        let mut gp = gp.clone();
                        gp.set_params(&Array::from(t.clone())).unwrap();
                        gp.loglike()
                    };
                    let fdiff = gp.params().to_vec().central_diff(&f);
                    assert_abs_diff_eq!(dlz, Array1::from(fdiff), epsilon = 1e-4);
                }
            }
        };
    }

    test_basic_loglike_grad!(se);
    test_basic_loglike_grad!(matern1);
    test_basic_loglike_grad!(matern3);
    test_basic_loglike_grad!(matern5);
}
