use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::likelihood::Gaussian;
use crate::linalg::{
    add_diagonal, cholesky, cholesky_inverse, cholesky_update, solve_triangular,
    solve_triangular_vec,
};
use crate::mean::MeanFunction;
use crate::params::{Hyperparameters, Parameterized};
use crate::priors::Prior;
use crate::utils::check_ndim;

use linfa::prelude::{Float, PredictInplace};
use log::{debug, warn};
use ndarray::{
    concatenate, s, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix1, Ix2,
};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Jitter added to the posterior covariance diagonal before sampling
pub const SAMPLE_JITTER: f64 = 1e-10;

/// Sufficient statistics of a GP conditioned on a non empty training set
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct GpCache<F: Float> {
    /// Cholesky factor of the noisy covariance matrix K(X, X) + sn2.I
    l: Array2<F>,
    /// Whitened residuals, solution of L.a = Y - mean(X)
    a: Array1<F>,
}

/// Posterior mean and variance at query points along with their gradients
/// wrt the query point components.
#[derive(Clone, Debug)]
pub struct Posterior<F: Float> {
    /// Posterior mean (n,)
    pub mu: Array1<F>,
    /// Posterior variance of the latent function (n,)
    pub s2: Array1<F>,
    /// Gradient of the mean (n, nx)
    pub dmu: Array2<F>,
    /// Gradient of the variance (n, nx)
    pub ds2: Array2<F>,
}

/// Exact GP inference with a Gaussian likelihood.
///
/// The observations are modeled as
///
/// `y = f(x) + e` where `f ~ GP(mean(x), k(x, x'))` and `e ~ Normal(0, sn2)`
///
/// The model owns its likelihood, kernel and mean function together with the training
/// data. The Cholesky factor `L` of `K(X, X) + sn2.I` and the whitened residuals
/// `a = L^-1.(Y - mean(X))` are kept up to date on every mutation so that the
/// model is either empty (no data, no factor) or fitted.
///
/// # Incremental update
///
/// Adding `m` points to a model fitted on `n` points extends the factor in
/// O(n.m^2 + m^3) instead of refactorizing the (n+m, n+m) covariance matrix,
/// which matters in sequential designs (ie bayesian optimization) adding one point
/// at a time. Hyperparameter changes always trigger a full refit.
///
/// # Example
///
/// ```no_run
/// use reggie_gp::{ConstantMean, Gaussian, Gp, Matern};
/// use ndarray::array;
///
/// let kern = Matern::iso(1.0, 1.0, 3, 1).unwrap();
/// let mut gp = Gp::new(Gaussian::new(1e-6).unwrap(), kern, ConstantMean::new(0.0));
/// gp.set_data(&array![[0.0], [1.0], [2.0]], &array![0.0, 1.0, 0.0]).unwrap();
/// gp.add_data(&array![[3.0]], &array![-1.0]).unwrap();
///
/// let (mu, s2) = gp.posterior(&array![[1.5]], false).unwrap();
/// let (lz, dlz) = gp.loglike_grad().unwrap();
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize, K: Serialize, M: Serialize",
        deserialize = "F: Deserialize<'de>, K: Deserialize<'de>, M: Deserialize<'de>"
    ))
)]
pub struct Gp<F: Float, K: Kernel<F>, M: MeanFunction<F>> {
    like: Gaussian<F>,
    kern: K,
    mean: M,
    /// Flattened hyperparameters table in (likelihood, kernel, mean) order
    hyper: Hyperparameters<F>,
    /// Training inputs (n, nx)
    x: Array2<F>,
    /// Training outputs (n,)
    y: Array1<F>,
    /// `None` if and only if there is no training data
    cache: Option<GpCache<F>>,
}

fn full_update<F: Float, K: Kernel<F>, M: MeanFunction<F>>(
    like: &Gaussian<F>,
    kern: &K,
    mean: &M,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<Option<GpCache<F>>> {
    if x.nrows() == 0 {
        return Ok(None);
    }
    debug!("GP full update with {} points", x.nrows());
    let k = add_diagonal(kern.value_sym(x)?, like.sn2());
    let r = y - &mean.value(x)?;
    let l = cholesky(&k)?;
    let a = solve_triangular_vec(&l, &r, false)?;
    Ok(Some(GpCache { l, a }))
}

impl<F: Float, K: Kernel<F>, M: MeanFunction<F>> Gp<F, K, M> {
    /// GP constructor from its likelihood, kernel and mean function.
    /// The GP starts empty (no training data).
    pub fn new(like: Gaussian<F>, kern: K, mean: M) -> Self {
        let hyper = Hyperparameters::compose(&[
            ("like", like.param_specs()),
            ("kern", kern.param_specs()),
            ("mean", mean.param_specs()),
        ]);
        let ndim = kern.ndim();
        Gp {
            like,
            kern,
            mean,
            hyper,
            x: Array2::zeros((0, ndim)),
            y: Array1::zeros(0),
            cache: None,
        }
    }

    /// Number of training points
    pub fn ndata(&self) -> usize {
        self.x.nrows()
    }

    /// Dimension of input points
    pub fn ndim(&self) -> usize {
        self.kern.ndim()
    }

    /// Training data (X, Y)
    pub fn data(&self) -> (ArrayView2<'_, F>, ArrayView1<'_, F>) {
        (self.x.view(), self.y.view())
    }

    /// Likelihood
    pub fn likelihood(&self) -> &Gaussian<F> {
        &self.like
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.kern
    }

    /// Mean function
    pub fn mean(&self) -> &M {
        &self.mean
    }

    /// Hyperparameters table
    pub fn hyperparameters(&self) -> &Hyperparameters<F> {
        &self.hyper
    }

    /// Number of hyperparameter components
    pub fn nparams(&self) -> usize {
        self.hyper.nparams()
    }

    /// Hyperparameter names in flattening order
    pub fn param_names(&self) -> Vec<&str> {
        self.hyper.names()
    }

    /// Renames hyperparameters given (old name, new name) pairs
    pub fn rename(&mut self, aliases: &[(&str, &str)]) -> Result<()> {
        self.hyper.rename(aliases)
    }

    /// Flat hyperparameter vector: [likelihood, kernel, mean]
    pub fn params(&self) -> Array1<F> {
        concatenate![
            Axis(0),
            self.like.params(),
            self.kern.params(),
            self.mean.params()
        ]
    }

    /// Sets all hyperparameters from a flat vector and refits the model.
    ///
    /// On error (invalid values or covariance matrix not positive definite),
    /// the model is left unchanged.
    pub fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        self.hyper.check(theta)?;
        let nl = self.like.nparams();
        let nk = self.kern.nparams();

        let mut like = self.like;
        like.set_params(&theta.slice(s![..nl]))?;
        let mut kern = self.kern.clone();
        kern.set_params(&theta.slice(s![nl..nl + nk]))?;
        let mut mean = self.mean.clone();
        mean.set_params(&theta.slice(s![nl + nk..]))?;

        let cache = full_update(&like, &kern, &mean, &self.x, &self.y)?;
        debug!("GP hyperparameters set to {theta}");
        self.like = like;
        self.kern = kern;
        self.mean = mean;
        self.cache = cache;
        Ok(())
    }

    /// Value of the hyperparameter `name`
    pub fn param(&self, name: &str) -> Result<Array1<F>> {
        let range = self.hyper.get(name)?.range();
        Ok(self.params().slice(s![range]).to_owned())
    }

    /// Sets the value of the hyperparameter `name` and refits the model
    pub fn set_param(
        &mut self,
        name: &str,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        let range = self.hyper.get(name)?.range();
        if values.len() != range.len() {
            return Err(GpError::DimensionMismatch(format!(
                "parameter {name} has {} components, got {}",
                range.len(),
                values.len()
            )));
        }
        let mut theta = self.params();
        theta.slice_mut(s![range]).assign(values);
        self.set_params(&theta)
    }

    /// Attaches (or removes with `None`) a prior to the hyperparameter `name`
    pub fn set_prior(&mut self, name: &str, prior: Option<Prior<F>>) -> Result<()> {
        self.hyper.set_prior(name, prior)
    }

    /// Bounds of each flat hyperparameter component from domains and priors
    pub fn bounds(&self) -> Vec<(F, F)> {
        self.hyper.bounds()
    }

    /// Log prior of the current hyperparameters and its gradient
    pub fn log_prior_grad(&self) -> (F, Array1<F>) {
        self.hyper.log_prior_grad(&self.params().view())
    }

    /// Log prior of the current hyperparameters
    pub fn log_prior(&self) -> F {
        self.log_prior_grad().0
    }

    fn check_data(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        check_ndim(x, self.ndim())?;
        if x.nrows() != y.len() {
            return Err(GpError::DimensionMismatch(format!(
                "{} input points given with {} outputs",
                x.nrows(),
                y.len()
            )));
        }
        Ok(())
    }

    /// Replaces training data and refits the model from scratch
    pub fn set_data(
        &mut self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        self.check_data(x, y)?;
        let cache = full_update(&self.like, &self.kern, &self.mean, x, y)?;
        self.x = x.to_owned();
        self.y = y.to_owned();
        self.cache = cache;
        Ok(())
    }

    /// Appends training data, updating the Cholesky factor incrementally when
    /// the model is already fitted.
    pub fn add_data(
        &mut self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        self.check_data(x, y)?;
        if x.nrows() == 0 {
            return Ok(());
        }
        match self.update_incremental(x, y)? {
            Some(cache) => {
                self.x = concatenate![Axis(0), self.x, x.view()];
                self.y = concatenate![Axis(0), self.y, y.view()];
                self.cache = Some(cache);
                Ok(())
            }
            None => self.set_data(x, y),
        }
    }

    /// Discards all training data
    pub fn reset(&mut self) {
        let ndim = self.ndim();
        self.x = Array2::zeros((0, ndim));
        self.y = Array1::zeros(0);
        self.cache = None;
    }

    /// Extended sufficient statistics when adding `(x, y)` to a fitted model,
    /// `None` when the model is empty.
    fn update_incremental(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Option<GpCache<F>>> {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return Ok(None),
        };
        debug!(
            "GP incremental update with {} points added to {}",
            x.nrows(),
            self.ndata()
        );
        let b = self.kern.value(&self.x, x)?;
        let c = add_diagonal(self.kern.value_sym(x)?, self.like.sn2());
        let r = y - &self.mean.value(x)?;
        let (l, a) = cholesky_update(&cache.l, &b, &c, &cache.a, &r)?;
        Ok(Some(GpCache { l, a }))
    }

    /// Log marginal likelihood of the training data, 0 when there is no data
    pub fn loglike(&self) -> F {
        match &self.cache {
            None => F::zero(),
            Some(cache) => {
                let half = F::cast(0.5);
                let n = F::cast(self.ndata());
                -half * cache.a.dot(&cache.a)
                    - half * F::cast(2. * std::f64::consts::PI).ln() * n
                    - cache.l.diag().mapv(|v| v.ln()).sum()
            }
        }
    }

    /// Log marginal likelihood and its gradient wrt the flat hyperparameters
    /// ordered as [noise, kernel parameters, mean parameters].
    pub fn loglike_grad(&self) -> Result<(F, Array1<F>)> {
        let cache = match &self.cache {
            None => return Ok((F::zero(), Array1::zeros(self.nparams()))),
            Some(cache) => cache,
        };
        let half = F::cast(0.5);
        let alpha = solve_triangular_vec(&cache.l, &cache.a, true)?;
        let alpha_col = alpha.view().insert_axis(Axis(1));
        let q = cholesky_inverse(&cache.l)? - alpha_col.dot(&alpha_col.t());

        let mut dlz = Vec::with_capacity(self.nparams());
        // noise
        dlz.push(-half * q.diag().sum());
        for dk in self.kern.grad(&self.x, &self.x)? {
            dlz.push(-half * (&q * &dk).sum());
        }
        for dmu in self.mean.grad(&self.x)? {
            dlz.push(dmu.dot(&alpha));
        }
        Ok((self.loglike(), Array1::from(dlz)))
    }

    /// Prior mean and variance at `x` reduced by the information brought by the training
    /// data. Also returns `V = L^-1.K(X, x)` when the model is fitted.
    fn posterior_terms(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>, Option<Array2<F>>)> {
        check_ndim(x, self.ndim())?;
        let mut mu = self.mean.value(x)?;
        let mut s2 = self.kern.diag(x)?;
        let v = match &self.cache {
            Some(cache) => {
                let k = self.kern.value(&self.x, x)?;
                let v = solve_triangular(&cache.l, &k, false)?;
                mu += &v.t().dot(&cache.a);
                s2 -= &v.mapv(|e| e * e).sum_axis(Axis(0));
                Some(v)
            }
            None => None,
        };
        if s2.iter().any(|&v| v < F::zero()) {
            warn!("Negative posterior variance due to round-off errors: {s2}");
        }
        Ok((mu, s2, v))
    }

    /// Posterior mean and variance at `x` points specified as a (n, nx) matrix.
    ///
    /// When `predictive` is true the variance is the one of a new noisy observation
    /// instead of the latent function. Variances are not clamped and may be slightly
    /// negative because of round-off errors.
    pub fn posterior(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        predictive: bool,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let (mu, mut s2, _) = self.posterior_terms(x)?;
        if predictive {
            let sn2 = self.like.sn2();
            s2.mapv_inplace(|v| v + sn2);
        }
        Ok((mu, s2))
    }

    /// Posterior mean and latent variance at `x` points with their gradients wrt
    /// the components of `x`.
    pub fn posterior_grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Posterior<F>> {
        let (mu, s2, v) = self.posterior_terms(x)?;

        // the prior variance of a stationary kernel does not depend on x
        let mut ds2 = Array2::zeros(x.dim());
        let mut dmu = self
            .mean
            .gradx(x)?
            .unwrap_or_else(|| Array2::zeros(x.dim()));

        if let (Some(cache), Some(v)) = (&self.cache, &v) {
            let dk = self.kern.gradx(x, &self.x)?;
            let two = F::cast(2.);
            for k in 0..self.ndim() {
                let dk_k = dk.index_axis(Axis(2), k);
                let dv = solve_triangular(&cache.l, &dk_k.t(), false)?;
                let mut dmu_k = dmu.column_mut(k);
                dmu_k += &dv.t().dot(&cache.a);
                let mut ds2_k = ds2.column_mut(k);
                ds2_k -= &((&dv * v).sum_axis(Axis(0)) * two);
            }
        }
        Ok(Posterior { mu, s2, dmu, ds2 })
    }

    /// Draws one function sample at `x` points from the posterior (prior if the
    /// model has no data). With `latent` false, observation noise is added.
    pub fn sample<R: Rng>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        latent: bool,
        rng: &mut R,
    ) -> Result<Array1<F>> {
        Ok(self.sample_n(x, 1, latent, rng)?.remove_axis(Axis(0)))
    }

    /// Draws `size` independent function samples at `x` points as a (size, n) matrix.
    pub fn sample_n<R: Rng>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        size: usize,
        latent: bool,
        rng: &mut R,
    ) -> Result<Array2<F>> {
        check_ndim(x, self.ndim())?;
        let n = x.nrows();
        let mut mu = self.mean.value(x)?;
        let mut sigma = self.kern.value_sym(x)?;
        if let Some(cache) = &self.cache {
            let k = self.kern.value(&self.x, x)?;
            let v = solve_triangular(&cache.l, &k, false)?;
            mu += &v.t().dot(&cache.a);
            sigma -= &v.t().dot(&v);
        }

        // noise free process: jitter only guards against round-off errors
        let l = cholesky(&add_diagonal(sigma, F::cast(SAMPLE_JITTER)))?;
        let z = Array2::<f64>::random_using((size, n), StandardNormal, rng).mapv(|v| F::cast(v));
        let mut f = z.dot(&l.t()) + &mu;

        if !latent {
            let sn = self.like.sn2().sqrt();
            let e = Array2::<f64>::random_using((size, n), StandardNormal, rng)
                .mapv(|v| F::cast(v) * sn);
            f += &e;
        }
        Ok(f)
    }

    /// Adaptor implementing `linfa::Predict` for the posterior variance
    pub fn variance_predictor(&self) -> GpVariancePredictor<'_, F, K, M> {
        GpVariancePredictor(self)
    }
}

impl<F: Float, K: Kernel<F>, M: MeanFunction<F>> fmt::Display for Gp<F, K, M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(like={}, kern={}, mean={}, ndata={})",
            self.like,
            self.kern,
            self.mean,
            self.ndata()
        )
    }
}

impl<F, D, K, M> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for Gp<F, K, M>
where
    F: Float,
    D: Data<Elem = F>,
    K: Kernel<F>,
    M: MeanFunction<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let (mu, _) = self.posterior(x, false).expect("GP Prediction");
        *y = mu;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

/// Gausssian Process adaptator to implement `linfa::Predict` trait for variance prediction.
pub struct GpVariancePredictor<'a, F, K, M>(&'a Gp<F, K, M>)
where
    F: Float,
    K: Kernel<F>,
    M: MeanFunction<F>;

impl<F, D, K, M> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for GpVariancePredictor<'_, F, K, M>
where
    F: Float,
    D: Data<Elem = F>,
    K: Kernel<F>,
    M: MeanFunction<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let (_, s2) = self.0.posterior(x, false).expect("GP Prediction");
        *y = s2;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}
