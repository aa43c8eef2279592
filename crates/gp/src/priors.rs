//! Prior distributions over hyperparameters.
//!
//! All priors defined here treat the components of a hyperparameter vector as
//! independent. They provide the log density (with its gradient) used to
//! regularize marginal likelihood maximization and a sampler used to draw
//! initial hyperparameter values.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Zip};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::{StandardNormal, Uniform as UniformDist};
use ndarray_rand::RandomExt;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A prior distribution over a hyperparameter of size `ndim`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Prior<F: Float> {
    /// Uniform distribution on `[a_i, b_i]`
    Uniform {
        /// lower bounds
        a: Array1<F>,
        /// upper bounds
        b: Array1<F>,
    },
    /// Normal distribution with mean `mu_i` and variance `s2_i`
    Normal {
        /// means
        mu: Array1<F>,
        /// variances
        s2: Array1<F>,
    },
    /// Log-normal distribution where `log(theta_i)` is normal with mean `mu_i` and variance `s2_i`
    LogNormal {
        /// means of the log values
        mu: Array1<F>,
        /// variances of the log values
        s2: Array1<F>,
    },
    /// Horseshoe distribution with scale parameters `scale_i`
    Horseshoe {
        /// scale parameters
        scale: Array1<F>,
    },
}

fn check_same_len<F: Float>(what: &str, u: &Array1<F>, v: &Array1<F>) -> Result<()> {
    if u.len() != v.len() || u.is_empty() {
        return Err(GpError::InvalidParameter(format!(
            "{what} prior parameters should be non empty and of same size, got {} and {}",
            u.len(),
            v.len()
        )));
    }
    Ok(())
}

fn check_positive<F: Float>(what: &str, v: &Array1<F>) -> Result<()> {
    if v.iter().any(|&x| x <= F::zero()) {
        return Err(GpError::InvalidParameter(format!(
            "{what} prior parameters should be positive, got {v}"
        )));
    }
    Ok(())
}

impl<F: Float> Prior<F> {
    /// Uniform prior with bounds `a_i < b_i`
    pub fn uniform(a: Array1<F>, b: Array1<F>) -> Result<Self> {
        check_same_len("Uniform", &a, &b)?;
        if !Zip::from(&a).and(&b).all(|lo, up| lo < up) {
            return Err(GpError::InvalidParameter(format!(
                "malformed upper/lower bounds: {a} / {b}"
            )));
        }
        Ok(Prior::Uniform { a, b })
    }

    /// Normal prior
    pub fn normal(mu: Array1<F>, s2: Array1<F>) -> Result<Self> {
        check_same_len("Normal", &mu, &s2)?;
        check_positive("Normal", &s2)?;
        Ok(Prior::Normal { mu, s2 })
    }

    /// Log-normal prior
    pub fn lognormal(mu: Array1<F>, s2: Array1<F>) -> Result<Self> {
        check_same_len("LogNormal", &mu, &s2)?;
        check_positive("LogNormal", &s2)?;
        Ok(Prior::LogNormal { mu, s2 })
    }

    /// Horseshoe prior
    pub fn horseshoe(scale: Array1<F>) -> Result<Self> {
        check_same_len("Horseshoe", &scale, &scale)?;
        check_positive("Horseshoe", &scale)?;
        Ok(Prior::Horseshoe { scale })
    }

    /// Number of components the prior is defined on
    pub fn ndim(&self) -> usize {
        match self {
            Prior::Uniform { a, .. } => a.len(),
            Prior::Normal { mu, .. } | Prior::LogNormal { mu, .. } => mu.len(),
            Prior::Horseshoe { scale } => scale.len(),
        }
    }

    /// Support of the prior for each component
    pub fn bounds(&self) -> Array1<(F, F)> {
        match self {
            Prior::Uniform { a, b } => Zip::from(a).and(b).map_collect(|&lo, &up| (lo, up)),
            Prior::Normal { mu, .. } => {
                Array1::from_elem(mu.len(), (F::neg_infinity(), F::infinity()))
            }
            Prior::LogNormal { .. } | Prior::Horseshoe { .. } => {
                Array1::from_elem(self.ndim(), (F::epsilon(), F::infinity()))
            }
        }
    }

    /// Log density evaluated at `theta`
    pub fn log_prior(&self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> F {
        self.log_prior_grad(theta).0
    }

    /// Log density evaluated at `theta` and its gradient wrt `theta`
    pub fn log_prior_grad(&self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> (F, Array1<F>) {
        let half = F::cast(0.5);
        let two_pi = F::cast(2. * std::f64::consts::PI);
        match self {
            // improper outside of the bounds, constant otherwise
            Prior::Uniform { .. } => (F::zero(), Array1::zeros(theta.len())),
            Prior::Normal { mu, s2 } => {
                let logp = Zip::from(theta).and(mu).and(s2).fold(F::zero(), |acc, &t, &m, &s| {
                    acc - half * (two_pi * s).ln() - half * (t - m) * (t - m) / s
                });
                let dlogp = Zip::from(theta)
                    .and(mu)
                    .and(s2)
                    .map_collect(|&t, &m, &s| -(t - m) / s);
                (logp, dlogp)
            }
            Prior::LogNormal { mu, s2 } => {
                let logp = Zip::from(theta).and(mu).and(s2).fold(F::zero(), |acc, &t, &m, &s| {
                    let lt = t.ln();
                    acc - lt - half * (two_pi * s).ln() - half * (lt - m) * (lt - m) / s
                });
                let dlogp = Zip::from(theta)
                    .and(mu)
                    .and(s2)
                    .map_collect(|&t, &m, &s| -((t.ln() - m) / s + F::one()) / t);
                (logp, dlogp)
            }
            Prior::Horseshoe { scale } => {
                let theta2_inv = Zip::from(scale)
                    .and(theta)
                    .map_collect(|&s, &t| (s / t) * (s / t));
                let inner = theta2_inv.mapv(|v| v.ln_1p());
                let logp = inner.mapv(|v| v.ln()).sum();
                let dlogp = Zip::from(&theta2_inv)
                    .and(&inner)
                    .and(theta)
                    .map_collect(|&u, &i, &t| u / (F::one() + u) / i * F::cast(-2.) / t);
                (logp, dlogp)
            }
        }
    }

    /// Draws one sample of size `ndim` from the prior using the given random generator
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<Array1<F>> {
        let n = self.ndim();
        match self {
            Prior::Uniform { a, b } => {
                let u = Array1::random_using(n, UniformDist::new(0f64, 1.), rng)
                    .mapv(|v| F::cast(v));
                Ok(a + &((b - a) * u))
            }
            Prior::Normal { mu, s2 } => {
                let z = Array1::<f64>::random_using(n, StandardNormal, rng).mapv(|v| F::cast(v));
                Ok(mu + &(s2.mapv(|s| s.sqrt()) * z))
            }
            Prior::LogNormal { mu, s2 } => {
                let z = Array1::<f64>::random_using(n, StandardNormal, rng).mapv(|v| F::cast(v));
                Ok((mu + &(s2.mapv(|s| s.sqrt()) * z)).mapv(|v| v.exp()))
            }
            Prior::Horseshoe { .. } => Err(GpError::InvalidParameter(
                "Horseshoe prior cannot be sampled".to_string(),
            )),
        }
    }

    /// Draws `size` independent samples from the prior as a (size, ndim) matrix
    pub fn sample_n<R: Rng>(&self, size: usize, rng: &mut R) -> Result<Array2<F>> {
        if let Prior::Horseshoe { .. } = self {
            return Err(GpError::InvalidParameter(
                "Horseshoe prior cannot be sampled".to_string(),
            ));
        }
        let mut samples = Array2::zeros((size, self.ndim()));
        for mut row in samples.rows_mut() {
            row.assign(&self.sample(rng)?);
        }
        Ok(samples)
    }
}

impl<F: Float> fmt::Display for Prior<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prior::Uniform { a, b } => write!(f, "Uniform(a={a}, b={b})"),
            Prior::Normal { mu, s2 } => write!(f, "Normal(mu={mu}, s2={s2})"),
            Prior::LogNormal { mu, s2 } => write!(f, "LogNormal(mu={mu}, s2={s2})"),
            Prior::Horseshoe { scale } => write!(f, "Horseshoe(scale={scale})"),
        }
    }
}
