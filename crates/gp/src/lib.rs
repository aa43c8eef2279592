//! This library implements exact [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process)
//! regression with a gaussian likelihood, built for sequential designs where training points
//! arrive one (or a few) at a time: conditioning a fitted model on new data extends the Cholesky
//! factor of the covariance matrix incrementally instead of refactorizing it.
//!
//! A model [Gp] is composed of:
//! * a [likelihood](likelihood::Gaussian) owning the noise variance,
//! * a [kernel](kernels::Kernel): [kernels::Matern] (smoothness d = 1, 3 or 5) or
//!   [kernels::SquaredExponential], isotropic or ARD,
//! * a [mean function](mean::MeanFunction): [mean::ConstantMean] or [mean::LinearMean].
//!
//! Hyperparameters of all components are exposed as a single flat vector with named entries,
//! bounds and optional [priors](priors::Prior). The model computes the log marginal likelihood
//! and its gradient, posterior mean and variance (with gradients wrt query points) and
//! posterior function samples.
//!
//! [BasicGp] is a ready to use model with a constant mean and a kernel chosen by name,
//! parameterized by [BasicGpParams] to be fitted on a `linfa` dataset.
//!
//! ```no_run
//! use reggie_gp::BasicGp;
//! use linfa::prelude::*;
//! use ndarray::array;
//!
//! let xt = array![[0.0], [5.0], [10.0], [15.0], [18.0], [20.0], [25.0]];
//! let yt = xt.column(0).mapv(f64::sin);
//! let gp = BasicGp::params(1e-6, 1.0, array![3.0])
//!     .kernel("matern5")
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("GP fitted");
//!
//! let xtest = array![[1.0], [7.5]];
//! let ytest = gp.predict(&xtest);
//! let (mu, s2) = gp.posterior(&xtest, true).expect("GP posterior");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod basic;
mod errors;
mod gp;
pub mod kernels;
pub mod likelihood;
pub mod linalg;
pub mod mean;
pub mod params;
pub mod priors;
mod utils;

pub use basic::*;
pub use errors::*;
pub use gp::*;
pub use kernels::{Kernel, Matern, SquaredExponential};
pub use likelihood::Gaussian;
pub use mean::{ConstantMean, LinearMean, MeanFunction};
pub use params::{Domain, Hyperparameters, ParamSpec, Parameterized};
pub use priors::Prior;
pub use utils::{differences, distances, rescale};
