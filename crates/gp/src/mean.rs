//! A module for prior mean functions of the GP model.
//!
//! The following models are implemented:
//! * constant,
//! * linear

use crate::errors::{GpError, Result};
use crate::params::{check_values, Domain, ParamSpec, Parameterized};
use crate::utils::check_ndim;
use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for prior mean functions used in GP inference
pub trait MeanFunction<F: Float>: Parameterized<F> + Clone + fmt::Display {
    /// Mean values at the given `x` points specified as a (n, nx) matrix
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>>;

    /// Derivatives of the mean values wrt each hyperparameter component
    fn grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>>;

    /// Derivatives of the mean values wrt the components of `x` as a (n, nx) matrix.
    ///
    /// `None` when the mean does not depend on real-valued inputs (ie constant mean),
    /// the gradient is then zero.
    fn gradx(&self, _x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Option<Array2<F>>> {
        Ok(None)
    }
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ConstantMean<F: Float> {
    bias: F,
}

impl<F: Float> ConstantMean<F> {
    /// Constant mean equal to `bias`
    pub fn new(bias: F) -> Self {
        ConstantMean { bias }
    }

    /// Constant value
    pub fn bias(&self) -> F {
        self.bias
    }
}

impl<F: Float> Default for ConstantMean<F> {
    fn default() -> Self {
        ConstantMean::new(F::zero())
    }
}

impl<F: Float> Parameterized<F> for ConstantMean<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::scalar("bias", Domain::Real)]
    }

    fn params(&self) -> Array1<F> {
        Array1::from_elem(1, self.bias)
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_values(&self.param_specs(), theta)?;
        self.bias = theta[0];
        Ok(())
    }
}

impl<F: Float> MeanFunction<F> for ConstantMean<F> {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        Ok(Array1::from_elem(x.nrows(), self.bias))
    }

    fn grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>> {
        Ok(vec![Array1::ones(x.nrows())])
    }
}

impl<F: Float> fmt::Display for ConstantMean<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Constant(bias={})", self.bias)
    }
}

/// An affine function as mean of the GP
///
/// `mean(x) = bias + slope.x`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct LinearMean<F: Float> {
    bias: F,
    slope: Array1<F>,
}

impl<F: Float> LinearMean<F> {
    /// Affine mean on inputs of dimension `slope.len()`
    pub fn new(bias: F, slope: Array1<F>) -> Result<Self> {
        if slope.is_empty() {
            return Err(GpError::InvalidParameter(
                "linear mean slope should not be empty".to_string(),
            ));
        }
        Ok(LinearMean { bias, slope })
    }

    /// Intercept
    pub fn bias(&self) -> F {
        self.bias
    }

    /// Slope
    pub fn slope(&self) -> &Array1<F> {
        &self.slope
    }
}

impl<F: Float> Parameterized<F> for LinearMean<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::scalar("bias", Domain::Real),
            ParamSpec::vector("slope", self.slope.len(), Domain::Real),
        ]
    }

    fn params(&self) -> Array1<F> {
        let mut theta = vec![self.bias];
        theta.extend(self.slope.iter());
        Array1::from(theta)
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_values(&self.param_specs(), theta)?;
        self.bias = theta[0];
        self.slope.assign(&theta.slice(s![1..]));
        Ok(())
    }
}

impl<F: Float> MeanFunction<F> for LinearMean<F> {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        check_ndim(x, self.slope.len())?;
        Ok(x.dot(&self.slope).mapv(|v| v + self.bias))
    }

    fn grad(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Vec<Array1<F>>> {
        check_ndim(x, self.slope.len())?;
        let mut grads = vec![Array1::ones(x.nrows())];
        grads.extend(x.axis_iter(Axis(1)).map(|col| col.to_owned()));
        Ok(grads)
    }

    fn gradx(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Option<Array2<F>>> {
        check_ndim(x, self.slope.len())?;
        let mut jac = Array2::zeros(x.dim());
        jac.rows_mut()
            .into_iter()
            .for_each(|mut row| row.assign(&self.slope));
        Ok(Some(jac))
    }
}

impl<F: Float> fmt::Display for LinearMean<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Linear(bias={}, slope={})", self.bias, self.slope)
    }
}
