//! Observation model of the GP.

use crate::errors::{GpError, Result};
use crate::params::{check_values, Domain, ParamSpec, Parameterized};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gaussian likelihood: observations are the latent function values corrupted
/// by i.i.d. normal noise of variance `sn2`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Gaussian<F: Float> {
    sn2: F,
}

impl<F: Float> Gaussian<F> {
    /// Constructor given a positive noise variance
    pub fn new(sn2: F) -> Result<Self> {
        if !Domain::Positive.contains(sn2) {
            return Err(GpError::InvalidParameter(format!(
                "noise variance sn2 should be positive, got {sn2}"
            )));
        }
        Ok(Gaussian { sn2 })
    }

    /// Noise variance
    pub fn sn2(&self) -> F {
        self.sn2
    }
}

impl<F: Float> Parameterized<F> for Gaussian<F> {
    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::scalar("sn2", Domain::Positive)]
    }

    fn params(&self) -> Array1<F> {
        Array1::from_elem(1, self.sn2)
    }

    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        check_values(&self.param_specs(), theta)?;
        self.sn2 = theta[0];
        Ok(())
    }
}

impl<F: Float> fmt::Display for Gaussian<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Gaussian(sn2={})", self.sn2)
    }
}
