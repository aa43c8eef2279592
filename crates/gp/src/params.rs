//! Hyperparameter declaration and flattening.
//!
//! Each model component (likelihood, kernel, mean function) owns its hyperparameters
//! and declares them statically through [Parameterized::param_specs]. A [Gp](crate::Gp)
//! composes these declarations into one ordered [Hyperparameters] table: the order of
//! that table is the order of the flat parameter vector and of every gradient vector.

use crate::errors::{GpError, Result};
use crate::priors::Prior;
use linfa::Float;
use ndarray::{s, Array1, ArrayBase, ArrayView1, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Domain constraint of a hyperparameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Domain {
    /// Any finite value
    Real,
    /// Strictly positive values
    Positive,
}

impl Domain {
    /// Check whether `v` belongs to the domain
    pub fn contains<F: Float>(&self, v: F) -> bool {
        match self {
            Domain::Real => v.is_finite(),
            Domain::Positive => v.is_finite() && v > F::zero(),
        }
    }

    /// (lower, upper) bounds of the domain
    pub fn bounds<F: Float>(&self) -> (F, F) {
        match self {
            Domain::Real => (F::neg_infinity(), F::infinity()),
            Domain::Positive => (F::epsilon(), F::infinity()),
        }
    }
}

/// Declaration of a named hyperparameter of `size` components
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Number of components: 1 for a scalar, the input dimension for per-dimension parameters
    pub size: usize,
    /// Domain constraint
    pub domain: Domain,
}

impl ParamSpec {
    /// A scalar parameter
    pub fn scalar(name: &str, domain: Domain) -> Self {
        Self::vector(name, 1, domain)
    }

    /// A parameter with `size` components
    pub fn vector(name: &str, size: usize, domain: Domain) -> Self {
        ParamSpec {
            name: name.to_string(),
            size,
            domain,
        }
    }
}

/// Checks that `theta` is a valid value for the parameters declared by `specs`
pub fn check_values<F: Float>(
    specs: &[ParamSpec],
    theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Result<()> {
    let nparams: usize = specs.iter().map(|p| p.size).sum();
    if theta.len() != nparams {
        return Err(GpError::InvalidParameter(format!(
            "expected {nparams} parameter values, got {}",
            theta.len()
        )));
    }
    let mut offset = 0;
    for spec in specs {
        let values = theta.slice(s![offset..offset + spec.size]);
        if values.iter().any(|&v| !spec.domain.contains(v)) {
            return Err(GpError::InvalidParameter(format!(
                "{} should be in {:?} domain, got {}",
                spec.name, spec.domain, values
            )));
        }
        offset += spec.size;
    }
    Ok(())
}

/// A model component owning hyperparameters
pub trait Parameterized<F: Float> {
    /// Declarations of the owned parameters in flattening order
    fn param_specs(&self) -> Vec<ParamSpec>;

    /// Current values flattened in [Parameterized::param_specs] order
    fn params(&self) -> Array1<F>;

    /// Set all parameter values from the flat vector `theta`.
    /// Fails without modification when `theta` has the wrong size or a value out of its domain.
    fn set_params(&mut self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()>;

    /// Total number of parameter components
    fn nparams(&self) -> usize {
        self.param_specs().iter().map(|p| p.size).sum()
    }
}

/// An entry of the flattened hyperparameter table
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ParamEntry<F: Float> {
    spec: ParamSpec,
    offset: usize,
    prior: Option<Prior<F>>,
}

impl<F: Float> ParamEntry<F> {
    /// Parameter (possibly aliased) name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Parameter declaration
    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    /// Position of the parameter components in the flat vector
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.spec.size
    }

    /// Prior attached to the parameter if any
    pub fn prior(&self) -> Option<&Prior<F>> {
        self.prior.as_ref()
    }
}

/// Ordered table of the hyperparameters of a composite model
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Hyperparameters<F: Float> {
    entries: Vec<ParamEntry<F>>,
}

impl<F: Float> Hyperparameters<F> {
    /// Builds the table from groups of declarations, each group being prefixed
    /// by its owner name (ie `kern.rho`).
    pub fn compose(groups: &[(&str, Vec<ParamSpec>)]) -> Self {
        let mut entries = vec![];
        let mut offset = 0;
        for (owner, specs) in groups {
            for spec in specs {
                entries.push(ParamEntry {
                    spec: ParamSpec {
                        name: format!("{owner}.{}", spec.name),
                        ..spec.clone()
                    },
                    offset,
                    prior: None,
                });
                offset += spec.size;
            }
        }
        Hyperparameters { entries }
    }

    /// Total number of parameter components
    pub fn nparams(&self) -> usize {
        self.entries.iter().map(|e| e.spec.size).sum()
    }

    /// Table entries in flattening order
    pub fn entries(&self) -> &[ParamEntry<F>] {
        &self.entries
    }

    /// Parameter names in flattening order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    /// Entry named `name`
    pub fn get(&self, name: &str) -> Result<&ParamEntry<F>> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| GpError::InvalidParameter(format!("unknown parameter {name}")))
    }

    /// Renames parameters given (old name, new name) pairs
    pub fn rename(&mut self, aliases: &[(&str, &str)]) -> Result<()> {
        for (old, new) in aliases {
            if self.get(new).is_ok() {
                return Err(GpError::InvalidParameter(format!(
                    "parameter {new} already exists"
                )));
            }
            let idx = self.index_of(old)?;
            self.entries[idx].spec.name = new.to_string();
        }
        Ok(())
    }

    /// Attaches a prior to the parameter `name`. The prior dimension has to match
    /// the parameter size.
    pub fn set_prior(&mut self, name: &str, prior: Option<Prior<F>>) -> Result<()> {
        let idx = self.index_of(name)?;
        if let Some(p) = &prior {
            if p.ndim() != self.entries[idx].spec.size {
                return Err(GpError::DimensionMismatch(format!(
                    "prior of dimension {} given for parameter {name} of size {}",
                    p.ndim(),
                    self.entries[idx].spec.size
                )));
            }
        }
        self.entries[idx].prior = prior;
        Ok(())
    }

    /// Checks a flat parameter vector against sizes and domains
    pub fn check(&self, theta: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
        let specs: Vec<ParamSpec> = self.entries.iter().map(|e| e.spec.clone()).collect();
        check_values(&specs, theta)
    }

    /// Bounds of each flat parameter component, intersecting the domain with the prior support
    pub fn bounds(&self) -> Vec<(F, F)> {
        let mut bounds = vec![];
        for entry in &self.entries {
            let (lo, up) = entry.spec.domain.bounds::<F>();
            match &entry.prior {
                Some(prior) => bounds.extend(
                    prior
                        .bounds()
                        .iter()
                        .map(|&(plo, pup)| (plo.max(lo), pup.min(up))),
                ),
                None => bounds.extend(std::iter::repeat((lo, up)).take(entry.spec.size)),
            }
        }
        bounds
    }

    /// Sum of the log priors at `theta` and its gradient (zero where no prior is attached)
    pub fn log_prior_grad(&self, theta: &ArrayView1<F>) -> (F, Array1<F>) {
        let mut logp = F::zero();
        let mut dlogp = Array1::zeros(theta.len());
        for entry in &self.entries {
            if let Some(prior) = &entry.prior {
                let (lp, dlp) = prior.log_prior_grad(&theta.slice(s![entry.range()]));
                logp += lp;
                dlogp.slice_mut(s![entry.range()]).assign(&dlp);
            }
        }
        (logp, dlogp)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.spec.name == name)
            .ok_or_else(|| GpError::InvalidParameter(format!("unknown parameter {name}")))
    }
}

impl<F: Float> fmt::Display for Hyperparameters<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}[{}]", e.spec.name, e.spec.size))
            .collect();
        write!(f, "{}", names.join(", "))
    }
}
