//! Model parameters with their documented defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters shared by every portfolio model.
///
/// Each problem owns its own copy; overriding a field on one problem never
/// touches another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Minimum expected return.
    #[serde(default = "default_mu")]
    pub mu: f64,
    /// Trust level (CVaR models).
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// MAD risk limit.
    #[serde(default = "default_gamma_mad")]
    pub gamma_mad: f64,
    /// CVaR risk limit.
    #[serde(default = "default_gamma_cvar")]
    pub gamma_cvar: f64,
    /// Variance risk limit.
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    /// Client capital.
    #[serde(default = "default_capital")]
    pub capital: f64,
    /// Maximum weight of a single security.
    #[serde(default = "default_p_max")]
    pub p_max: f64,
    /// Minimum invested fraction of capital.
    #[serde(default = "default_w_min")]
    pub w_min: f64,
    /// Maximum number of held securities.
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            mu: default_mu(),
            beta: default_beta(),
            gamma_mad: default_gamma_mad(),
            gamma_cvar: default_gamma_cvar(),
            sigma: default_sigma(),
            capital: default_capital(),
            p_max: default_p_max(),
            w_min: default_w_min(),
            k: default_k(),
        }
    }
}

impl Parameters {
    /// Reject values no model can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.capital.is_finite() && self.capital > 0.0) {
            return Err(invalid("capital", "must be positive and finite"));
        }
        if !(self.p_max > 0.0 && self.p_max <= 1.0) {
            return Err(invalid("p_max", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.w_min) {
            return Err(invalid("w_min", "must be in [0, 1]"));
        }
        if !(self.beta > 0.0 && self.beta < 1.0) {
            return Err(invalid("beta", "must be in (0, 1)"));
        }
        if self.k == 0 {
            return Err(invalid("k", "must be at least 1"));
        }
        for (field, value) in [
            ("mu", self.mu),
            ("sigma", self.sigma),
            ("gamma_mad", self.gamma_mad),
            ("gamma_cvar", self.gamma_cvar),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, "must be finite"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

const fn default_mu() -> f64 {
    0.0016
}

const fn default_beta() -> f64 {
    0.95
}

const fn default_gamma_mad() -> f64 {
    0.005
}

const fn default_gamma_cvar() -> f64 {
    0.05
}

const fn default_sigma() -> f64 {
    0.0126
}

const fn default_capital() -> f64 {
    1e6
}

const fn default_p_max() -> f64 {
    0.15
}

const fn default_w_min() -> f64 {
    0.9
}

const fn default_k() -> usize {
    20
}
