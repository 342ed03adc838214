//! Distribution descriptors and sampling
//!
//! A descriptor is a mapping with a `distribution` key naming one entry of
//! the catalog plus that distribution's keyword parameters, e.g.
//! `{"distribution": "uniform", "low": 1, "high": 2}`.

use crate::error::ConfigError;
use rand::distr::{Open01, Uniform};
use rand::Rng;
use rand_distr::{Beta, Binomial, Distribution, Exp, Gamma, LogNormal, Normal, Poisson};
use serde_json::{Map, Number, Value};

/// Key naming the distribution inside a descriptor
pub const DISTRIBUTION_KEY: &str = "distribution";

/// A fully parsed distribution descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionSpec {
    Gaussian { loc: f64, scale: f64 },
    Uniform { low: f64, high: f64 },
    Exponential { scale: f64 },
    Poisson { lam: f64 },
    Binomial { n: u64, p: f64 },
    Gamma { shape: f64, scale: f64 },
    Beta { a: f64, b: f64 },
    LogNormal { mean: f64, sigma: f64 },
    Laplace { loc: f64, scale: f64 },
}

/// Accepted parameters per distribution, with defaults for optional ones
const CATALOG: &[(&str, &[(&str, Option<f64>)])] = &[
    ("gaussian", &[("loc", Some(0.0)), ("scale", Some(1.0))]),
    ("uniform", &[("low", Some(0.0)), ("high", Some(1.0))]),
    ("exponential", &[("scale", Some(1.0))]),
    ("poisson", &[("lam", Some(1.0))]),
    ("binomial", &[("n", None), ("p", None)]),
    ("gamma", &[("shape", None), ("scale", Some(1.0))]),
    ("beta", &[("a", None), ("b", None)]),
    ("lognormal", &[("mean", Some(0.0)), ("sigma", Some(1.0))]),
    ("laplace", &[("loc", Some(0.0)), ("scale", Some(1.0))]),
];

/// Names of every supported distribution
pub fn catalog() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

impl DistributionSpec {
    /// Parse and validate a descriptor mapping
    pub fn from_descriptor(descriptor: &Map<String, Value>) -> Result<Self, ConfigError> {
        let name = match descriptor.get(DISTRIBUTION_KEY) {
            None => return Err(ConfigError::MissingKey(DISTRIBUTION_KEY.to_string())),
            Some(Value::String(name)) => name.as_str(),
            Some(other) => return Err(ConfigError::UnknownDistribution(other.to_string())),
        };
        let signature = CATALOG
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, signature)| *signature)
            .ok_or_else(|| ConfigError::UnknownDistribution(name.to_string()))?;

        let invalid = |reason: String| ConfigError::InvalidDistributionArgs {
            distribution: name.to_string(),
            reason,
        };

        for key in descriptor.keys().filter(|key| *key != DISTRIBUTION_KEY) {
            if !signature.iter().any(|(param, _)| param == key) {
                let expected: Vec<&str> = signature.iter().map(|(param, _)| *param).collect();
                return Err(invalid(format!(
                    "unexpected parameter '{}' (expected {})",
                    key,
                    expected.join(", ")
                )));
            }
        }

        let mut args = Vec::with_capacity(signature.len());
        for (param, default) in signature {
            let value = match (descriptor.get(*param), default) {
                (Some(Value::Number(n)), _) => n.as_f64().unwrap_or(f64::NAN),
                (Some(other), _) => return Err(invalid(format!("parameter '{}' must be a number, got {}", param, other))),
                (None, Some(default)) => *default,
                (None, None) => return Err(invalid(format!("missing required parameter '{}'", param))),
            };
            if !value.is_finite() {
                return Err(invalid(format!("parameter '{}' must be finite", param)));
            }
            args.push(value);
        }

        let spec = match name {
            "gaussian" => DistributionSpec::Gaussian { loc: args[0], scale: args[1] },
            "uniform" => DistributionSpec::Uniform { low: args[0], high: args[1] },
            "exponential" => DistributionSpec::Exponential { scale: args[0] },
            "poisson" => DistributionSpec::Poisson { lam: args[0] },
            "binomial" => {
                if args[0] < 0.0 || args[0].fract() != 0.0 {
                    return Err(invalid("parameter 'n' must be a non-negative integer".to_string()));
                }
                DistributionSpec::Binomial { n: args[0] as u64, p: args[1] }
            }
            "gamma" => DistributionSpec::Gamma { shape: args[0], scale: args[1] },
            "beta" => DistributionSpec::Beta { a: args[0], b: args[1] },
            "lognormal" => DistributionSpec::LogNormal { mean: args[0], sigma: args[1] },
            _ => DistributionSpec::Laplace { loc: args[0], scale: args[1] },
        };
        spec.validate().map_err(invalid)?;
        Ok(spec)
    }

    /// Catalog name of this distribution
    pub fn name(&self) -> &'static str {
        match self {
            DistributionSpec::Gaussian { .. } => "gaussian",
            DistributionSpec::Uniform { .. } => "uniform",
            DistributionSpec::Exponential { .. } => "exponential",
            DistributionSpec::Poisson { .. } => "poisson",
            DistributionSpec::Binomial { .. } => "binomial",
            DistributionSpec::Gamma { .. } => "gamma",
            DistributionSpec::Beta { .. } => "beta",
            DistributionSpec::LogNormal { .. } => "lognormal",
            DistributionSpec::Laplace { .. } => "laplace",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            DistributionSpec::Gaussian { scale, .. }
            | DistributionSpec::LogNormal { sigma: scale, .. } if scale < 0.0 => {
                Err("scale must be non-negative".to_string())
            }
            DistributionSpec::Uniform { low, high } if low > high => {
                Err(format!("low ({}) must not exceed high ({})", low, high))
            }
            DistributionSpec::Exponential { scale }
            | DistributionSpec::Gamma { scale, .. }
            | DistributionSpec::Laplace { scale, .. } if scale <= 0.0 => {
                Err("scale must be positive".to_string())
            }
            DistributionSpec::Gamma { shape, .. } if shape <= 0.0 => Err("shape must be positive".to_string()),
            DistributionSpec::Poisson { lam } if lam <= 0.0 => Err("lam must be positive".to_string()),
            DistributionSpec::Binomial { p, .. } if !(0.0..=1.0).contains(&p) => {
                Err("p must lie in [0, 1]".to_string())
            }
            DistributionSpec::Beta { a, b } if a <= 0.0 || b <= 0.0 => Err("a and b must be positive".to_string()),
            _ => Ok(()),
        }
    }

    /// Draw one sample
    ///
    /// Poisson and binomial draws are integers; everything else is a float.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDistributionArgs {
            distribution: self.name().to_string(),
            reason,
        };

        let draw = match *self {
            DistributionSpec::Gaussian { loc, scale } => Normal::new(loc, scale)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::Uniform { low, high } => Uniform::new_inclusive(low, high)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::Exponential { scale } => Exp::new(1.0 / scale)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::Poisson { lam } => {
                let count: f64 = Poisson::new(lam).map_err(|e| invalid(e.to_string()))?.sample(rng);
                return Ok(Value::Number((count as i64).into()));
            }
            DistributionSpec::Binomial { n, p } => {
                let count = Binomial::new(n, p).map_err(|e| invalid(e.to_string()))?.sample(rng);
                return Ok(Value::Number(count.into()));
            }
            DistributionSpec::Gamma { shape, scale } => Gamma::new(shape, scale)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::Beta { a, b } => Beta::new(a, b)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::LogNormal { mean, sigma } => LogNormal::new(mean, sigma)
                .map_err(|e| invalid(e.to_string()))?
                .sample(rng),
            DistributionSpec::Laplace { loc, scale } => {
                // Inverse CDF, u strictly inside (-0.5, 0.5)
                let open: f64 = Open01.sample(rng);
                let u = open - 0.5;
                loc - scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
            }
        };

        float_value(draw).ok_or_else(|| invalid(format!("sample {} is not finite", draw)))
    }

    /// Expected value, the deterministic stand-in for a sample
    pub fn mean(&self) -> Value {
        match *self {
            DistributionSpec::Gaussian { loc, .. } | DistributionSpec::Laplace { loc, .. } => float_or_null(loc),
            DistributionSpec::Uniform { low, high } => float_or_null((low + high) / 2.0),
            DistributionSpec::Exponential { scale } => float_or_null(scale),
            DistributionSpec::Poisson { lam } => Value::Number((lam.round() as i64).into()),
            DistributionSpec::Binomial { n, p } => Value::Number(((n as f64 * p).round() as u64).into()),
            DistributionSpec::Gamma { shape, scale } => float_or_null(shape * scale),
            DistributionSpec::Beta { a, b } => float_or_null(a / (a + b)),
            DistributionSpec::LogNormal { mean, sigma } => float_or_null((mean + sigma * sigma / 2.0).exp()),
        }
    }
}

/// Parse a descriptor and draw one sample from it
pub fn sample<R: Rng + ?Sized>(descriptor: &Map<String, Value>, rng: &mut R) -> Result<Value, ConfigError> {
    DistributionSpec::from_descriptor(descriptor)?.sample(rng)
}

fn float_value(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

fn float_or_null(value: f64) -> Value {
    float_value(value).unwrap_or(Value::Null)
}
