//! Test utility functions for stepline
//!
//! Steps here work on `f64` samples so scenarios can check numeric output.

use stepline::core::{ParamSchema, ParamValue, Parameters, SharedStep, Step, StepRegistry, TypeDescriptor};
use std::sync::{Arc, Once};

/// Route `tracing` output to the test harness, honoring `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Multiplies each sample by `factor`
#[derive(Debug)]
pub struct Scale {
    params: Parameters,
    factor: f64,
}

impl Scale {
    pub fn schema() -> ParamSchema {
        ParamSchema::new().field("factor", TypeDescriptor::Float)
    }

    pub fn from_params(params: &Parameters) -> anyhow::Result<Self> {
        Ok(Self {
            factor: params.require_f64("factor")?,
            params: params.clone(),
        })
    }

    pub fn shared(factor: f64) -> SharedStep<f64> {
        Arc::new(Self {
            params: Parameters::new().with("factor", factor),
            factor,
        })
    }
}

impl Step<f64> for Scale {
    fn name(&self) -> &str {
        "Scale"
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn schema(&self) -> Option<ParamSchema> {
        Some(Self::schema())
    }

    fn apply(&self, input: f64) -> anyhow::Result<f64> {
        Ok(input * self.factor)
    }
}

/// Limits samples to `bounds`, failing on NaN input
#[derive(Debug)]
pub struct Clamp {
    params: Parameters,
    low: f64,
    high: f64,
}

impl Clamp {
    pub fn schema() -> ParamSchema {
        ParamSchema::new().field(
            "bounds",
            TypeDescriptor::Tuple(vec![TypeDescriptor::Float, TypeDescriptor::Float]),
        )
    }

    pub fn from_params(params: &Parameters) -> anyhow::Result<Self> {
        let bounds = params.require_slice("bounds")?;
        let bound = |i: usize| {
            bounds
                .get(i)
                .and_then(ParamValue::as_f64)
                .ok_or_else(|| anyhow::anyhow!("bounds must hold two numbers"))
        };
        let (low, high) = (bound(0)?, bound(1)?);
        if low > high {
            anyhow::bail!("lower bound {} exceeds upper bound {}", low, high);
        }
        Ok(Self {
            params: params.clone(),
            low,
            high,
        })
    }

    pub fn shared(low: f64, high: f64) -> SharedStep<f64> {
        Arc::new(Self {
            params: Parameters::new().with("bounds", ParamValue::tuple([low, high])),
            low,
            high,
        })
    }
}

impl Step<f64> for Clamp {
    fn name(&self) -> &str {
        "Clamp"
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn schema(&self) -> Option<ParamSchema> {
        Some(Self::schema())
    }

    fn apply(&self, input: f64) -> anyhow::Result<f64> {
        if input.is_nan() {
            anyhow::bail!("cannot clamp NaN");
        }
        Ok(input.clamp(self.low, self.high))
    }
}

/// Identity step with a richer schema: tuples, strings, optionals and maps
#[derive(Debug)]
pub struct Smooth {
    params: Parameters,
}

impl Smooth {
    pub fn schema() -> ParamSchema {
        ParamSchema::new()
            .field("size", TypeDescriptor::Tuple(vec![TypeDescriptor::Int, TypeDescriptor::Int]))
            .field("mode", TypeDescriptor::Str)
            .field("passes", TypeDescriptor::optional(TypeDescriptor::Int))
            .field(
                "border",
                TypeDescriptor::Map(
                    ParamSchema::new()
                        .field("fill", TypeDescriptor::Float)
                        .field("wrap", TypeDescriptor::Bool),
                ),
            )
    }

    pub fn from_params(params: &Parameters) -> anyhow::Result<Self> {
        Ok(Self { params: params.clone() })
    }

    pub fn shared(params: Parameters) -> SharedStep<f64> {
        Arc::new(Self { params })
    }
}

impl Step<f64> for Smooth {
    fn name(&self) -> &str {
        "Smooth"
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn schema(&self) -> Option<ParamSchema> {
        Some(Self::schema())
    }

    fn apply(&self, input: f64) -> anyhow::Result<f64> {
        Ok(input)
    }
}

/// Always fails with `message`
#[derive(Debug)]
pub struct Explode {
    params: Parameters,
}

impl Explode {
    pub fn shared(message: &str) -> SharedStep<f64> {
        Arc::new(Self {
            params: Parameters::new().with("message", message),
        })
    }
}

impl Step<f64> for Explode {
    fn name(&self) -> &str {
        "Explode"
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn apply(&self, _input: f64) -> anyhow::Result<f64> {
        anyhow::bail!("{}", self.params.require_str("message")?)
    }
}

/// Identity step registered without a schema
#[derive(Debug)]
pub struct Annotate {
    params: Parameters,
}

impl Annotate {
    pub fn shared(params: Parameters) -> SharedStep<f64> {
        Arc::new(Self { params })
    }
}

impl Step<f64> for Annotate {
    fn name(&self) -> &str {
        "Annotate"
    }

    fn params(&self) -> &Parameters {
        &self.params
    }

    fn apply(&self, input: f64) -> anyhow::Result<f64> {
        Ok(input)
    }
}

/// Registry with every helper step
pub fn registry() -> StepRegistry<f64> {
    let mut registry = StepRegistry::new();
    registry
        .register("Scale", Scale::schema(), Scale::from_params)
        .unwrap()
        .register("Clamp", Clamp::schema(), Clamp::from_params)
        .unwrap()
        .register("Smooth", Smooth::schema(), Smooth::from_params)
        .unwrap()
        .register(
            "Explode",
            ParamSchema::new().field("message", TypeDescriptor::Str),
            |params: &Parameters| Ok(Explode { params: params.clone() }),
        )
        .unwrap()
        .register_without_schema("Annotate", |params: &Parameters| {
            Ok(Annotate { params: params.clone() })
        })
        .unwrap();
    registry
}
