use std::fmt::Debug;

use crate::model::sparse::{CscMatrix, CsrMatrix, Entry};

/// Invertible element-wise count transformation.
///
/// Implementations must map zero to zero so that sparsity survives, and
/// `inverse_value(forward_value(x))` must recover `x` (exactly for the identity,
/// within floating-point precision otherwise).
pub trait Transformation: Debug {
    fn name(&self) -> String;

    fn forward_value(&self, x: f64) -> f64;

    fn inverse_value(&self, y: f64) -> f64;

    fn transform<T: Entry>(&self, matrix: &CsrMatrix<T>) -> CsrMatrix<f64>
    where
        Self: Sized,
    {
        matrix.map_values(|v| self.forward_value(v.into()))
    }

    fn inverse_transform<T: Entry>(&self, matrix: &CscMatrix<T>) -> CscMatrix<f64>
    where
        Self: Sized,
    {
        matrix.map_values(|v| self.inverse_value(v.into()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentityTransform;

impl Transformation for IdentityTransform {
    fn name(&self) -> String {
        "identity".to_string()
    }

    fn forward_value(&self, x: f64) -> f64 {
        x
    }

    fn inverse_value(&self, y: f64) -> f64 {
        y
    }
}

/// Multiplies every count by a positive factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    factor: f64,
}

impl ScaleTransform {
    pub fn new(factor: f64) -> Option<Self> {
        (factor.is_finite() && factor > 0.0).then_some(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Transformation for ScaleTransform {
    fn name(&self) -> String {
        format!("scale:{}", self.factor)
    }

    fn forward_value(&self, x: f64) -> f64 {
        x * self.factor
    }

    fn inverse_value(&self, y: f64) -> f64 {
        y / self.factor
    }
}

/// Closed set of transformations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountTransform {
    Identity(IdentityTransform),
    Scale(ScaleTransform),
}

impl Default for CountTransform {
    fn default() -> Self {
        CountTransform::Identity(IdentityTransform)
    }
}

impl CountTransform {
    /// Parses `identity` or `scale:<factor>`.
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("identity") {
            return Ok(Self::default());
        }
        if let Some(raw) = value.strip_prefix("scale:") {
            let factor: f64 = raw
                .parse()
                .map_err(|_| format!("invalid scale factor: {raw}"))?;
            return ScaleTransform::new(factor)
                .map(CountTransform::Scale)
                .ok_or_else(|| format!("scale factor must be positive and finite: {raw}"));
        }
        Err(format!("unknown transformation: {value} (use identity|scale:<k>)"))
    }
}

impl Transformation for CountTransform {
    fn name(&self) -> String {
        match self {
            CountTransform::Identity(t) => t.name(),
            CountTransform::Scale(t) => t.name(),
        }
    }

    fn forward_value(&self, x: f64) -> f64 {
        match self {
            CountTransform::Identity(t) => t.forward_value(x),
            CountTransform::Scale(t) => t.forward_value(x),
        }
    }

    fn inverse_value(&self, y: f64) -> f64 {
        match self {
            CountTransform::Identity(t) => t.inverse_value(y),
            CountTransform::Scale(t) => t.inverse_value(y),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/transform.rs"]
mod tests;
