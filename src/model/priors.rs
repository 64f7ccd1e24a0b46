use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Which generative model the priors are prepared for.
///
/// Only `Simple` ignores empty droplets; every other kind models ambient RNA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Simple,
    Ambient,
    Swapping,
    Full,
}

impl ModelKind {
    pub fn is_simple(self) -> bool {
        self == ModelKind::Simple
    }

    pub fn models_empties(self) -> bool {
        !self.is_simple()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Simple => "simple",
            ModelKind::Ambient => "ambient",
            ModelKind::Swapping => "swapping",
            ModelKind::Full => "full",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(ModelKind::Simple),
            "ambient" => Ok(ModelKind::Ambient),
            "swapping" => Ok(ModelKind::Swapping),
            "full" => Ok(ModelKind::Full),
            other => Err(format!(
                "invalid model: {other} (use simple|ambient|swapping|full)"
            )),
        }
    }
}

/// Output of the rough pass, taken before barcodes are trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountPriors {
    pub cell_counts: u64,
    pub empty_counts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbientPriors {
    pub cell_prob: f64,
    pub cell_logit: f64,
    pub chi_ambient: Vec<f64>,
    pub chi_bar: Vec<f64>,
}

/// Priors in terms of transformed counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Priors {
    pub n_cells: usize,
    pub cell_counts: u64,
    pub empty_counts: u64,
    pub log_counts_crossover: f64,
    pub d_std: f64,
    pub ambient: Option<AmbientPriors>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PriorError {
    #[error(
        "fraction of trimmed dataset containing cells must be in (0, 1], but is {0}"
    )]
    CellProbOutOfRange(f64),
    #[error("log counts crossover has not been estimated")]
    MissingCrossover,
    #[error("ambient priors are required for the {0} model")]
    MissingAmbient(ModelKind),
    #[error("ambient priors are not used by the simple model")]
    UnexpectedAmbient,
    #[error("ambient profile has {got} genes, expected {expected}")]
    ProfileLength { expected: usize, got: usize },
    #[error("trimmed and full matrices disagree on gene count ({trimmed} vs {full})")]
    GeneCountMismatch { trimmed: usize, full: usize },
}

impl Priors {
    /// Checks that the optional block matches the model and is internally consistent.
    pub fn validate(&self, model: ModelKind, n_genes: usize) -> Result<(), PriorError> {
        match (&self.ambient, model.models_empties()) {
            (None, true) => Err(PriorError::MissingAmbient(model)),
            (Some(_), false) => Err(PriorError::UnexpectedAmbient),
            (None, false) => Ok(()),
            (Some(ambient), true) => {
                if !(ambient.cell_prob > 0.0 && ambient.cell_prob <= 1.0) {
                    return Err(PriorError::CellProbOutOfRange(ambient.cell_prob));
                }
                for profile in [&ambient.chi_ambient, &ambient.chi_bar] {
                    if profile.len() != n_genes {
                        return Err(PriorError::ProfileLength {
                            expected: n_genes,
                            got: profile.len(),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}
