use crate::core::units::BelowAbsoluteZeroError;
use thiserror::Error;

/// Umbrella error for anything the zone engine can report to a caller.
#[derive(Debug, Error)]
pub enum ZoneSimError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatchError),
    #[error(transparent)]
    NumericalFailure(#[from] NumericalFailureError),
    #[error(transparent)]
    BelowAbsoluteZero(#[from] BelowAbsoluteZeroError),
}

/// Problems found while building a zone from its description. These are raised at setup and are
/// unrecoverable for the run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Surface '{surface}' references construction '{construction}', which is not defined")]
    UndefinedConstruction {
        surface: String,
        construction: String,
    },
    #[error("Construction '{construction}' uses material '{material}', which is not defined")]
    UndefinedMaterial {
        construction: String,
        material: String,
    },
    #[error("No surface named '{0}' exists in this zone")]
    UnknownSurface(String),
    #[error("No {kind} convection correlation is assigned for classification '{classification}'")]
    UnassignedClassification {
        kind: &'static str,
        classification: String,
    },
    #[error("Unknown {kind} convection correlation '{name}'")]
    UnknownCorrelation { kind: &'static str, name: String },
    #[error("Unknown HVAC controller type '{0}'")]
    UnknownControllerType(String),
    #[error("Invalid value for '{parameter}' on '{owner}': {reason}")]
    InvalidParameter {
        owner: String,
        parameter: &'static str,
        reason: String,
    },
}

impl ConfigurationError {
    pub(crate) fn invalid(
        owner: impl Into<String>,
        parameter: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            owner: owner.into(),
            parameter,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("Temperature vector for '{owner}' has {actual} entries but {expected} were expected")]
pub struct DimensionMismatchError {
    pub owner: String,
    pub expected: usize,
    pub actual: usize,
}

/// The linear heat balance system for a timestep could not be solved. The zone state is left as
/// it was before the step; `last_valid_guess` is the last finite iterate, for callers that want to
/// substitute it.
#[derive(Clone, Debug, Error)]
#[error("Heat balance system could not be solved on Picard iteration {iteration}: {reason}")]
pub struct NumericalFailureError {
    pub iteration: usize,
    pub reason: NumericalFailureReason,
    pub last_valid_guess: Vec<f64>,
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum NumericalFailureReason {
    #[error("matrix is singular")]
    SingularMatrix,
    #[error("solution contains non-finite temperatures")]
    NonFiniteSolution,
    #[error("solution residual is {relative_residual:e} of the right-hand side")]
    InaccurateSolution { relative_residual: f64 },
}
