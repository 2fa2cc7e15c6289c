//! Application error type.
//!
//! Every stage returns `Result<_, AppError>`. Each variant maps to a process exit
//! code so the binary can report failures the same way regardless of where they
//! happened.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// An input file is missing, unreadable, or not delimited tabular data.
    #[error("data load error: {0}")]
    DataLoad(String),

    /// A required column is absent (or the two tables cannot be combined).
    #[error("schema error: {0}")]
    Schema(String),

    /// The design matrix of one model is rank-deficient.
    ///
    /// Only fatal for the model being fitted; the pipeline records it and moves on.
    #[error("singular design for {model}: {reason}")]
    SingularDesign { model: String, reason: String },

    /// Bad CLI values or inputs that violate a stage precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Writing a report, chart, or export failed.
    #[error("output error: {0}")]
    Output(String),

    /// None of the model specifications could be fitted.
    #[error("no model could be fitted: {0}")]
    NoModels(String),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::DataLoad(_) | AppError::Schema(_) | AppError::InvalidInput(_) => 2,
            AppError::SingularDesign { .. } | AppError::NoModels(_) => 3,
            AppError::Output(_) => 4,
        }
    }

    pub(crate) fn singular(model: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::SingularDesign {
            model: model.into(),
            reason: reason.into(),
        }
    }
}
