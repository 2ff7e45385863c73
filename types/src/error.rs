//! Parsing errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("invalid survey identifier: {0}")]
    InvalidSurveyId(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
