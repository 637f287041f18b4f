//! Service error type.

use thiserror::Error;

use pazar_core::MarketError;

use crate::db::RepositoryError;

/// Errors that can occur in marketplace services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The operation was refused by a business rule.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// The business error, if this is one.
    #[must_use]
    pub const fn market(&self) -> Option<&MarketError> {
        match self {
            Self::Market(err) => Some(err),
            Self::Repository(_) => None,
        }
    }
}
