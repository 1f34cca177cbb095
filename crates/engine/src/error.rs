//! The module contains the errors the engine can throw.
//!
//! Each variant maps to a distinct caller reaction: retry on
//! [`ConcurrentModification`], prompt for a currency on [`UnknownCurrency`],
//! surface the message otherwise.
//!
//! [`ConcurrentModification`]: EngineError::ConcurrentModification
//! [`UnknownCurrency`]: EngineError::UnknownCurrency
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Duplicate active share: {0}")]
    DuplicateActiveShare(String),
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid enum value: {0}")]
    InvalidEnumValue(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::DuplicateActiveShare(a), Self::DuplicateActiveShare(b)) => a == b,
            (Self::UnknownCurrency(a), Self::UnknownCurrency(b)) => a == b,
            (Self::ConcurrentModification(a), Self::ConcurrentModification(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::InvalidEnumValue(a), Self::InvalidEnumValue(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
