use std::error::Error as StdError;

use thiserror::Error;

use crate::application::loaders::LoaderError;
use crate::application::mutations::MutationError;
use crate::application::repos::RepoError;
use crate::cache::CacheError;
use crate::dispatch::DispatchError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;

/// An error flattened into its message chain, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            let message = inner.to_string();
            // `#[error(transparent)]` wrappers repeat their inner message.
            if messages.last() != Some(&message) {
                messages.push(message);
            }
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn from_message(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            messages: vec![message.into()],
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }

    /// Process exit code for the command line.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) | AppError::Dispatch(_) | AppError::Domain(_) => 2,
            AppError::Repo(RepoError::NotFound { .. }) => 3,
            AppError::Infra(InfraError::Configuration { .. }) => 78,
            _ => 1,
        }
    }
}
