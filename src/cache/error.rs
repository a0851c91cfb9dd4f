use std::error::Error as StdError;

use thiserror::Error;

/// Failure of a fetcher, stored per key and handed to every reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("fetch rejected: {message}")]
    Rejected {
        message: String,
        /// Messages of the error's `source()` chain, outermost first.
        causes: Vec<String>,
    },
    #[error("fetch task panicked")]
    Panicked,
    #[error("fetch task was cancelled before it settled")]
    Cancelled,
}

impl FetchError {
    pub fn rejected(error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(inner) = current {
            causes.push(inner.to_string());
            current = inner.source();
        }
        Self::Rejected {
            message: error.to_string(),
            causes,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("cached value for `{key}` is not a `{expected}`")]
    TypeMismatch { key: String, expected: &'static str },
}

impl CacheError {
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            CacheError::Fetch(error) => Some(error),
            CacheError::TypeMismatch { .. } => None,
        }
    }
}
