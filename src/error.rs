//! Failure kinds surfaced by the propagation, store, catalog and interceptor layers.

use crate::interceptor::InterceptorStatus;

/// Why a propagated state could not be produced for an object. Callers degrade to
/// [`crate::propagate::FALLBACK_STATE`] instead of failing the tick.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("incomplete orbital elements: {0} is missing or zero")]
    IncompleteElements(&'static str),

    #[error("propagated state is not finite")]
    NonFiniteState,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("invalid sort key '{0}'")]
    InvalidSortKey(String),
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0}")]
    FetchFailure(#[source] StoreError),

    #[error("catalog csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InterceptorError {
    #[error("target '{name}' has no active threat")]
    InvalidTarget { name: String },

    #[error("interceptor {id} cannot be cancelled while {status}")]
    NotCancellable {
        id: String,
        status: InterceptorStatus,
    },

    #[error("no interceptor action with id {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
