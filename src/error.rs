use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the engine to its caller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Nothing is presentable: no introduced items and nothing to introduce.
    /// Callers should prompt for content to be added or imported.
    #[error("no data to present")]
    NoData,

    /// Storage collaborator failure, propagated unmodified.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, EngineError::NoData)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
