use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("CA not initialized - run `labcactl init` first")]
    NotInitialized,

    #[error("certificate for \"{0}\" already exists - pass force to overwrite")]
    DuplicateIssue(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("crypto provider error: {0}")]
    CryptoProvider(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
