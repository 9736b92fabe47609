//! Error types for template assembly

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("malformed block template: {0}")]
    MalformedTemplate(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("witness commitment computation failed: {0}")]
    WitnessComputationFailed(String),

    #[error("mining address mismatch: {0}")]
    AddressMismatch(String),

    #[error("malformed share submission: {0}")]
    MalformedSubmit(String),
}

pub type Result<T> = std::result::Result<T, AssemblyError>;
