//! Error types for reward claiming.

use thiserror::Error;

use crate::types::RewardEpochId;

/// Error type for the claim pipeline.
#[derive(Debug, Error)]
pub enum ClaimerError {
    /// Missing or invalid configuration. Raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// A ledger read failed.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// The claim transaction failed or was reverted.
    #[error("submission error: {0}")]
    Submission(String),

    /// Submit was called without any matched claims.
    #[error("claim batch is empty")]
    EmptyBatch,

    /// A claim would break batch ordering or homogeneity.
    #[error("invalid claim batch: {0}")]
    InvalidBatch(String),

    /// The requested epoch lies beyond the ledger's claimable range.
    #[error("epoch {epoch} is not claimable yet (claimable up to {end})")]
    NotClaimable {
        epoch: RewardEpochId,
        end: RewardEpochId,
    },
}

impl ClaimerError {
    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClaimerError::Config(_) => "CONFIG_ERROR",
            ClaimerError::Ledger(_) => "LEDGER_ERROR",
            ClaimerError::Submission(_) => "SUBMISSION_ERROR",
            ClaimerError::EmptyBatch => "EMPTY_BATCH",
            ClaimerError::InvalidBatch(_) => "INVALID_BATCH",
            ClaimerError::NotClaimable { .. } => "NOT_CLAIMABLE",
        }
    }
}

impl From<::config::ConfigError> for ClaimerError {
    fn from(err: ::config::ConfigError) -> Self {
        ClaimerError::Config(err.to_string())
    }
}

/// Reasons a dataset could not be used.
///
/// Never escapes the fetcher: every variant is reported as "not found".
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("dataset not published")]
    NotPublished,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("schema violation: {0}")]
    Schema(String),
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Schema(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ClaimerError::Config("x".into()).error_code(), "CONFIG_ERROR");
        assert_eq!(ClaimerError::EmptyBatch.error_code(), "EMPTY_BATCH");
        assert_eq!(
            ClaimerError::NotClaimable { epoch: 10, end: 9 }.error_code(),
            "NOT_CLAIMABLE"
        );
    }

    #[test]
    fn test_not_claimable_message() {
        let err = ClaimerError::NotClaimable { epoch: 210, end: 205 };
        assert_eq!(
            err.to_string(),
            "epoch 210 is not claimable yet (claimable up to 205)"
        );
    }
}
