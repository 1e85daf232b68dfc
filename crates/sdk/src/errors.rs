//! Error types for the quoting SDK

use solana_program::pubkey::Pubkey;
use thiserror::Error;
use whorl_types::WhorlError;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("{kind} account not found: {address}")]
    AccountNotFound { kind: String, address: Pubkey },

    #[error("Account source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Quote(#[from] WhorlError),
}

impl SdkError {
    pub fn not_found(kind: impl ToString, address: Pubkey) -> Self {
        SdkError::AccountNotFound {
            kind: kind.to_string(),
            address,
        }
    }
}

impl From<std::io::Error> for SdkError {
    fn from(err: std::io::Error) -> Self {
        SdkError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Source(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
