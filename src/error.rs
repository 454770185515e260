//! Error types for the keystore wallet crate
//!
//! Signing paths use [`crate::accounts::WalletError`] and
//! [`crate::keystore::KeyStoreError`]; this enum covers everything around them
//! (configuration, parsing, telemetry setup).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid account URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
