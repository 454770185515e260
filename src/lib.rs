//! Keystore Wallet
//!
//! Single-account wallets over a shared key store:
//! - Each [`keystore::KeystoreWallet`] wraps exactly one account
//! - Signing requests for any other account are refused before the key store
//!   is consulted
//! - Data, text (EIP-191) and transactions are hashed per their own scheme, so
//!   a signature made for one purpose never validates for another
//!
//! # Security Model
//!
//! - Wallets only reach the key store through [`keystore::KeyStoreBackend`]
//! - Key material and the unlocked set never leave the key store
//! - Key store failures are forwarded to callers unchanged

pub mod accounts;
pub mod config;
pub mod keystore;
pub mod telemetry;

mod error;

// Re-export commonly used types
pub use accounts::{Account, AccountUrl, Wallet, WalletError, WalletStatus};
pub use config::{Config, LoggingConfig};
pub use error::{Error, Result};
pub use keystore::{KeyStoreBackend, KeyStoreError, KeystoreWallet, MemoryKeyStore};
