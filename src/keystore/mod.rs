//! Keystore-backed wallets
//!
//! A key store owns key material and the set of unlocked accounts. It hands
//! out one [`KeystoreWallet`] per account; every wallet shares the same store.
//!
//! SECURITY: wallets never see key material or the unlocked set directly.
//! They go through the narrow [`KeyStoreBackend`] surface below, after first
//! checking that the request targets their own account.

mod audit;
mod memory;
mod wallet;

pub use audit::{AuditLog, SignKind};
pub use memory::MemoryKeyStore;
pub use wallet::KeystoreWallet;

use crate::accounts::{Account, SignedTransaction};
use alloy::consensus::TypedTransaction;
use alloy::primitives::{Address, ChainId, Signature, B256};
use secrecy::SecretString;
use thiserror::Error;

/// Errors reported by [`MemoryKeyStore`]
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("no key for given address or file")]
    NoSuchAccount,

    #[error("authentication needed: password or unlock")]
    Locked,

    #[error("could not decrypt key with given password")]
    InvalidPassphrase,

    #[error("account already exists")]
    AccountExists,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("chain id mismatch: transaction has {tx}, signing for {requested}")]
    ChainIdMismatch { tx: ChainId, requested: ChainId },
}

/// Signing and lock-state operations a key store offers to its wallets
///
/// Implementations guard their unlocked set with a reader/writer lock;
/// `is_unlocked` and the implicit-auth signing calls only need the read side.
pub trait KeyStoreBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `address` is currently unlocked
    fn is_unlocked(&self, address: &Address) -> bool;

    /// Sign `hash` with an account that is already unlocked
    fn sign_hash(&self, account: &Account, hash: &B256) -> Result<Signature, Self::Error>;

    /// Sign `hash` after verifying `passphrase`, without unlocking the account
    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        hash: &B256,
    ) -> Result<Signature, Self::Error>;

    /// Sign `tx` for `chain_id` with an account that is already unlocked
    fn sign_tx(
        &self,
        account: &Account,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, Self::Error>;

    /// Sign `tx` for `chain_id` after verifying `passphrase`
    fn sign_tx_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, Self::Error>;
}
