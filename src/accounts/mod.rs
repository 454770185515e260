//! Generic account and wallet abstractions
//!
//! A [`Wallet`] exposes one or more [`Account`]s and signs on their behalf.
//! Backends differ (plain keystores, hardware devices, HD seeds), so the trait
//! carries every capability and variants that lack one reject it at runtime.

mod derivation;
pub mod hash;
mod url;

pub use derivation::{DerivationPath, DEFAULT_BASE_PATH, DEFAULT_ROOT_PATH, HARDENED_OFFSET};
pub use hash::{data_hash, text_hash};
pub use url::AccountUrl;

use alloy::consensus::{Signed, TypedTransaction};
use alloy::primitives::{Address, ChainId, Signature, U256};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transaction together with the signature produced for it
pub type SignedTransaction = Signed<TypedTransaction>;

/// An Ethereum account, optionally pinned to a specific backend location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<AccountUrl>,
}

impl Account {
    /// An account identified by address and location
    pub fn new(address: Address, url: AccountUrl) -> Self {
        Self {
            address,
            url: Some(url),
        }
    }

    /// An account identified by address only; matches any location
    pub fn from_address(address: Address) -> Self {
        Self { address, url: None }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn url(&self) -> Option<&AccountUrl> {
        self.url.as_ref()
    }
}

/// Lock state reported by [`Wallet::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletStatus {
    Locked,
    Unlocked,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Locked => f.write_str("Locked"),
            WalletStatus::Unlocked => f.write_str("Unlocked"),
        }
    }
}

/// Errors returned by wallet operations
///
/// Only the first two variants originate in the wallet; everything the
/// backend reports is carried through untouched in `Backend`.
#[derive(Debug, thiserror::Error)]
pub enum WalletError<E> {
    #[error("unknown account")]
    UnknownAccount,

    #[error("not supported")]
    UnsupportedCapability,

    #[error(transparent)]
    Backend(E),
}

impl<E> WalletError<E> {
    /// The backend error, if this failure came from the backend
    pub fn backend(&self) -> Option<&E> {
        match self {
            WalletError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

/// Read access to chain state, used by wallets that discover derived accounts
pub trait ChainStateReader: Send + Sync {
    fn nonce_at(&self, address: Address) -> Option<u64>;

    fn balance_at(&self, address: Address) -> Option<U256>;
}

/// A wallet holding one or more accounts
pub trait Wallet: Send + Sync {
    /// Error type reported by the backing key store
    type BackendError: std::error::Error + Send + Sync + 'static;

    /// Location of the wallet within its backend
    fn url(&self) -> Option<&AccountUrl>;

    /// Current lock state
    fn status(&self) -> Result<WalletStatus, WalletError<Self::BackendError>>;

    /// Establish access to the wallet (connect a device, decrypt a seed)
    fn open(&self, passphrase: &SecretString) -> Result<(), WalletError<Self::BackendError>>;

    /// Release whatever [`Wallet::open`] acquired
    fn close(&self) -> Result<(), WalletError<Self::BackendError>>;

    /// Accounts currently known to this wallet
    fn accounts(&self) -> Vec<Account>;

    /// Whether `account` belongs to this wallet
    fn contains(&self, account: &Account) -> bool;

    /// Derive the account at `path`, tracking it when `pin` is set
    fn derive(
        &self,
        path: &DerivationPath,
        pin: bool,
    ) -> Result<Account, WalletError<Self::BackendError>>;

    /// Discover used accounts under `bases` using `chain`
    fn self_derive(&self, bases: &[DerivationPath], chain: &dyn ChainStateReader);

    /// Sign `keccak256(data)`. `mime_type` describes `data` for the caller's
    /// benefit only.
    fn sign_data(
        &self,
        account: &Account,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Signature, WalletError<Self::BackendError>>;

    /// [`Wallet::sign_data`] authorized by `passphrase` for this call only
    fn sign_data_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Signature, WalletError<Self::BackendError>>;

    /// Sign the EIP-191 hash of `text`
    fn sign_text(
        &self,
        account: &Account,
        text: &[u8],
    ) -> Result<Signature, WalletError<Self::BackendError>>;

    /// [`Wallet::sign_text`] authorized by `passphrase` for this call only
    fn sign_text_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        text: &[u8],
    ) -> Result<Signature, WalletError<Self::BackendError>>;

    /// Sign `tx` for `chain_id`
    fn sign_tx(
        &self,
        account: &Account,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, WalletError<Self::BackendError>>;

    /// [`Wallet::sign_tx`] authorized by `passphrase` for this call only
    fn sign_tx_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, WalletError<Self::BackendError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn status_display() {
        assert_eq!(WalletStatus::Locked.to_string(), "Locked");
        assert_eq!(WalletStatus::Unlocked.to_string(), "Unlocked");
    }

    #[test]
    fn account_serde_omits_missing_url() {
        let addr = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let bare = Account::from_address(addr);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("url").is_none());

        let pinned = Account::new(addr, AccountUrl::new("keystore", "k1"));
        let json = serde_json::to_value(&pinned).unwrap();
        assert_eq!(json["url"], "keystore://k1");
        let back: Account = serde_json::from_value(json).unwrap();
        assert_eq!(back, pinned);
    }

    #[test]
    fn backend_accessor() {
        let err: WalletError<std::io::Error> =
            WalletError::Backend(std::io::Error::other("disk"));
        assert!(err.backend().is_some());
        assert_eq!(err.to_string(), "disk");
        assert!(WalletError::<std::io::Error>::UnknownAccount.backend().is_none());
    }
}
