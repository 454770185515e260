//! In-memory key store
//!
//! SECURITY:
//! - Keys live in alloy's `PrivateKeySigner` and never leave this module
//! - Keys are never serialized or logged; `Debug` redacts them
//! - Passphrases are only kept as a blake3 verifier
//!
//! Nothing is persisted. Accounts disappear with the store.

use super::audit::{AuditLog, SignKind};
use super::{KeyStoreBackend, KeyStoreError, KeystoreWallet};
use crate::accounts::{Account, AccountUrl, SignedTransaction};
use crate::config::Config;
use alloy::consensus::{SignableTransaction, Transaction, TypedTransaction};
use alloy::hex;
use alloy::primitives::{Address, ChainId, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Context string for passphrase verifiers
const VERIFIER_CONTEXT: &str = "keystore-wallet 2026-10 passphrase verifier";

struct StoredKey {
    account: Account,
    signer: PrivateKeySigner,
    verifier: blake3::Hash,
}

impl StoredKey {
    fn check_passphrase(&self, passphrase: &SecretString) -> Result<(), KeyStoreError> {
        if passphrase_verifier(self.account.address(), passphrase) != self.verifier {
            return Err(KeyStoreError::InvalidPassphrase);
        }
        Ok(())
    }
}

#[derive(Default)]
struct State {
    keys: HashMap<Address, StoredKey>,
    unlocked: HashSet<Address>,
}

impl State {
    /// Key for `account`, honoring its URL when one is given
    fn find(&self, account: &Account) -> Result<&StoredKey, KeyStoreError> {
        self.keys
            .get(account.address())
            .filter(|key| account.url().is_none() || account.url() == key.account.url())
            .ok_or(KeyStoreError::NoSuchAccount)
    }

    /// Key for `address` if it is unlocked
    fn unlocked(&self, address: &Address) -> Result<&StoredKey, KeyStoreError> {
        if !self.unlocked.contains(address) {
            return Err(KeyStoreError::Locked);
        }
        self.keys.get(address).ok_or(KeyStoreError::NoSuchAccount)
    }
}

/// Key store holding secp256k1 keys in memory
pub struct MemoryKeyStore {
    /// URL scheme for the accounts this store creates
    scheme: String,
    /// Keys and unlocked set, guarded together
    state: RwLock<State>,
    /// Optional signing audit trail
    audit: Option<AuditLog>,
}

impl MemoryKeyStore {
    pub fn new(config: &Config) -> Self {
        Self {
            scheme: config.scheme.clone(),
            state: RwLock::new(State::default()),
            audit: config.audit_log_path.as_ref().map(AuditLog::new),
        }
    }

    /// Generate a fresh key protected by `passphrase`
    pub fn new_account(&self, passphrase: &SecretString) -> Result<Account, KeyStoreError> {
        self.insert(PrivateKeySigner::random(), passphrase)
    }

    /// Import a hex-encoded private key protected by `passphrase`
    pub fn import_key(
        &self,
        key_hex: &str,
        passphrase: &SecretString,
    ) -> Result<Account, KeyStoreError> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| KeyStoreError::InvalidKey(format!("{}", e)))?;
        self.insert(signer, passphrase)
    }

    fn insert(
        &self,
        signer: PrivateKeySigner,
        passphrase: &SecretString,
    ) -> Result<Account, KeyStoreError> {
        let address = signer.address();
        let path = format!("{}--{}", Uuid::new_v4(), hex::encode(address));
        let account = Account::new(address, AccountUrl::new(&self.scheme, path));

        let mut state = self.state.write();
        if state.keys.contains_key(&address) {
            return Err(KeyStoreError::AccountExists);
        }
        state.keys.insert(
            address,
            StoredKey {
                account: account.clone(),
                signer,
                verifier: passphrase_verifier(&address, passphrase),
            },
        );
        tracing::info!(address = %address, url = ?account.url(), "Stored new key");
        Ok(account)
    }

    /// Remove `account` after verifying `passphrase`
    ///
    /// Wallets already handed out for the account stay usable as values but
    /// every signing attempt through them fails from then on.
    pub fn delete(&self, account: &Account, passphrase: &SecretString) -> Result<(), KeyStoreError> {
        let mut state = self.state.write();
        state.find(account)?.check_passphrase(passphrase)?;
        state.keys.remove(account.address());
        state.unlocked.remove(account.address());
        tracing::info!(address = %account.address(), "Deleted key");
        Ok(())
    }

    /// Unlock `account` until [`MemoryKeyStore::lock`] is called
    pub fn unlock(&self, account: &Account, passphrase: &SecretString) -> Result<(), KeyStoreError> {
        let mut state = self.state.write();
        state.find(account)?.check_passphrase(passphrase)?;
        state.unlocked.insert(*account.address());
        tracing::info!(address = %account.address(), "Unlocked account");
        Ok(())
    }

    /// Lock `address`. Locking an account that is not unlocked is a no-op.
    pub fn lock(&self, address: &Address) {
        if self.state.write().unlocked.remove(address) {
            tracing::info!(address = %address, "Locked account");
        }
    }

    /// Whether a key for `address` is stored
    pub fn has_address(&self, address: &Address) -> bool {
        self.state.read().keys.contains_key(address)
    }

    /// Resolve `account` to the stored account, filling in its URL
    pub fn find(&self, account: &Account) -> Result<Account, KeyStoreError> {
        self.state.read().find(account).map(|key| key.account.clone())
    }

    /// All stored accounts, ordered by URL
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .state
            .read()
            .keys
            .values()
            .map(|key| key.account.clone())
            .collect();
        accounts.sort_by(|a, b| a.url().cmp(&b.url()));
        accounts
    }

    /// One wallet per stored account, ordered by URL
    pub fn wallets(keystore: &Arc<Self>) -> Vec<KeystoreWallet<Self>> {
        keystore
            .accounts()
            .into_iter()
            .map(|account| KeystoreWallet::new(account, Arc::clone(keystore)))
            .collect()
    }

    fn audited<T>(
        &self,
        kind: SignKind,
        address: Address,
        chain_id: Option<ChainId>,
        sign: impl FnOnce() -> Result<T, KeyStoreError>,
    ) -> Result<T, KeyStoreError> {
        let outcome = sign();
        if let Some(audit) = &self.audit {
            audit.record(kind, address, chain_id, &outcome);
        }
        outcome
    }
}

impl KeyStoreBackend for MemoryKeyStore {
    type Error = KeyStoreError;

    fn is_unlocked(&self, address: &Address) -> bool {
        self.state.read().unlocked.contains(address)
    }

    fn sign_hash(&self, account: &Account, hash: &B256) -> Result<Signature, KeyStoreError> {
        self.audited(SignKind::Hash, *account.address(), None, || {
            let state = self.state.read();
            let key = state.unlocked(account.address())?;
            sign_hash_with(&key.signer, hash)
        })
    }

    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        hash: &B256,
    ) -> Result<Signature, KeyStoreError> {
        self.audited(SignKind::HashWithPassphrase, *account.address(), None, || {
            let state = self.state.read();
            let key = state.find(account)?;
            key.check_passphrase(passphrase)?;
            sign_hash_with(&key.signer, hash)
        })
    }

    fn sign_tx(
        &self,
        account: &Account,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, KeyStoreError> {
        self.audited(SignKind::Transaction, *account.address(), Some(chain_id), || {
            let state = self.state.read();
            let key = state.unlocked(account.address())?;
            sign_tx_with(&key.signer, tx, chain_id)
        })
    }

    fn sign_tx_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, KeyStoreError> {
        self.audited(
            SignKind::TransactionWithPassphrase,
            *account.address(),
            Some(chain_id),
            || {
                let state = self.state.read();
                let key = state.find(account)?;
                key.check_passphrase(passphrase)?;
                sign_tx_with(&key.signer, tx, chain_id)
            },
        )
    }
}

// Implement Debug manually to avoid exposing key material
impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (accounts, unlocked) = {
            let state = self.state.read();
            (state.keys.len(), state.unlocked.len())
        };
        f.debug_struct("MemoryKeyStore")
            .field("scheme", &self.scheme)
            .field("accounts", &accounts)
            .field("unlocked", &unlocked)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

fn passphrase_verifier(address: &Address, passphrase: &SecretString) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(VERIFIER_CONTEXT);
    hasher.update(address.as_slice());
    hasher.update(passphrase.expose_secret().as_bytes());
    hasher.finalize()
}

fn sign_hash_with(signer: &PrivateKeySigner, hash: &B256) -> Result<Signature, KeyStoreError> {
    signer
        .sign_hash_sync(hash)
        .map_err(|e| KeyStoreError::Signing(e.to_string()))
}

/// Bind `chain_id` into `tx` and sign its signature hash
///
/// A chain id already set on `tx` (non-zero) must equal `chain_id`; it is
/// never rewritten.
fn sign_tx_with(
    signer: &PrivateKeySigner,
    mut tx: TypedTransaction,
    chain_id: ChainId,
) -> Result<SignedTransaction, KeyStoreError> {
    match Transaction::chain_id(&tx) {
        Some(existing) if existing != 0 && existing != chain_id => {
            return Err(KeyStoreError::ChainIdMismatch {
                tx: existing,
                requested: chain_id,
            });
        }
        Some(existing) if existing == chain_id => {}
        _ => tx.set_chain_id(chain_id),
    }
    let signature = sign_hash_with(signer, &tx.signature_hash())?;
    Ok(tx.into_signed(signature))
}
