//! Single-account wallet over a shared key store
//!
//! SECURITY: every signing path checks [`Wallet::contains`] before the key
//! store is consulted. The store could sign for any account it holds; the
//! wallet must only ever sign for its own.

use super::KeyStoreBackend;
use crate::accounts::{
    data_hash, text_hash, Account, AccountUrl, ChainStateReader, DerivationPath,
    SignedTransaction, Wallet, WalletError, WalletStatus,
};
use alloy::consensus::TypedTransaction;
use alloy::primitives::{ChainId, Signature, B256};
use secrecy::SecretString;
use std::sync::Arc;

/// Wallet wrapping exactly one key store account
pub struct KeystoreWallet<B> {
    /// The only account this wallet signs for
    account: Account,
    /// Key store the account originates from
    keystore: Arc<B>,
}

impl<B: KeyStoreBackend> KeystoreWallet<B> {
    pub fn new(account: Account, keystore: Arc<B>) -> Self {
        Self { account, keystore }
    }

    /// The wrapped account
    pub fn account(&self) -> &Account {
        &self.account
    }

    fn ensure_contains(&self, account: &Account) -> Result<(), WalletError<B::Error>> {
        if !self.contains(account) {
            tracing::warn!(
                wallet = %self.account.address(),
                requested = %account.address(),
                "Refusing to sign for an account outside this wallet"
            );
            return Err(WalletError::UnknownAccount);
        }
        Ok(())
    }

    fn sign_hash(&self, account: &Account, hash: B256) -> Result<Signature, WalletError<B::Error>> {
        self.ensure_contains(account)?;
        self.keystore
            .sign_hash(account, &hash)
            .map_err(WalletError::Backend)
    }

    fn sign_hash_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        hash: B256,
    ) -> Result<Signature, WalletError<B::Error>> {
        self.ensure_contains(account)?;
        self.keystore
            .sign_hash_with_passphrase(account, passphrase, &hash)
            .map_err(WalletError::Backend)
    }
}

impl<B: KeyStoreBackend> Wallet for KeystoreWallet<B> {
    type BackendError = B::Error;

    fn url(&self) -> Option<&AccountUrl> {
        self.account.url()
    }

    fn status(&self) -> Result<WalletStatus, WalletError<B::Error>> {
        if self.keystore.is_unlocked(self.account.address()) {
            Ok(WalletStatus::Unlocked)
        } else {
            Ok(WalletStatus::Locked)
        }
    }

    // Plain keystore accounts need no connection or decryption step to be
    // listed, so opening and closing do nothing.
    fn open(&self, _passphrase: &SecretString) -> Result<(), WalletError<B::Error>> {
        Ok(())
    }

    fn close(&self) -> Result<(), WalletError<B::Error>> {
        Ok(())
    }

    fn accounts(&self) -> Vec<Account> {
        vec![self.account.clone()]
    }

    fn contains(&self, account: &Account) -> bool {
        account.address() == self.account.address()
            && (account.url().is_none() || account.url() == self.account.url())
    }

    fn derive(
        &self,
        _path: &DerivationPath,
        _pin: bool,
    ) -> Result<Account, WalletError<B::Error>> {
        Err(WalletError::UnsupportedCapability)
    }

    fn self_derive(&self, _bases: &[DerivationPath], _chain: &dyn ChainStateReader) {}

    fn sign_data(
        &self,
        account: &Account,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Signature, WalletError<B::Error>> {
        tracing::debug!(address = %account.address(), mime_type, len = data.len(), "Signing data");
        self.sign_hash(account, data_hash(data))
    }

    fn sign_data_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        mime_type: &str,
        data: &[u8],
    ) -> Result<Signature, WalletError<B::Error>> {
        tracing::debug!(address = %account.address(), mime_type, len = data.len(), "Signing data with passphrase");
        self.sign_hash_with_passphrase(account, passphrase, data_hash(data))
    }

    fn sign_text(
        &self,
        account: &Account,
        text: &[u8],
    ) -> Result<Signature, WalletError<B::Error>> {
        tracing::debug!(address = %account.address(), len = text.len(), "Signing text");
        self.sign_hash(account, text_hash(text))
    }

    fn sign_text_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        text: &[u8],
    ) -> Result<Signature, WalletError<B::Error>> {
        tracing::debug!(address = %account.address(), len = text.len(), "Signing text with passphrase");
        self.sign_hash_with_passphrase(account, passphrase, text_hash(text))
    }

    fn sign_tx(
        &self,
        account: &Account,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, WalletError<B::Error>> {
        self.ensure_contains(account)?;
        tracing::debug!(address = %account.address(), chain_id, "Signing transaction");
        self.keystore
            .sign_tx(account, tx, chain_id)
            .map_err(WalletError::Backend)
    }

    fn sign_tx_with_passphrase(
        &self,
        account: &Account,
        passphrase: &SecretString,
        tx: TypedTransaction,
        chain_id: ChainId,
    ) -> Result<SignedTransaction, WalletError<B::Error>> {
        self.ensure_contains(account)?;
        tracing::debug!(address = %account.address(), chain_id, "Signing transaction with passphrase");
        self.keystore
            .sign_tx_with_passphrase(account, passphrase, tx, chain_id)
            .map_err(WalletError::Backend)
    }
}

impl<B> Clone for KeystoreWallet<B> {
    fn clone(&self) -> Self {
        Self {
            account: self.account.clone(),
            keystore: Arc::clone(&self.keystore),
        }
    }
}

// Manual impl so the backend is never printed
impl<B> std::fmt::Debug for KeystoreWallet<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoreWallet")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address, U256};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that records calls and signs nothing
    #[derive(Default)]
    struct RecordingBackend {
        unlocked: bool,
        calls: AtomicUsize,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("refused")]
    struct Refused;

    impl KeyStoreBackend for RecordingBackend {
        type Error = Refused;

        fn is_unlocked(&self, _address: &Address) -> bool {
            self.unlocked
        }

        fn sign_hash(&self, _account: &Account, _hash: &B256) -> Result<Signature, Refused> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Refused)
        }

        fn sign_hash_with_passphrase(
            &self,
            _account: &Account,
            _passphrase: &SecretString,
            _hash: &B256,
        ) -> Result<Signature, Refused> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Refused)
        }

        fn sign_tx(
            &self,
            _account: &Account,
            _tx: TypedTransaction,
            _chain_id: ChainId,
        ) -> Result<SignedTransaction, Refused> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Refused)
        }

        fn sign_tx_with_passphrase(
            &self,
            _account: &Account,
            _passphrase: &SecretString,
            _tx: TypedTransaction,
            _chain_id: ChainId,
        ) -> Result<SignedTransaction, Refused> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Refused)
        }
    }

    struct UnreachableChain;

    impl ChainStateReader for UnreachableChain {
        fn nonce_at(&self, _address: Address) -> Option<u64> {
            unreachable!("keystore wallets never query chain state")
        }

        fn balance_at(&self, _address: Address) -> Option<U256> {
            unreachable!("keystore wallets never query chain state")
        }
    }

    const ADDR: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const OTHER: Address = address!("70997970c51812dc3a010c7d01b50e20d4dc79c8");

    fn wallet(backend: RecordingBackend) -> KeystoreWallet<RecordingBackend> {
        KeystoreWallet::new(
            Account::new(ADDR, AccountUrl::new("keystore", "k1")),
            Arc::new(backend),
        )
    }

    fn passphrase() -> SecretString {
        SecretString::from("hunter2".to_string())
    }

    #[test]
    fn contains_matches_address_and_optional_url() {
        let w = wallet(RecordingBackend::default());

        assert!(w.contains(&Account::from_address(ADDR)));
        assert!(w.contains(&Account::new(ADDR, AccountUrl::new("keystore", "k1"))));
        assert!(!w.contains(&Account::new(ADDR, AccountUrl::new("keystore", "k2"))));
        assert!(!w.contains(&Account::new(ADDR, AccountUrl::new("ledger", "k1"))));
        assert!(!w.contains(&Account::from_address(OTHER)));
        assert!(!w.contains(&Account::new(OTHER, AccountUrl::new("keystore", "k1"))));
    }

    #[test]
    fn mismatched_account_never_reaches_backend() {
        let w = wallet(RecordingBackend::default());
        let other = Account::from_address(OTHER);
        let pass = passphrase();

        assert!(matches!(
            w.sign_data(&other, "text/plain", b"msg"),
            Err(WalletError::UnknownAccount)
        ));
        assert!(matches!(
            w.sign_data_with_passphrase(&other, &pass, "", b"msg"),
            Err(WalletError::UnknownAccount)
        ));
        assert!(matches!(
            w.sign_text(&other, b"msg"),
            Err(WalletError::UnknownAccount)
        ));
        assert!(matches!(
            w.sign_text_with_passphrase(&other, &pass, b"msg"),
            Err(WalletError::UnknownAccount)
        ));
        assert!(matches!(
            w.sign_tx(&other, TypedTransaction::Legacy(Default::default()), 1),
            Err(WalletError::UnknownAccount)
        ));
        assert!(matches!(
            w.sign_tx_with_passphrase(&other, &pass, TypedTransaction::Legacy(Default::default()), 1),
            Err(WalletError::UnknownAccount)
        ));

        assert_eq!(w.keystore.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backend_errors_pass_through() {
        let w = wallet(RecordingBackend::default());
        let own = Account::from_address(ADDR);

        let err = w.sign_text(&own, b"msg").unwrap_err();
        assert!(matches!(err, WalletError::Backend(Refused)));
        assert_eq!(err.to_string(), "refused");
        assert_eq!(w.keystore.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn derive_is_unsupported() {
        let w = wallet(RecordingBackend::default());
        for path in [DerivationPath::default_base(), DerivationPath::new(vec![])] {
            assert!(matches!(
                w.derive(&path, true),
                Err(WalletError::UnsupportedCapability)
            ));
            assert!(matches!(
                w.derive(&path, false),
                Err(WalletError::UnsupportedCapability)
            ));
        }
    }

    #[test]
    fn self_derive_is_a_noop() {
        let w = wallet(RecordingBackend::default());
        let before = w.accounts();
        w.self_derive(&[DerivationPath::default_base()], &UnreachableChain);
        assert_eq!(w.accounts(), before);
        assert_eq!(w.keystore.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn open_close_are_noops() {
        let w = wallet(RecordingBackend::default());
        let pass = passphrase();
        for _ in 0..3 {
            w.open(&pass).unwrap();
            w.close().unwrap();
            w.close().unwrap();
        }
        assert_eq!(w.accounts(), vec![Account::new(ADDR, AccountUrl::new("keystore", "k1"))]);
        assert_eq!(w.status().unwrap(), WalletStatus::Locked);
    }

    #[test]
    fn status_reflects_backend() {
        let locked = wallet(RecordingBackend::default());
        assert_eq!(locked.status().unwrap(), WalletStatus::Locked);

        let unlocked = wallet(RecordingBackend {
            unlocked: true,
            ..Default::default()
        });
        assert_eq!(unlocked.status().unwrap(), WalletStatus::Unlocked);
    }

    #[test]
    fn url_and_debug() {
        let w = wallet(RecordingBackend::default());
        assert_eq!(w.url(), Some(&AccountUrl::new("keystore", "k1")));
        let debug = format!("{:?}", w);
        assert!(debug.contains("KeystoreWallet"));
        assert!(!debug.contains("RecordingBackend"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn every_signing_path_logs_delegation() {
        let w = wallet(RecordingBackend::default());
        let own = Account::from_address(ADDR);
        let pass = passphrase();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let _ = w.sign_data(&own, "text/plain", b"m");
            let _ = w.sign_data_with_passphrase(&own, &pass, "text/plain", b"m");
            let _ = w.sign_text(&own, b"m");
            let _ = w.sign_text_with_passphrase(&own, &pass, b"m");
            let _ = w.sign_tx(&own, TypedTransaction::Legacy(Default::default()), 1);
            let _ = w.sign_tx_with_passphrase(
                &own,
                &pass,
                TypedTransaction::Legacy(Default::default()),
                1,
            );
        });

        let output = String::from_utf8(captured.0.lock().clone()).unwrap();
        for message in [
            "Signing data",
            "Signing data with passphrase",
            "Signing text",
            "Signing text with passphrase",
            "Signing transaction",
            "Signing transaction with passphrase",
        ] {
            assert!(
                output.contains(&format!(": {message} address=")),
                "missing {message:?} in {output}"
            );
        }
        assert_eq!(output.lines().count(), 6);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn wallet_is_send_sync() {
        assert_send_sync::<KeystoreWallet<RecordingBackend>>();
    }
}
