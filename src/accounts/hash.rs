//! Digests signed by each wallet operation
//!
//! Raw data is hashed as-is. Text gets the EIP-191 personal message prefix
//! first, so a text signature can never be replayed as a signature over raw
//! data or a transaction.

use alloy::primitives::{eip191_hash_message, keccak256, B256};

/// Digest for [`Wallet::sign_data`](super::Wallet::sign_data): `keccak256(data)`
pub fn data_hash(data: &[u8]) -> B256 {
    keccak256(data)
}

/// Digest for [`Wallet::sign_text`](super::Wallet::sign_text):
/// `keccak256("\x19Ethereum Signed Message:\n" || len(text) || text)`
pub fn text_hash(text: &[u8]) -> B256 {
    eip191_hash_message(text)
}
