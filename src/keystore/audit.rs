//! Signing audit log
//!
//! Appends one JSON line per signing attempt made against a key store:
//! which account, which kind of signature, and whether it succeeded.
//! Digests, payloads and passphrases are never written.

use alloy::primitives::{Address, ChainId};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Kind of signing request being audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignKind {
    Hash,
    HashWithPassphrase,
    Transaction,
    TransactionWithPassphrase,
}

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    kind: SignKind,
    address: Address,
    chain_id: Option<ChainId>,
    status: &'static str,
    error: Option<&'a str>,
}

/// Append-only JSONL writer for signing attempts
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    // Serializes appends so concurrent entries never interleave
    lock: Mutex<()>,
}

impl AuditLog {
    /// Create an audit log writing to `path` (created on first entry)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Record the outcome of one signing attempt
    ///
    /// Write failures are logged and otherwise ignored; auditing never blocks
    /// a signature.
    pub fn record<T, E: std::fmt::Display>(
        &self,
        kind: SignKind,
        address: Address,
        chain_id: Option<ChainId>,
        outcome: &Result<T, E>,
    ) {
        let error = outcome.as_ref().err().map(|e| e.to_string());
        let entry = AuditEntry {
            timestamp: Utc::now(),
            kind,
            address,
            chain_id,
            status: if outcome.is_ok() { "success" } else { "error" },
            error: error.as_deref(),
        };

        if let Err(e) = self.write(&entry) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to write audit log entry");
        }
    }

    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)
    }
}
