//! BIP-32 derivation paths
//!
//! Plain keystore wallets cannot derive, but the [`Wallet`](super::Wallet)
//! trait is shared with hierarchical backends, so paths are a real type.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Offset added to a path component to mark it hardened
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Root path under which relative paths are resolved: `m/44'/60'/0'`
pub const DEFAULT_ROOT_PATH: [u32; 3] = [
    HARDENED_OFFSET + 44,
    HARDENED_OFFSET + 60,
    HARDENED_OFFSET,
];

/// First account of the default Ethereum path: `m/44'/60'/0'/0/0`
pub const DEFAULT_BASE_PATH: [u32; 5] = [
    HARDENED_OFFSET + 44,
    HARDENED_OFFSET + 60,
    HARDENED_OFFSET,
    0,
    0,
];

/// A sequence of BIP-32 child indices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// The default Ethereum base path
    pub fn default_base() -> Self {
        Self(DEFAULT_BASE_PATH.to_vec())
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    /// Parse `m/44'/60'/0'/0/0` style paths
    ///
    /// Paths without a leading `m` are relative to [`DEFAULT_ROOT_PATH`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('/').map(str::trim).collect();

        let mut components = match parts.first() {
            Some(&"") | None => {
                return Err(Error::InvalidDerivationPath("empty derivation path".into()))
            }
            Some(&"m") => {
                parts.remove(0);
                Vec::new()
            }
            Some(_) => DEFAULT_ROOT_PATH.to_vec(),
        };

        if parts.is_empty() {
            return Err(Error::InvalidDerivationPath(
                "no components in derivation path".into(),
            ));
        }

        for part in parts {
            let (digits, hardened) = match part.strip_suffix('\'') {
                Some(digits) => (digits.trim(), true),
                None => (part, false),
            };
            let value: u32 = digits.parse().map_err(|_| {
                Error::InvalidDerivationPath(format!("invalid component {:?}", part))
            })?;
            let value = if hardened {
                value.checked_add(HARDENED_OFFSET).filter(|_| value < HARDENED_OFFSET)
            } else {
                Some(value)
            }
            .ok_or_else(|| {
                Error::InvalidDerivationPath(format!("component {:?} out of allowed range", part))
            })?;
            components.push(value);
        }

        Ok(Self(components))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for component in &self.0 {
            if *component >= HARDENED_OFFSET {
                write!(f, "/{}'", component - HARDENED_OFFSET)?;
            } else {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}
