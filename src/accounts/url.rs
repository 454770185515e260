//! Account locators

use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Locator of an account within its backend, rendered as `scheme://path`
///
/// The scheme names the backend kind (`keystore`, `ledger`, ...) and the path
/// identifies the key material within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountUrl {
    scheme: String,
    path: String,
}

impl AccountUrl {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Shortened form for terminal output
    ///
    /// Drops the scheme and keeps the last 32 characters of the path.
    pub fn terminal_string(&self) -> String {
        let count = self.path.chars().count();
        if count <= 32 {
            return self.path.clone();
        }
        let tail: String = self.path.chars().skip(count - 31).collect();
        format!("..{}", tail)
    }
}

impl fmt::Display for AccountUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            return f.write_str(&self.path);
        }
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

impl FromStr for AccountUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, path) = s
            .split_once("://")
            .ok_or_else(|| Error::InvalidUrl(format!("{:?} has no scheme", s)))?;
        if scheme.is_empty() {
            return Err(Error::InvalidUrl(format!("{:?} has an empty scheme", s)));
        }
        Ok(Self::new(scheme, path))
    }
}

impl Serialize for AccountUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
