//! Owned passphrase buffer handed to callers by `Vault::read`.
//!
//! The bytes live in a `Zeroizing<Vec<u8>>` and are wiped when the
//! `Passphrase` is dropped. Debug and Display never show the content.

use std::fmt;

use zeroize::Zeroizing;

/// A passphrase read back from the vault.
///
/// Every read produces a fresh buffer; nothing else holds a reference to
/// it. Callers that need the raw bytes beyond this wrapper can take them
/// with [`Passphrase::into_bytes`], which keeps the wipe-on-drop guarantee.
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    /// Copy `bytes` into a new owned buffer.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(bytes.to_vec()))
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Try to interpret the bytes as a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Give up the wrapper and keep the zeroizing buffer.
    pub fn into_bytes(self) -> Zeroizing<Vec<u8>> {
        self.0
    }
}

impl From<Zeroizing<Vec<u8>>> for Passphrase {
    fn from(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}
