//! Secret store backends
//!
//! A backend files secrets under (namespace, account) pairs. The vault
//! adapter passes its namespace and the resource identifier as the
//! account; backends know nothing about resources or passphrases beyond
//! that.
//!
//! Listing is optional. Backends that can walk their entries override
//! [`SecretBackend::supports_enumeration`] and
//! [`SecretBackend::for_each_entry`]; the rest keep the defaults and the
//! adapter reports the capability as missing.

mod keychain;
mod memory;

pub use self::keychain::KeyringBackend;
pub use self::memory::MemoryBackend;

use crate::error::BackendError;
use passkeep_core::BackendKind;
use std::ops::ControlFlow;
use thiserror::Error;
use zeroize::Zeroizing;

/// One stored entry seen during enumeration.
///
/// Borrowed from the backend for the duration of a single visitor call.
/// Copy [`Identity::resource`] out if it is needed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity<'a> {
    resource: &'a str,
}

impl<'a> Identity<'a> {
    pub fn new(resource: &'a str) -> Self {
        Self { resource }
    }

    /// The resource identifier the entry is stored under
    pub fn resource(&self) -> &'a str {
        self.resource
    }
}

/// A single stored record that could not be turned into an [`Identity`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed entry: {0}")]
pub struct EntryError(pub String);

/// Per-entry callback used by [`SecretBackend::for_each_entry`]
pub type EntryVisitor<'v> =
    dyn for<'a> FnMut(Result<Identity<'a>, EntryError>) -> ControlFlow<()> + 'v;

/// A platform secret store
pub trait SecretBackend: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Create or replace the secret for `account`.
    ///
    /// Replacement must be atomic: readers see the old bytes or the new
    /// bytes, never a mix, and a failed write leaves the old entry intact.
    fn set(&self, namespace: &str, account: &str, secret: &[u8]) -> Result<(), BackendError>;

    /// Fetch a copy of the secret, `None` when there is no entry.
    fn get(&self, namespace: &str, account: &str)
        -> Result<Option<Zeroizing<Vec<u8>>>, BackendError>;

    /// Delete the entry. Returns `false` when there was nothing to delete.
    fn delete(&self, namespace: &str, account: &str) -> Result<bool, BackendError>;

    /// Whether [`SecretBackend::for_each_entry`] is implemented
    fn supports_enumeration(&self) -> bool {
        false
    }

    /// Walk the entries of `namespace` in native order, one callback per
    /// record, until the entries run out or the visitor breaks.
    fn for_each_entry(
        &self,
        _namespace: &str,
        _visit: &mut EntryVisitor<'_>,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }
}

/// Construct the backend selected in the configuration
pub fn open(kind: BackendKind) -> Result<Box<dyn SecretBackend>, BackendError> {
    let backend: Box<dyn SecretBackend> = match kind {
        BackendKind::Keyring => Box::new(KeyringBackend::new()?),
        BackendKind::Memory => Box::new(MemoryBackend::new()),
    };
    Ok(backend)
}
