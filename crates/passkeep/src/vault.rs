//! Vault - the passphrase adapter over a secret store backend
//!
//! Resource identifiers (usually file paths) become account names inside
//! one fixed namespace. Each operation is a single synchronous backend
//! call; nothing is cached, so a value stored or removed by another
//! process is seen by the very next read.

use crate::backend::{self, Identity, SecretBackend};
use crate::error::{BackendError, VaultError};
use crate::passphrase::Passphrase;
use passkeep_core::Config;
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Outcome of a completed enumeration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enumeration {
    /// Entries handed to the visitor
    pub visited: usize,
    /// Malformed entries skipped
    pub skipped: usize,
    /// The visitor asked to stop before the entries ran out
    pub stopped_early: bool,
}

/// The passphrase vault
pub struct Vault {
    backend: Box<dyn SecretBackend>,
    namespace: String,
}

impl Vault {
    /// Create a vault over `backend`, filing entries under `namespace`
    pub fn new<B: SecretBackend + 'static>(backend: B, namespace: impl Into<String>) -> Self {
        Self::with_backend(Box::new(backend), namespace)
    }

    pub fn with_backend(backend: Box<dyn SecretBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    /// Open the backend and namespace named in `config`
    pub fn from_config(config: &Config) -> Result<Self, VaultError> {
        let backend = backend::open(config.backend).map_err(|source| VaultError::Open {
            backend: config.backend.as_str(),
            source,
        })?;
        Ok(Self::with_backend(backend, config.namespace.clone()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether [`Vault::enumerate`] is available on this backend
    pub fn can_enumerate(&self) -> bool {
        self.backend.supports_enumeration()
    }

    /// Store a passphrase, replacing any previous one.
    ///
    /// The bytes are copied into the backend; `passphrase` is not retained.
    /// An empty passphrase is stored as an empty value.
    pub fn store(&self, resource: &str, passphrase: &[u8]) -> Result<(), VaultError> {
        validate_resource(resource)?;
        debug!("Storing passphrase for {} in {}", resource, self.namespace);

        self.backend
            .set(&self.namespace, resource, passphrase)
            .map_err(|source| VaultError::Write {
                resource: resource.to_string(),
                source,
            })
    }

    /// Read a passphrase.
    ///
    /// `Ok(None)` means nothing is stored for `resource`. The returned
    /// buffer belongs to the caller and is wiped when dropped.
    pub fn read(&self, resource: &str) -> Result<Option<Passphrase>, VaultError> {
        validate_resource(resource)?;
        debug!("Reading passphrase for {} from {}", resource, self.namespace);

        let secret = self
            .backend
            .get(&self.namespace, resource)
            .map_err(|source| VaultError::Read {
                resource: resource.to_string(),
                source,
            })?;

        if secret.is_none() {
            debug!("No passphrase stored for {}", resource);
        }
        Ok(secret.map(Passphrase::from))
    }

    /// Whether a passphrase is stored for `resource`
    pub fn contains(&self, resource: &str) -> Result<bool, VaultError> {
        Ok(self.read(resource)?.is_some())
    }

    /// Make sure no passphrase is stored for `resource`.
    ///
    /// Removing an entry that does not exist succeeds.
    pub fn remove(&self, resource: &str) -> Result<(), VaultError> {
        validate_resource(resource)?;
        debug!("Removing passphrase for {} from {}", resource, self.namespace);

        let removed = self
            .backend
            .delete(&self.namespace, resource)
            .map_err(|source| VaultError::Write {
                resource: resource.to_string(),
                source,
            })?;

        if !removed {
            debug!("Nothing stored for {}, remove is a no-op", resource);
        }
        Ok(())
    }

    /// Visit every identity stored in this vault's namespace.
    ///
    /// Entries come in whatever order the backend yields them. The visitor
    /// runs on the calling thread while the backend's listing is open, so
    /// keep it short or return `ControlFlow::Break(())` to stop early.
    /// Entries that cannot be decoded are logged and skipped. Each call
    /// starts a fresh pass over the backend's current contents.
    pub fn enumerate<F>(&self, mut visit: F) -> Result<Enumeration, VaultError>
    where
        F: FnMut(Identity<'_>) -> ControlFlow<()>,
    {
        if !self.can_enumerate() {
            return Err(VaultError::EnumerationUnsupported(self.backend.name()));
        }
        debug!("Enumerating {} via {}", self.namespace, self.backend.name());

        let namespace = self.namespace.as_str();
        let mut summary = Enumeration::default();
        let result = self.backend.for_each_entry(namespace, &mut |entry| match entry {
            Ok(identity) => {
                summary.visited += 1;
                let flow = visit(identity);
                if flow.is_break() {
                    summary.stopped_early = true;
                }
                flow
            }
            Err(e) => {
                warn!("Skipping vault entry in {}: {}", namespace, e);
                summary.skipped += 1;
                ControlFlow::Continue(())
            }
        });

        match result {
            Ok(()) => Ok(summary),
            Err(BackendError::Unsupported) => {
                Err(VaultError::EnumerationUnsupported(self.backend.name()))
            }
            Err(source) => Err(VaultError::Enumeration {
                namespace: self.namespace.clone(),
                source,
            }),
        }
    }
}

fn validate_resource(resource: &str) -> Result<(), VaultError> {
    if resource.is_empty() {
        return Err(VaultError::InvalidIdentifier(
            "Resource identifier cannot be empty".to_string(),
        ));
    }
    if resource.contains('\0') {
        return Err(VaultError::InvalidIdentifier(format!(
            "Resource identifier contains a NUL byte: {:?}",
            resource
        )));
    }
    Ok(())
}
