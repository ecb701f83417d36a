//! passkeep - Passphrases for protected files, kept in the OS vault
//!
//! Stores, reads, removes and lists the passphrases that unlock named
//! resources (usually key files on disk). Nothing is persisted by this
//! crate: every entry lives in a platform secret store, filed under a
//! fixed namespace so it cannot collide with other applications.
//!
//! The [`Vault`] adapter is stateless. Every call goes straight to the
//! backend, blocks until it answers, and is never cached.

pub mod backend;
pub mod error;
pub mod passphrase;
pub mod vault;

pub use backend::{EntryError, Identity, KeyringBackend, MemoryBackend, SecretBackend};
pub use error::{BackendError, VaultError};
pub use passphrase::Passphrase;
pub use vault::{Enumeration, Vault};
