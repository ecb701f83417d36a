//! In-process secret store.
//!
//! Entries live in a `RwLock`ed map and vanish with the process. Account
//! names are kept as raw bytes, the way platform stores keep attributes,
//! so records that are not valid UTF-8 can exist and show up as malformed
//! during enumeration.

use super::{EntryError, EntryVisitor, Identity, SecretBackend};
use crate::error::BackendError;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use zeroize::Zeroizing;

type Namespace = HashMap<Vec<u8>, Zeroizing<Vec<u8>>>;

/// Secrets held in memory, grouped by namespace
#[derive(Default)]
pub struct MemoryBackend {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with an arbitrary account name, bypassing the
    /// adapter. Used to simulate entries written by other tools.
    pub fn insert_raw(
        &self,
        namespace: &str,
        account: &[u8],
        secret: &[u8],
    ) -> Result<(), BackendError> {
        self.write()?
            .entry(namespace.to_string())
            .or_default()
            .insert(account.to_vec(), Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Namespace>>, BackendError> {
        self.namespaces
            .read()
            .map_err(|_| BackendError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Namespace>>, BackendError> {
        self.namespaces
            .write()
            .map_err(|_| BackendError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl SecretBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set(&self, namespace: &str, account: &str, secret: &[u8]) -> Result<(), BackendError> {
        // Copy before taking the lock so the swap itself is a single insert
        let value = Zeroizing::new(secret.to_vec());
        self.write()?
            .entry(namespace.to_string())
            .or_default()
            .insert(account.as_bytes().to_vec(), value);
        Ok(())
    }

    fn get(
        &self,
        namespace: &str,
        account: &str,
    ) -> Result<Option<Zeroizing<Vec<u8>>>, BackendError> {
        let namespaces = self.read()?;
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.get(account.as_bytes()))
            .map(|secret| Zeroizing::new(secret.to_vec())))
    }

    fn delete(&self, namespace: &str, account: &str) -> Result<bool, BackendError> {
        let mut namespaces = self.write()?;
        let Some(entries) = namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        let removed = entries.remove(account.as_bytes()).is_some();
        if entries.is_empty() {
            namespaces.remove(namespace);
        }
        Ok(removed)
    }

    fn supports_enumeration(&self) -> bool {
        true
    }

    /// Holds the read lock for the whole walk. A visitor that writes to
    /// the same backend will deadlock.
    fn for_each_entry(
        &self,
        namespace: &str,
        visit: &mut EntryVisitor<'_>,
    ) -> Result<(), BackendError> {
        let namespaces = self.read()?;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(());
        };

        for account in entries.keys() {
            let entry = std::str::from_utf8(account)
                .map(Identity::new)
                .map_err(|e| EntryError(format!("account name is not UTF-8 ({})", e)));
            if visit(entry).is_break() {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::ControlFlow;

    #[test]
    fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        assert!(backend.get("ns", "a").unwrap().is_none());

        backend.set("ns", "a", b"one").unwrap();
        assert_eq!(backend.get("ns", "a").unwrap().unwrap().as_slice(), b"one");

        assert!(backend.delete("ns", "a").unwrap());
        assert!(!backend.delete("ns", "a").unwrap());
        assert!(backend.get("ns", "a").unwrap().is_none());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let backend = MemoryBackend::new();
        backend.set("ours", "a", b"1").unwrap();
        backend.set("theirs", "a", b"2").unwrap();

        assert_eq!(backend.get("ours", "a").unwrap().unwrap().as_slice(), b"1");
        assert!(backend.delete("ours", "a").unwrap());
        assert_eq!(backend.get("theirs", "a").unwrap().unwrap().as_slice(), b"2");
    }

    #[test]
    fn test_walk_reports_malformed_accounts() {
        let backend = MemoryBackend::new();
        backend.set("ns", "good", b"x").unwrap();
        backend.insert_raw("ns", &[0xC3, 0x28], b"y").unwrap();

        let mut good = Vec::new();
        let mut bad = 0;
        backend
            .for_each_entry("ns", &mut |entry| {
                match entry {
                    Ok(identity) => good.push(identity.resource().to_string()),
                    Err(_) => bad += 1,
                }
                ControlFlow::Continue(())
            })
            .unwrap();

        assert_eq!(good, vec!["good".to_string()]);
        assert_eq!(bad, 1);
    }

    #[test]
    fn test_walk_unknown_namespace_is_empty() {
        let backend = MemoryBackend::new();
        let mut calls = 0;
        backend
            .for_each_entry("nothing-here", &mut |_| {
                calls += 1;
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(calls, 0);
    }
}
