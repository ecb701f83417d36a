//! OS credential store backend.
//!
//! Uses the `keyring` crate, which talks to:
//! - macOS: Keychain (generic passwords, service = namespace)
//! - Windows: Credential Manager
//! - Linux and the BSDs: Secret Service (GNOME Keyring / KWallet)
//!
//! `keyring` has no search primitive, so listing goes to the same store
//! directly: Secret Service `search_items` on the `service` attribute, or
//! a Keychain item search on the service name. Windows cannot list.

use super::{EntryError, EntryVisitor, Identity, SecretBackend};
use crate::error::BackendError;
use ::keyring::{Entry, Error as KeyringError};
use zeroize::Zeroizing;

/// Platforms where `keyring` is built with a real store. Anywhere else it
/// would fall back to its in-memory mock.
const NATIVE_STORE: bool = cfg!(any(
    target_os = "macos",
    target_os = "windows",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd"
));

const CAN_LIST: bool = cfg!(any(
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd"
));

type EntryFactory = dyn Fn(&str, &str) -> ::keyring::Result<Entry> + Send + Sync;

/// Secrets stored in the platform keychain
pub struct KeyringBackend {
    make_entry: Box<EntryFactory>,
}

impl KeyringBackend {
    /// Connect to the platform store. Fails where none is available.
    pub fn new() -> Result<Self, BackendError> {
        if !NATIVE_STORE {
            return Err(BackendError::Unavailable(
                "no native credential store on this platform".to_string(),
            ));
        }
        Ok(Self {
            make_entry: Box::new(Entry::new),
        })
    }

    #[cfg(test)]
    fn with_entries<F>(make_entry: F) -> Self
    where
        F: Fn(&str, &str) -> ::keyring::Result<Entry> + Send + Sync + 'static,
    {
        Self {
            make_entry: Box::new(make_entry),
        }
    }

    fn entry(&self, namespace: &str, account: &str) -> Result<Entry, BackendError> {
        (self.make_entry)(namespace, account).map_err(map_error)
    }
}

impl SecretBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn set(&self, namespace: &str, account: &str, secret: &[u8]) -> Result<(), BackendError> {
        match self.entry(namespace, account)?.set_secret(secret) {
            Ok(()) => Ok(()),
            // Nothing to write into, e.g. no default collection
            Err(KeyringError::NoEntry) => Err(BackendError::Unavailable(
                "no keyring available to store the entry".to_string(),
            )),
            Err(e) => Err(map_error(e)),
        }
    }

    fn get(
        &self,
        namespace: &str,
        account: &str,
    ) -> Result<Option<Zeroizing<Vec<u8>>>, BackendError> {
        match self.entry(namespace, account)?.get_secret() {
            Ok(secret) => Ok(Some(Zeroizing::new(secret))),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    fn delete(&self, namespace: &str, account: &str) -> Result<bool, BackendError> {
        match self.entry(namespace, account)?.delete_credential() {
            Ok(()) => Ok(true),
            // Already gone counts as deleted
            Err(KeyringError::NoEntry) => Ok(false),
            Err(e) => Err(map_error(e)),
        }
    }

    fn supports_enumeration(&self) -> bool {
        CAN_LIST
    }

    fn for_each_entry(
        &self,
        namespace: &str,
        visit: &mut EntryVisitor<'_>,
    ) -> Result<(), BackendError> {
        list_accounts(namespace, visit)
    }
}

/// Hand one decoded account (or the reason it could not be decoded) to the visitor
#[cfg(any(
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd"
))]
fn visit_account(
    account: Result<String, EntryError>,
    visit: &mut EntryVisitor<'_>,
) -> std::ops::ControlFlow<()> {
    match account {
        Ok(account) => visit(Ok(Identity::new(&account))),
        Err(e) => visit(Err(e)),
    }
}

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd"))]
fn list_accounts(namespace: &str, visit: &mut EntryVisitor<'_>) -> Result<(), BackendError> {
    use secret_service::blocking::SecretService;
    use secret_service::EncryptionType;
    use std::collections::HashMap;

    let service = SecretService::connect(EncryptionType::Dh)
        .map_err(|e| BackendError::Unavailable(e.to_string()))?;
    let found = service
        .search_items(HashMap::from([("service", namespace)]))
        .map_err(|e| BackendError::Platform(e.to_string()))?;

    // Attributes stay readable on locked items, so both halves are listed
    for item in found.unlocked.iter().chain(found.locked.iter()) {
        let account = item
            .get_attributes()
            .map_err(|e| EntryError(format!("cannot read item attributes ({})", e)))
            .and_then(|mut attributes| {
                attributes
                    .remove("username")
                    .ok_or_else(|| EntryError("item has no username attribute".to_string()))
            });
        if visit_account(account, visit).is_break() {
            break;
        }
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn list_accounts(namespace: &str, visit: &mut EntryVisitor<'_>) -> Result<(), BackendError> {
    use security_framework::item::{ItemClass, ItemSearchOptions, Limit};

    const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

    let results = match ItemSearchOptions::new()
        .class(ItemClass::generic_password())
        .service(namespace)
        .load_attributes(true)
        .limit(Limit::All)
        .search()
    {
        Ok(results) => results,
        Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => return Ok(()),
        Err(e) => return Err(BackendError::Platform(e.to_string())),
    };

    for result in &results {
        let account = result
            .simplify_dict()
            .and_then(|mut attributes| attributes.remove("acct"))
            .ok_or_else(|| EntryError("keychain item has no account attribute".to_string()));
        if visit_account(account, visit).is_break() {
            break;
        }
    }

    Ok(())
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd"
)))]
fn list_accounts(_namespace: &str, _visit: &mut EntryVisitor<'_>) -> Result<(), BackendError> {
    Err(BackendError::Unsupported)
}

/// Translate a keyring failure. `NoEntry` is handled per operation.
fn map_error(err: KeyringError) -> BackendError {
    match err {
        KeyringError::NoStorageAccess(e) => BackendError::AccessDenied(e.to_string()),
        KeyringError::PlatformFailure(e) => BackendError::Unavailable(e.to_string()),
        KeyringError::TooLong(attr, limit) => {
            BackendError::TooLong(format!("{} is limited to {} bytes", attr, limit))
        }
        KeyringError::BadEncoding(_) => {
            BackendError::Corrupt("stored value has an unexpected encoding".to_string())
        }
        KeyringError::Ambiguous(matches) => {
            BackendError::Corrupt(format!("{} entries match the same account", matches.len()))
        }
        KeyringError::Invalid(attr, reason) => {
            BackendError::Platform(format!("invalid {}: {}", attr, reason))
        }
        other => BackendError::Platform(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::keyring::mock::MockCredential;
    use std::io;
    use std::ops::ControlFlow;

    /// Backend whose entries are fresh mock credentials, optionally primed
    /// to fail their next call
    fn mock_backend(fail_with: fn() -> Option<KeyringError>) -> KeyringBackend {
        KeyringBackend::with_entries(move |_, _| {
            let credential = MockCredential::default();
            if let Some(err) = fail_with() {
                credential.set_error(err);
            }
            Ok(Entry::new_with_credential(Box::new(credential)))
        })
    }

    #[test]
    fn test_error_mapping() {
        let locked = KeyringError::NoStorageAccess(Box::new(io::Error::other("locked")));
        assert_eq!(
            map_error(locked),
            BackendError::AccessDenied("locked".to_string())
        );

        let down = KeyringError::PlatformFailure(Box::new(io::Error::other("no daemon")));
        assert!(matches!(map_error(down), BackendError::Unavailable(_)));

        let long = KeyringError::TooLong("password".to_string(), 4096);
        assert_eq!(
            map_error(long),
            BackendError::TooLong("password is limited to 4096 bytes".to_string())
        );

        let bad = KeyringError::BadEncoding(vec![0xFF]);
        assert!(matches!(map_error(bad), BackendError::Corrupt(_)));

        let invalid = KeyringError::Invalid("user".to_string(), "empty".to_string());
        assert!(matches!(map_error(invalid), BackendError::Platform(_)));
    }

    #[test]
    fn test_mock_store_reports_absence() {
        // Every mock entry is a fresh credential, so nothing written is
        // visible to a later lookup. That is enough to check NoEntry handling.
        let backend = mock_backend(|| None);
        backend.set("passkeep-test", "/tmp/key", b"").unwrap();
        assert!(backend.get("passkeep-test", "/tmp/key").unwrap().is_none());
        assert!(!backend.delete("passkeep-test", "/tmp/key").unwrap());
    }

    #[test]
    fn test_no_entry_on_write_is_unavailable() {
        let backend = mock_backend(|| Some(KeyringError::NoEntry));
        let err = backend.set("passkeep-test", "/tmp/key", b"x").unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[test]
    fn test_access_denied_on_read() {
        let backend = mock_backend(|| {
            Some(KeyringError::NoStorageAccess(Box::new(io::Error::other(
                "keychain locked",
            ))))
        });
        let err = backend.get("passkeep-test", "/tmp/key").unwrap_err();
        assert_eq!(err, BackendError::AccessDenied("keychain locked".to_string()));
    }

    #[test]
    fn test_native_store_is_required() {
        assert_eq!(KeyringBackend::new().is_ok(), NATIVE_STORE);
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd"
    ))]
    #[test]
    fn test_visit_account_passes_errors_through() {
        let mut seen = Vec::new();
        let mut bad = 0;
        let mut visitor = |entry: Result<Identity<'_>, EntryError>| {
            match entry {
                Ok(identity) => seen.push(identity.resource().to_string()),
                Err(_) => bad += 1,
            }
            ControlFlow::Continue(())
        };
        let _ = visit_account(Ok("/keys/a".to_string()), &mut visitor);
        let _ = visit_account(Err(EntryError("no username".to_string())), &mut visitor);
        drop(visitor);

        assert_eq!(seen, vec!["/keys/a".to_string()]);
        assert_eq!(bad, 1);
    }

    #[test]
    #[ignore] // Requires actual keychain access
    fn test_keyring_roundtrip() {
        let backend = KeyringBackend::new().unwrap();
        let namespace = "passkeep-test";
        let account = "/tmp/passkeep-test-key";

        backend.set(namespace, account, b"first").unwrap();
        backend.set(namespace, account, b"second").unwrap();
        let value = backend.get(namespace, account).unwrap().unwrap();
        assert_eq!(value.as_slice(), b"second");

        assert!(backend.delete(namespace, account).unwrap());
        assert!(backend.get(namespace, account).unwrap().is_none());
        assert!(!backend.delete(namespace, account).unwrap());
    }

    #[test]
    #[ignore] // Requires actual keychain access
    fn test_keyring_listing() {
        let backend = KeyringBackend::new().unwrap();
        assert!(backend.supports_enumeration());
        let namespace = "passkeep-list-test";

        backend.set(namespace, "/tmp/passkeep-list-a", b"a").unwrap();
        backend.set(namespace, "/tmp/passkeep-list-b", b"b").unwrap();

        let mut seen = Vec::new();
        backend
            .for_each_entry(namespace, &mut |entry| {
                if let Ok(identity) = entry {
                    seen.push(identity.resource().to_string());
                }
                ControlFlow::Continue(())
            })
            .unwrap();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                "/tmp/passkeep-list-a".to_string(),
                "/tmp/passkeep-list-b".to_string()
            ]
        );

        let mut calls = 0;
        backend
            .for_each_entry(namespace, &mut |_| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(calls, 1);

        backend.delete(namespace, "/tmp/passkeep-list-a").unwrap();
        backend.delete(namespace, "/tmp/passkeep-list-b").unwrap();
    }
}
