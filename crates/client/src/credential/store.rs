// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The credential store: holder of the one current session credential.

use parking_lot::Mutex;

use crate::credential::persist::{KeyValueStore, MemoryStore};
use crate::credential::{Credential, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Current session credential over a pluggable key-value backend.
///
/// Both keys are read and written under one lock, so `get` never observes
/// the access token of one credential paired with the refresh token of
/// another.
pub struct CredentialStore {
    backend: Mutex<Box<dyn KeyValueStore>>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self { backend: Mutex::new(Box::new(backend)) }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// The stored credential, or `None` when there is no session.
    pub fn get(&self) -> Option<Credential> {
        let backend = self.backend.lock();
        let access = backend.read(ACCESS_TOKEN_KEY)?;
        Credential::new(access, backend.read(REFRESH_TOKEN_KEY))
    }

    /// Replace the credential; both keys change in one backend update.
    pub fn set(&self, credential: &Credential) {
        self.backend.lock().update(&[
            (ACCESS_TOKEN_KEY, Some(credential.access_token())),
            (REFRESH_TOKEN_KEY, credential.refresh_token()),
        ]);
    }

    pub fn clear(&self) {
        self.backend.lock().update(&[(ACCESS_TOKEN_KEY, None), (REFRESH_TOKEN_KEY, None)]);
    }

    /// The stored refresh token, independent of the access token.
    pub fn refresh_token(&self) -> Option<String> {
        self.backend.lock().read(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some()
    }

    /// A usable access token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").field("authenticated", &self.is_authenticated()).finish()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
