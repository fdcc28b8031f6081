//! Identity provider contract and an in-memory implementation.

use crate::error::AuthError;
use crate::types::IdentityId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub display_name: String,
}

/// Authentication collaborator.
pub trait IdentityProvider: Send + Sync {
    /// Create an account. The new account is left signed out.
    fn register(&self, name: &str, email: &str, password: &str) -> Result<Identity, AuthError>;

    fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    fn logout(&self);

    /// Currently signed-in identity.
    fn current(&self) -> Option<Identity>;

    /// Stream of auth-state changes, starting with the current state.
    fn watch(&self) -> IdentityWatch;
}

/// Receiver side of an auth-state subscription.
pub struct IdentityWatch {
    receiver: Receiver<Option<Identity>>,
}

impl IdentityWatch {
    pub fn recv(&self) -> Result<Option<Identity>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Option<Identity>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Identity>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

struct Account {
    identity: Identity,
    salt: String,
    digest: String,
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Accounts held in process memory.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    /// Keyed by lowercased email.
    accounts: RwLock<HashMap<String, Account>>,
    current: Mutex<Option<Identity>>,
    watchers: Mutex<Vec<Sender<Option<Identity>>>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_current(&self, identity: Option<Identity>) {
        let mut current = self.current.lock();
        *current = identity.clone();
        // Receivers that went away are pruned.
        self.watchers
            .lock()
            .retain(|tx| tx.send(identity.clone()).is_ok());
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn register(&self, name: &str, email: &str, password: &str) -> Result<Identity, AuthError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let key = email.to_lowercase();
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse(email.to_string()));
        }

        let identity = Identity {
            id: IdentityId(Uuid::new_v4().simple().to_string()),
            email: email.to_string(),
            display_name: name.to_string(),
        };
        let salt = Uuid::new_v4().simple().to_string();
        let account = Account {
            identity: identity.clone(),
            digest: digest(&salt, password),
            salt,
        };
        accounts.insert(key, account);
        drop(accounts);

        info!(id = %identity.id, "account registered");
        self.set_current(None);
        Ok(identity)
    }

    fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let key = email.trim().to_lowercase();
        let identity = {
            let accounts = self.accounts.read();
            let account = accounts.get(&key).ok_or(AuthError::InvalidCredentials)?;
            if digest(&account.salt, password) != account.digest {
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        info!(id = %identity.id, "signed in");
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    fn logout(&self) {
        if let Some(identity) = self.current() {
            info!(id = %identity.id, "signed out");
        }
        self.set_current(None);
    }

    fn current(&self) -> Option<Identity> {
        self.current.lock().clone()
    }

    fn watch(&self) -> IdentityWatch {
        let (tx, rx) = unbounded();
        // Lock order matches set_current: current, then watchers.
        let current = self.current.lock();
        let _ = tx.send(current.clone());
        self.watchers.lock().push(tx);
        IdentityWatch { receiver: rx }
    }
}
