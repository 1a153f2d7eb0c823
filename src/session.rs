// Remote session: one authenticated backend handle, opened per action.

use crate::api::{build_client, DriveBackend, StorageBackend};
use crate::auth::{CredentialBundle, DRIVE_SCOPE};
use crate::config::Config;
use crate::error::{AuthError, Error};
use std::cell::Cell;

/// Authenticated handle to the storage backend. Lives for one action
/// and is never shared between actions.
pub struct Session {
    backend: Box<dyn StorageBackend>,
    // Bumped on every enumeration; selections from older listings are stale.
    epoch: Cell<u64>,
}

impl Session {
    /// Authenticate with `credentials` for `scope` and return a session
    /// talking to the configured Drive endpoints. No retry.
    pub fn open(credentials: &CredentialBundle, scope: &str, config: &Config) -> Result<Self, Error> {
        let client = build_client(config).map_err(AuthError::Token)?;
        let token = credentials.fetch_token(&client, scope)?;
        tracing::info!(expires_at = ?token.expires_at, "session authenticated");
        Ok(Self::from_backend(Box::new(DriveBackend::new(
            client,
            config,
            token.value,
        ))))
    }

    /// Wrap an already-authenticated backend.
    pub fn from_backend(backend: Box<dyn StorageBackend>) -> Self {
        Session {
            backend,
            epoch: Cell::new(0),
        }
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub(crate) fn next_epoch(&self) -> u64 {
        let next = self.epoch.get() + 1;
        self.epoch.set(next);
        next
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.epoch.get() == epoch
    }
}

/// Opens a fresh session for each action.
pub trait SessionOpener {
    fn open_session(&self) -> Result<Session, Error>;
}

impl<F> SessionOpener for F
where
    F: Fn() -> Result<Session, Error>,
{
    fn open_session(&self) -> Result<Session, Error> {
        self()
    }
}

/// Session opener backed by the configured credential file. The file is
/// read each time a session is opened.
#[derive(Debug, Clone)]
pub struct DriveConnector {
    config: Config,
}

impl DriveConnector {
    pub fn new(config: Config) -> Self {
        DriveConnector { config }
    }
}

impl SessionOpener for DriveConnector {
    fn open_session(&self) -> Result<Session, Error> {
        let credentials = CredentialBundle::load(&self.config.credentials_path)?;
        tracing::debug!(?credentials, "credential bundle loaded");
        Session::open(&credentials, DRIVE_SCOPE, &self.config)
    }
}
