//! Signed-in identity signal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{DaycalError, DaycalResult};
use crate::event::OwnerId;

/// Source of the current identity and of notifications when it changes.
pub trait IdentityService: Send + Sync {
    fn current(&self) -> Option<OwnerId>;

    /// Receiver that observes every sign-in and sign-out.
    fn changes(&self) -> watch::Receiver<Option<OwnerId>>;
}

/// In-process identity holder.
pub struct Session {
    current: watch::Sender<Option<OwnerId>>,
}

impl Session {
    pub fn signed_out() -> Self {
        Session {
            current: watch::Sender::new(None),
        }
    }

    pub fn signed_in(owner: OwnerId) -> Self {
        Session {
            current: watch::Sender::new(Some(owner)),
        }
    }

    pub fn sign_in(&self, owner: OwnerId) {
        tracing::info!(owner = %owner, "Signed in");
        self.current.send_replace(Some(owner));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.current.send_replace(None) {
            tracing::info!(owner = %previous, "Signed out");
        }
    }
}

impl IdentityService for Session {
    fn current(&self) -> Option<OwnerId> {
        self.current.borrow().clone()
    }

    fn changes(&self) -> watch::Receiver<Option<OwnerId>> {
        self.current.subscribe()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    owner_id: OwnerId,
}

/// Signed-in identity persisted between runs.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionFile { path: path.into() }
    }

    pub async fn load(&self) -> DaycalResult<Session> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Session::signed_out());
            }
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSession = serde_json::from_str(&content).map_err(|e| {
            DaycalError::Serialization(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Session::signed_in(stored.owner_id))
    }

    /// Remember `owner`, or forget the stored identity when `None`.
    pub async fn save(&self, owner: Option<&OwnerId>) -> DaycalResult<()> {
        let Some(owner) = owner else {
            return match tokio::fs::remove_file(&self.path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string(&StoredSession {
            owner_id: owner.clone(),
        })
        .map_err(|e| DaycalError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}
