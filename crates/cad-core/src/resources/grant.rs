//! Ephemeral grants with at-most-once release.

use std::sync::{Arc, Mutex, PoisonError};

use cad_clients::{ClientResult, Provisioned, ReleaseFn};

/// Release side of a grant. The wrapped function runs at most once no matter
/// how many clones of the owning [`ScopedGrant`] exist.
pub struct ReleaseOnce {
    label: String,
    release: Mutex<Option<ReleaseFn>>,
}

impl ReleaseOnce {
    pub fn new(label: impl Into<String>, release: ReleaseFn) -> Self {
        Self {
            label: label.into(),
            release: Mutex::new(Some(release)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_released(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Run the release. `None` when it already ran.
    pub async fn release(&self) -> Option<ClientResult<()>> {
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        Some(release().await)
    }
}

impl std::fmt::Debug for ReleaseOnce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseOnce")
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}

/// A provisioned handle plus its shared release.
#[derive(Debug)]
pub struct ScopedGrant<H> {
    handle: Arc<H>,
    release: Arc<ReleaseOnce>,
}

impl<H> Clone for ScopedGrant<H> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            release: Arc::clone(&self.release),
        }
    }
}

impl<H> ScopedGrant<H> {
    pub fn from_provisioned(label: impl Into<String>, provisioned: Provisioned<H>) -> Self {
        Self {
            handle: Arc::new(provisioned.handle),
            release: Arc::new(ReleaseOnce::new(label, provisioned.release)),
        }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub(crate) fn release_handle(&self) -> Arc<ReleaseOnce> {
        Arc::clone(&self.release)
    }
}
