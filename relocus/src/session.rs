use crate::capture::CaptureOutcome;
use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Whether pointer events select elements or pass through to the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickMode {
    #[default]
    Pick,
    Browse,
}

/// Storage capability for the user's last pick mode. The host page may deny
/// persistent storage; implementations signal that with
/// [`EngineError::StorageUnavailable`] and the session degrades silently to
/// the in-memory default.
pub trait ModeStore: Send + Sync {
    fn load(&self) -> Result<Option<PickMode>, EngineError>;
    fn save(&self, mode: PickMode) -> Result<(), EngineError>;
}

/// Store used when the host grants no persistence at all.
#[derive(Debug, Default)]
pub struct NoopModeStore;

impl ModeStore for NoopModeStore {
    fn load(&self) -> Result<Option<PickMode>, EngineError> {
        Ok(None)
    }

    fn save(&self, _mode: PickMode) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Session-scoped capture state: the current pick mode plus a single
/// pending-element slot.
///
/// Passed by reference to capture and UI code instead of living as ambient
/// global state. Exactly one uncommitted capture exists at a time; starting
/// a new pick discards any previous one.
pub struct SessionContext {
    mode: PickMode,
    pending: Option<CaptureOutcome>,
    store: Box<dyn ModeStore>,
}

impl SessionContext {
    pub fn new(store: Box<dyn ModeStore>) -> Self {
        let mode = match store.load() {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                // Not surfaced to the user; the in-memory default applies.
                debug!("pick mode preference unavailable: {e}");
                PickMode::default()
            }
        };
        Self {
            mode,
            pending: None,
            store,
        }
    }

    pub fn mode(&self) -> PickMode {
        self.mode
    }

    /// Switch mode and persist the preference best-effort.
    pub fn set_mode(&mut self, mode: PickMode) {
        self.mode = mode;
        if let Err(e) = self.store.save(mode) {
            debug!("pick mode preference not persisted: {e}");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Park a fresh capture in the pending slot, discarding any uncommitted
    /// one from an earlier pick.
    pub fn begin_pick(&mut self, outcome: CaptureOutcome) -> &CaptureOutcome {
        if self.pending.is_some() {
            warn!("discarding uncommitted capture from a previous pick");
        }
        self.pending.insert(outcome)
    }

    /// Take the pending capture out for completion. The slot is cleared
    /// whether or not the caller finishes the declaration.
    pub fn take_pending(&mut self) -> Option<CaptureOutcome> {
        self.pending.take()
    }

    /// Drop an uncommitted capture, e.g. when the user dismissed a dialog.
    pub fn abandon_pick(&mut self) {
        if self.pending.take().is_some() {
            debug!("pending capture abandoned");
        }
    }
}

/// The capture overlay living inside a host page that may rebuild its own
/// tree at any moment.
pub trait OverlayHost: Send {
    fn is_mounted(&self) -> bool;
    fn mount(&mut self) -> Result<(), EngineError>;
}

/// Re-assert the overlay's presence. Idempotent: a no-op when the overlay is
/// already mounted, so repeated invocation on a timer is always safe.
/// Returns whether a mount actually happened.
pub fn ensure_overlay(host: &mut dyn OverlayHost) -> Result<bool, EngineError> {
    if host.is_mounted() {
        return Ok(false);
    }
    debug!("overlay missing, re-mounting");
    host.mount()?;
    Ok(true)
}

/// Handle for a running overlay supervisor. Dropping it stops the loop.
pub struct SupervisorHandle {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl SupervisorHandle {
    pub fn close(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn the ensure-presence check on a fixed tick. Mount failures are
/// logged and retried on the next tick rather than killing the loop: a
/// single-page app mid-render will often reject a mount that succeeds a
/// moment later.
pub fn spawn_supervisor<H>(mut host: H, period: Duration) -> SupervisorHandle
where
    H: OverlayHost + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = ensure_overlay(&mut host) {
                warn!("overlay re-mount failed, will retry: {e}");
            }
        }
    });
    SupervisorHandle {
        handle: Some(handle),
    }
}
