//! Tests for session pick-mode state and the overlay supervisor

use super::{node, page};
use crate::capture::{self, CaptureOutcome};
use crate::element::ElementState;
use crate::errors::EngineError;
use crate::session::{
    ensure_overlay, spawn_supervisor, ModeStore, NoopModeStore, OverlayHost, PickMode,
    SessionContext,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct RecordingStore {
    saved: Mutex<Option<PickMode>>,
}

impl ModeStore for RecordingStore {
    fn load(&self) -> Result<Option<PickMode>, EngineError> {
        Ok(*self.saved.lock().unwrap())
    }

    fn save(&self, mode: PickMode) -> Result<(), EngineError> {
        *self.saved.lock().unwrap() = Some(mode);
        Ok(())
    }
}

struct DeniedStore;

impl ModeStore for DeniedStore {
    fn load(&self) -> Result<Option<PickMode>, EngineError> {
        Err(EngineError::StorageUnavailable(
            "host page denies persistent storage".to_string(),
        ))
    }

    fn save(&self, _: PickMode) -> Result<(), EngineError> {
        Err(EngineError::StorageUnavailable(
            "host page denies persistent storage".to_string(),
        ))
    }
}

fn some_capture() -> CaptureOutcome {
    let snapshot = page(vec![node(ElementState {
        text: "Save".to_string(),
        ..ElementState::new("button")
    })]);
    let id = snapshot.find(|el| el.tag_name == "button").unwrap();
    capture::capture(&snapshot, id)
}

#[test]
fn default_mode_is_pick() {
    let session = SessionContext::new(Box::new(NoopModeStore));
    assert_eq!(session.mode(), PickMode::Pick);
}

#[test]
fn denied_storage_degrades_silently_to_default() {
    let mut session = SessionContext::new(Box::new(DeniedStore));
    assert_eq!(session.mode(), PickMode::Pick);
    // Switching still works, it just does not persist.
    session.set_mode(PickMode::Browse);
    assert_eq!(session.mode(), PickMode::Browse);
}

#[test]
fn saved_mode_is_restored() {
    let store = Arc::new(RecordingStore {
        saved: Mutex::new(None),
    });

    struct Shared(Arc<RecordingStore>);
    impl ModeStore for Shared {
        fn load(&self) -> Result<Option<PickMode>, EngineError> {
            self.0.load()
        }
        fn save(&self, mode: PickMode) -> Result<(), EngineError> {
            self.0.save(mode)
        }
    }

    let mut session = SessionContext::new(Box::new(Shared(store.clone())));
    session.set_mode(PickMode::Browse);
    drop(session);

    let restored = SessionContext::new(Box::new(Shared(store)));
    assert_eq!(restored.mode(), PickMode::Browse);
}

#[test]
fn new_pick_discards_uncommitted_capture() {
    let mut session = SessionContext::new(Box::new(NoopModeStore));
    assert!(!session.has_pending());

    session.begin_pick(some_capture());
    assert!(session.has_pending());

    // A second pick replaces the first; there is exactly one slot.
    session.begin_pick(some_capture());
    assert!(session.has_pending());
    assert!(session.take_pending().is_some());
    assert!(session.take_pending().is_none());
}

#[test]
fn abandoning_clears_the_pending_slot() {
    let mut session = SessionContext::new(Box::new(NoopModeStore));
    session.begin_pick(some_capture());
    session.abandon_pick();
    assert!(!session.has_pending());
}

#[derive(Clone)]
struct CountingHost {
    mounted: Arc<AtomicBool>,
    mounts: Arc<AtomicUsize>,
}

impl CountingHost {
    fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(false)),
            mounts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl OverlayHost for CountingHost {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn mount(&mut self) -> Result<(), EngineError> {
        self.mounted.store(true, Ordering::SeqCst);
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn ensure_overlay_is_idempotent() {
    let mut host = CountingHost::new();
    assert!(ensure_overlay(&mut host).unwrap());
    assert!(!ensure_overlay(&mut host).unwrap());
    assert!(!ensure_overlay(&mut host).unwrap());
    assert_eq!(host.mounts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn supervisor_remounts_after_host_rerender() {
    let host = CountingHost::new();
    let mounted = host.mounted.clone();
    let mounts = host.mounts.clone();

    let handle = spawn_supervisor(host.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mounts.load(Ordering::SeqCst), 1);

    // The host page rebuilt its tree and dropped the overlay.
    mounted.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mounts.load(Ordering::SeqCst), 2);

    handle.close();
}
