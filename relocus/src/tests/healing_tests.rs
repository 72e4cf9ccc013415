//! Tests for the confidence classifier and healing coordinator

use super::{node, page};
use crate::element::ElementState;
use crate::errors::EngineError;
use crate::fingerprint::{Fingerprint, FingerprintPatch, NameConfidence, NameSource};
use crate::healing::{self, FingerprintStore, HealAttribute};
use crate::resolver::{ConfidenceBand, Resolver};
use async_trait::async_trait;
use std::sync::Mutex;

fn stored_fingerprint() -> Fingerprint {
    Fingerprint {
        role: "button".to_string(),
        name: "Save".to_string(),
        name_source: NameSource::Native,
        confidence: NameConfidence::High,
        region: None,
        intent_type: Default::default(),
        system_role: None,
        verification_required: false,
        test_id: Some("save-btn".to_string()),
        aria_label: None,
        placeholder: None,
        title: None,
        tag_name: "button".to_string(),
        anchors: Vec::new(),
        capabilities: Default::default(),
        last_healed_at: None,
        previous_confidence: None,
    }
}

/// Store that records every accepted patch.
#[derive(Default)]
struct MemoryStore {
    updates: Mutex<Vec<(String, FingerprintPatch)>>,
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    async fn update(
        &self,
        fingerprint_id: &str,
        patch: &FingerprintPatch,
    ) -> Result<(), EngineError> {
        self.updates
            .lock()
            .expect("store lock poisoned")
            .push((fingerprint_id.to_string(), patch.clone()));
        Ok(())
    }
}

/// Store that rejects every update.
struct RejectingStore;

#[async_trait]
impl FingerprintStore for RejectingStore {
    async fn update(&self, _: &str, _: &FingerprintPatch) -> Result<(), EngineError> {
        Err(EngineError::StoreRejected {
            message: "backend offline".to_string(),
            retryable: true,
        })
    }
}

#[test]
fn drifted_replay_proposes_only_differing_attributes() {
    let fp = stored_fingerprint();
    // The button was renamed but kept its test id off the page; partial name
    // plus tag scores 6.0, normalized to 0.6 (drifting).
    let snapshot = page(vec![node(ElementState {
        text: "Save changes".to_string(),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    assert_eq!(result.confidence_band, ConfidenceBand::Drifting);

    let proposal = healing::propose(&fp, &result).unwrap();
    let name_diff = proposal.diff_for(HealAttribute::Name).unwrap();
    assert_eq!(name_diff.current.as_deref(), Some("Save"));
    assert_eq!(name_diff.proposed.as_deref(), Some("Save changes"));
    // The live element has no test id; absence is drift, not a proposed
    // value, so test_id is not in the diff set.
    assert!(proposal.diff_for(HealAttribute::TestId).is_none());
    assert!(proposal.diff_for(HealAttribute::Role).is_none());
    assert!(proposal.diff_for(HealAttribute::TagName).is_none());
}

#[tokio::test]
async fn partial_application_touches_only_accepted_fields() {
    let mut fp = stored_fingerprint();
    let snapshot = page(vec![node(ElementState {
        text: "Save changes".to_string(),
        title: Some("Save your work".to_string()),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    let proposal = healing::propose(&fp, &result).unwrap();
    assert!(proposal.diff_for(HealAttribute::Title).is_some());

    let store = MemoryStore::default();
    healing::apply(&store, "fp-1", &mut fp, &proposal, &[HealAttribute::Name])
        .await
        .unwrap();

    // Accepted field updated, everything else untouched.
    assert_eq!(fp.name, "Save changes");
    assert_eq!(fp.test_id.as_deref(), Some("save-btn"));
    assert!(fp.title.is_none());
    assert!(fp.last_healed_at.is_some());
    assert_eq!(fp.previous_confidence, Some(result.confidence));

    let updates = store.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    let (id, patch) = &updates[0];
    assert_eq!(id, "fp-1");
    assert_eq!(patch.name.as_deref(), Some("Save changes"));
    assert!(patch.title.is_none());
}

#[tokio::test]
async fn rejected_update_leaves_fingerprint_unchanged() {
    let mut fp = stored_fingerprint();
    let snapshot = page(vec![node(ElementState {
        text: "Save changes".to_string(),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    let proposal = healing::propose(&fp, &result).unwrap();

    let before = fp.clone();
    let err = healing::apply(
        &RejectingStore,
        "fp-1",
        &mut fp,
        &proposal,
        &[HealAttribute::Name],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::StoreRejected {
            retryable: true,
            ..
        }
    ));
    assert_eq!(fp, before);
}

#[tokio::test]
async fn empty_acceptance_is_a_no_op() {
    let mut fp = stored_fingerprint();
    let snapshot = page(vec![node(ElementState {
        text: "Save changes".to_string(),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    let proposal = healing::propose(&fp, &result).unwrap();

    let store = MemoryStore::default();
    healing::apply(&store, "fp-1", &mut fp, &proposal, &[])
        .await
        .unwrap();
    assert!(store.updates.lock().unwrap().is_empty());
    assert!(fp.last_healed_at.is_none());
}

#[test]
fn healthy_replay_offers_no_healing() {
    let mut fp = stored_fingerprint();
    fp.test_id = None;
    let snapshot = page(vec![node(ElementState {
        text: "Save".to_string(),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    assert_eq!(result.confidence_band, ConfidenceBand::Healthy);
    assert!(healing::propose(&fp, &result).is_none());
}

#[test]
fn drift_without_attribute_differences_offers_nothing() {
    // Two identical buttons: the winner matches the fingerprint exactly but
    // the tie drags confidence into the drifting band. There is nothing to
    // heal.
    let mut fp = stored_fingerprint();
    fp.test_id = None;
    let identical = || {
        node(ElementState {
            text: "Save".to_string(),
            ..ElementState::new("button")
        })
    };
    let snapshot = page(vec![identical(), identical()]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    assert_eq!(result.confidence_band, ConfidenceBand::Drifting);
    assert!(healing::propose(&fp, &result).is_none());
}

#[test]
fn patch_generation_respects_acceptance_subset() {
    let fp = stored_fingerprint();
    let snapshot = page(vec![node(ElementState {
        text: "Save changes".to_string(),
        title: Some("Save your work".to_string()),
        ..ElementState::new("button")
    })]);
    let result = Resolver::default().resolve(&fp, &snapshot).unwrap();
    let proposal = healing::propose(&fp, &result).unwrap();

    let patch = proposal.to_patch(&[HealAttribute::Title]);
    assert!(patch.name.is_none());
    assert_eq!(patch.title.as_deref(), Some("Save your work"));
    assert!(patch.last_healed_at.is_some());

    let nothing = proposal.to_patch(&[]);
    assert!(nothing.is_empty());
    assert!(nothing.last_healed_at.is_none());
}
