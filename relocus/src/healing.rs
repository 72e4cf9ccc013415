use crate::errors::EngineError;
use crate::fingerprint::{Fingerprint, FingerprintPatch};
use crate::resolver::{Candidate, ResolutionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument};

/// Attributes a healing proposal may update. The stored fingerprint never
/// changes outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealAttribute {
    Name,
    Role,
    TestId,
    AriaLabel,
    Placeholder,
    Title,
    TagName,
}

impl HealAttribute {
    pub const ALL: [HealAttribute; 7] = [
        HealAttribute::Name,
        HealAttribute::Role,
        HealAttribute::TestId,
        HealAttribute::AriaLabel,
        HealAttribute::Placeholder,
        HealAttribute::Title,
        HealAttribute::TagName,
    ];
}

/// One attribute that differs between the stored fingerprint and the live
/// winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDiff {
    pub attribute: HealAttribute,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<String>,
}

/// A per-attribute diff offered to the user when a successful replay
/// drifted. The user selects a subset to apply; nothing is ever applied
/// automatically. Dropped unconfirmed, it leaves no trace anywhere.
#[derive(Debug, Clone, Serialize)]
pub struct HealingProposal {
    pub diffs: Vec<AttributeDiff>,
    /// Normalized confidence of the run that produced this proposal,
    /// recorded on the fingerprint as an audit trail when applied.
    pub run_confidence: f64,
}

fn diff(
    attribute: HealAttribute,
    current: Option<&str>,
    proposed: Option<&str>,
) -> Option<AttributeDiff> {
    // Only live values that exist can heal a stored one; absence on the
    // live side is drift, not data.
    let proposed = proposed.map(str::trim).filter(|p| !p.is_empty())?;
    if current == Some(proposed) {
        return None;
    }
    Some(AttributeDiff {
        attribute,
        current: current.map(str::to_string),
        proposed: Some(proposed.to_string()),
    })
}

impl HealingProposal {
    /// Compare the fixed healable attribute set between the stored
    /// fingerprint and the winning candidate. Returns `None` when nothing
    /// differs.
    pub fn between(
        fingerprint: &Fingerprint,
        winner: &Candidate,
        run_confidence: f64,
    ) -> Option<Self> {
        let stored_name = (!fingerprint.name.is_empty()).then_some(fingerprint.name.as_str());
        let live_name = (!winner.name.is_empty()).then_some(winner.name.as_str());
        let diffs: Vec<AttributeDiff> = [
            diff(HealAttribute::Name, stored_name, live_name),
            diff(
                HealAttribute::Role,
                Some(fingerprint.role.as_str()),
                Some(winner.role.as_str()),
            ),
            diff(
                HealAttribute::TestId,
                fingerprint.test_id.as_deref(),
                winner.attributes.test_id.as_deref(),
            ),
            diff(
                HealAttribute::AriaLabel,
                fingerprint.aria_label.as_deref(),
                winner.attributes.aria_label.as_deref(),
            ),
            diff(
                HealAttribute::Placeholder,
                fingerprint.placeholder.as_deref(),
                winner.attributes.placeholder.as_deref(),
            ),
            diff(
                HealAttribute::Title,
                fingerprint.title.as_deref(),
                winner.attributes.title.as_deref(),
            ),
            diff(
                HealAttribute::TagName,
                Some(fingerprint.tag_name.as_str()),
                Some(winner.tag_name.as_str()),
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        if diffs.is_empty() {
            return None;
        }
        Some(Self {
            diffs,
            run_confidence,
        })
    }

    pub fn diff_for(&self, attribute: HealAttribute) -> Option<&AttributeDiff> {
        self.diffs.iter().find(|d| d.attribute == attribute)
    }

    /// Build the partial update for the user-accepted subset. Attributes the
    /// user rejected are absent from the patch and untouched in storage.
    pub fn to_patch(&self, accepted: &[HealAttribute]) -> FingerprintPatch {
        let mut patch = FingerprintPatch::default();
        for diff in &self.diffs {
            if !accepted.contains(&diff.attribute) {
                continue;
            }
            let value = diff.proposed.clone();
            match diff.attribute {
                HealAttribute::Name => patch.name = value,
                HealAttribute::Role => patch.role = value,
                HealAttribute::TestId => patch.test_id = value,
                HealAttribute::AriaLabel => patch.aria_label = value,
                HealAttribute::Placeholder => patch.placeholder = value,
                HealAttribute::Title => patch.title = value,
                HealAttribute::TagName => patch.tag_name = value,
            }
        }
        if !patch.is_empty() {
            patch.last_healed_at = Some(unix_now());
            patch.previous_confidence = Some(self.run_confidence);
        }
        patch
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decide whether a successful replay should surface a healing proposal:
/// only when a winner exists, the band is not healthy, and at least one
/// attribute actually differs.
pub fn propose(fingerprint: &Fingerprint, result: &ResolutionResult) -> Option<HealingProposal> {
    if !result.confidence_band.offers_healing() {
        return None;
    }
    let winner = result.winner.as_ref()?;
    let proposal = HealingProposal::between(fingerprint, winner, result.confidence)?;
    debug!(
        diffs = proposal.diffs.len(),
        confidence = result.confidence,
        "healing proposal generated"
    );
    Some(proposal)
}

/// External fingerprint store. Persistence and sync live outside this
/// engine; the store only receives partial updates naming accepted
/// attribute keys.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn update(
        &self,
        fingerprint_id: &str,
        patch: &FingerprintPatch,
    ) -> Result<(), EngineError>;
}

/// Apply the user-accepted subset of a proposal: one update against the
/// external store, then the same patch on the in-memory fingerprint. Nothing
/// local is mutated until the store accepts, so a rejected update leaves the
/// fingerprint exactly as it was and the caller may retry.
#[instrument(skip(store, fingerprint, proposal, accepted))]
pub async fn apply(
    store: &dyn FingerprintStore,
    fingerprint_id: &str,
    fingerprint: &mut Fingerprint,
    proposal: &HealingProposal,
    accepted: &[HealAttribute],
) -> Result<(), EngineError> {
    let patch = proposal.to_patch(accepted);
    if patch.is_empty() {
        debug!("no accepted attributes, healing is a no-op");
        return Ok(());
    }
    store.update(fingerprint_id, &patch).await?;
    patch.apply_to(fingerprint);
    info!(
        attributes = accepted.len(),
        "fingerprint healed"
    );
    Ok(())
}
