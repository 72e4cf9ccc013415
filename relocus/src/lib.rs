//! Semantic element fingerprinting and self-healing resolution
//!
//! This crate turns a one-time user pick of an on-screen element into a
//! durable [`Fingerprint`] and later re-finds the best live match for it
//! against a page whose markup may have drifted, inspired by Playwright's
//! locator model.
//!
//! The flow is: capture (authoring) → stored fingerprint → [`Resolver`]
//! (replay) → [`ResolutionResult`] → confidence band → optional
//! user-approved [`HealingProposal`] back to the store. The engine owns no
//! transport or persistence; drivers supply a [`PageSnapshot`] per attempt
//! and an external [`FingerprintStore`] receives healing updates.

use tracing::instrument;

pub mod capability;
pub mod capture;
pub mod element;
pub mod errors;
pub mod fingerprint;
pub mod healing;
pub mod region;
pub mod resolver;
pub mod session;
#[cfg(test)]
mod tests;

pub use capability::CapabilitySet;
pub use capture::{CaptureOutcome, PendingDeclaration, PendingStructural};
pub use element::{DomNode, ElementState, NodeId, PageSnapshot};
pub use errors::EngineError;
pub use fingerprint::{
    Fingerprint, FingerprintPatch, IntentType, NameConfidence, NameSource, SystemRole,
};
pub use healing::{AttributeDiff, FingerprintStore, HealAttribute, HealingProposal};
pub use region::{Anchor, AnchorRole, Region};
pub use resolver::{
    Candidate, ConfidenceBand, ResolutionResult, Resolver, ScoreWeights, Signal,
    StructuralWeights,
};
pub use session::{ModeStore, NoopModeStore, OverlayHost, PickMode, SessionContext};

/// The main entry point: one configured engine serving capture, resolution
/// and healing for a session.
#[derive(Debug, Default, Clone)]
pub struct Engine {
    resolver: Resolver,
}

impl Engine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            resolver: Resolver::new(weights),
        }
    }

    /// Engine with the documented default weights.
    pub fn new_default() -> Self {
        Self::default()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Build a fingerprint from a user-selected element and route it to the
    /// matching authoring path.
    #[instrument(skip(self, page))]
    pub fn capture(&self, page: &PageSnapshot, target: NodeId) -> CaptureOutcome {
        capture::capture(page, target)
    }

    /// Rank the live page against a fingerprint without applying the error
    /// taxonomy; the full candidate list is always returned.
    pub fn rank(&self, fingerprint: &Fingerprint, page: &PageSnapshot) -> ResolutionResult {
        self.resolver.rank(fingerprint, page)
    }

    /// Resolve a fingerprint, failing with `ElementNotFound` or
    /// `AmbiguousMatch` when no confident winner exists.
    #[instrument(skip(self, fingerprint, page))]
    pub fn resolve(
        &self,
        fingerprint: &Fingerprint,
        page: &PageSnapshot,
    ) -> Result<ResolutionResult, EngineError> {
        self.resolver.resolve(fingerprint, page)
    }

    /// Offer a healing proposal for a drifted-but-successful replay, if any
    /// attribute actually differs.
    pub fn propose_healing(
        &self,
        fingerprint: &Fingerprint,
        result: &ResolutionResult,
    ) -> Option<HealingProposal> {
        healing::propose(fingerprint, result)
    }

    /// Apply the accepted subset of a proposal through the external store.
    pub async fn apply_healing(
        &self,
        store: &dyn FingerprintStore,
        fingerprint_id: &str,
        fingerprint: &mut Fingerprint,
        proposal: &HealingProposal,
        accepted: &[HealAttribute],
    ) -> Result<(), EngineError> {
        healing::apply(store, fingerprint_id, fingerprint, proposal, accepted).await
    }
}
