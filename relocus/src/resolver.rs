use crate::element::{ElementState, NodeId, PageSnapshot};
use crate::errors::EngineError;
use crate::fingerprint::{Fingerprint, NameSource, SystemRole};
use crate::region::{self, Region};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Weights for the multi-attribute scorer. The documented defaults are a
/// starting policy, not an immutable constant; callers may tune them.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub test_id: f64,
    pub exact_name: f64,
    pub aria_label: f64,
    pub role_partial_name: f64,
    pub tag_name: f64,
    /// Supplementary signals: refine ranking among candidates that already
    /// matched a primary signal.
    pub placeholder: f64,
    pub title: f64,
    pub word_overlap: f64,
    pub region: f64,
    pub anchor: f64,
    /// A top score strictly below this is an ambiguous, not a confident,
    /// match.
    pub ambiguity_threshold: f64,
    /// Score at which normalized confidence saturates at 1.0.
    pub full_confidence_score: f64,
    /// Ranked candidates kept for "did you mean" suggestions.
    pub max_candidates: usize,
    pub structural: StructuralWeights,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            test_id: 15.0,
            exact_name: 10.0,
            aria_label: 8.0,
            role_partial_name: 5.0,
            tag_name: 1.0,
            placeholder: 3.0,
            title: 3.0,
            word_overlap: 1.0,
            region: 0.5,
            anchor: 0.5,
            ambiguity_threshold: 5.0,
            full_confidence_score: 10.0,
            max_candidates: 5,
            structural: StructuralWeights::default(),
        }
    }
}

/// Weights for the structural (semantic-void) scorer. Each signal is weak on
/// its own; acceptance requires several to agree.
#[derive(Debug, Clone)]
pub struct StructuralWeights {
    pub markup_pattern: f64,
    pub class_pattern: f64,
    pub attribute_pattern: f64,
    pub position: f64,
    pub href: f64,
    pub nearby_text: f64,
    /// Strict acceptance threshold for structural matches.
    pub threshold: f64,
    /// Score at which structural confidence saturates at 1.0.
    pub full_confidence_score: f64,
}

impl Default for StructuralWeights {
    fn default() -> Self {
        Self {
            markup_pattern: 15.0,
            class_pattern: 10.0,
            attribute_pattern: 8.0,
            position: 12.0,
            href: 10.0,
            nearby_text: 5.0,
            threshold: 25.0,
            full_confidence_score: 40.0,
        }
    }
}

/// One scoring signal, keyed in every candidate's breakdown for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    TestId,
    ExactName,
    AriaLabel,
    RolePartialName,
    TagName,
    Placeholder,
    Title,
    WordOverlap,
    Region,
    Anchor,
    IconPattern,
    Position,
    Href,
    NearbyText,
}

/// Live attribute values of a scored element, kept so a healing proposal can
/// diff them against the stored fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A live element scored against a fingerprint during one resolution
/// attempt. Ephemeral: produced fresh every attempt, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub node: NodeId,
    pub tag_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub score: f64,
    pub breakdown: BTreeMap<Signal, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    pub attributes: LiveAttributes,
}

impl Candidate {
    fn from_element(page: &PageSnapshot, id: NodeId) -> Self {
        let el = page.get(id);
        Self {
            node: id,
            tag_name: el.tag_name.clone(),
            role: el.inferred_role(),
            name: el.accessible_name().unwrap_or_default(),
            score: 0.0,
            breakdown: BTreeMap::new(),
            region: region::classify(page, id).or(Some(Region::Body)),
            attributes: LiveAttributes {
                test_id: el.test_id.clone(),
                aria_label: el.aria_label.clone(),
                placeholder: el.placeholder.clone(),
                title: el.title.clone(),
            },
        }
    }

    fn add(&mut self, signal: Signal, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        *self.breakdown.entry(signal).or_insert(0.0) += weight;
        self.score += weight;
    }
}

/// Health classification of a successful replay's match quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Healthy,
    Drifting,
    AtRisk,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceBand::Healthy
        } else if confidence >= 0.6 {
            ConfidenceBand::Drifting
        } else {
            ConfidenceBand::AtRisk
        }
    }

    /// Healing is only surfaced when the match has drifted.
    pub fn offers_healing(&self) -> bool {
        !matches!(self, ConfidenceBand::Healthy)
    }
}

/// Outcome of one resolution attempt: the ranked candidate list, the
/// confident winner if any, and the normalized match quality.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    /// Descending by score, capped, zero-score elements dropped entirely.
    pub candidates: Vec<Candidate>,
    /// `None` when the top score fell below the ambiguity threshold, even if
    /// candidates exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Candidate>,
    /// Normalized 0.0–1.0 score derived from the top candidate's score and
    /// its rank gap to the runner-up.
    pub confidence: f64,
    pub confidence_band: ConfidenceBand,
}

impl ResolutionResult {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            winner: None,
            confidence: 0.0,
            confidence_band: ConfidenceBand::AtRisk,
        }
    }

    /// Top-ranked candidate, whether or not it cleared the threshold.
    /// Powers "did you mean" suggestions on ambiguous failures.
    pub fn suggestion(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

fn normalized_confidence(top: f64, runner_up: Option<f64>, full_score: f64) -> f64 {
    if top <= 0.0 || full_score <= 0.0 {
        return 0.0;
    }
    let base = (top / full_score).min(1.0);
    let gap_ratio = match runner_up {
        Some(second) => ((top - second) / top).clamp(0.0, 1.0),
        None => 1.0,
    };
    base * (0.75 + 0.25 * gap_ratio)
}

/// Icon keyword patterns consulted by the structural scorer.
fn icon_patterns(role: SystemRole) -> &'static [&'static str] {
    match role {
        SystemRole::Cart => &["cart", "shopping", "basket", "bag"],
        SystemRole::Menu => &["menu", "hamburger", "bars", "nav"],
        SystemRole::Search => &["search", "magnify", "find", "glass"],
        SystemRole::Profile => &["user", "account", "person", "profile", "avatar"],
        SystemRole::Close => &["close", "x", "times", "dismiss", "cancel"],
        SystemRole::More => &["more", "ellipsis", "dots", "options", "overflow"],
    }
}

fn words_of(name: &str) -> BTreeSet<String> {
    name.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Resolves stored fingerprints against a live page snapshot.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    weights: ScoreWeights,
}

impl Resolver {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Rank every interactive element on the page against the fingerprint.
    ///
    /// `winner` is set only when the top score clears the ambiguity
    /// threshold; the ranked list is available either way. Deterministic:
    /// the same fingerprint against an unchanged page always yields the same
    /// ordering and scores.
    #[instrument(skip(self, fingerprint, page), fields(target = %fingerprint.display_name()))]
    pub fn rank(&self, fingerprint: &Fingerprint, page: &PageSnapshot) -> ResolutionResult {
        if fingerprint.is_structural() {
            return self.rank_structural(fingerprint, page);
        }
        if fingerprint.name_source == NameSource::UserDeclared {
            if let Some(region) = fingerprint.region {
                return self.rank_in_region(fingerprint, region, page);
            }
        }
        self.rank_semantic(fingerprint, page)
    }

    /// Rank and apply the error taxonomy: an empty list is a terminal
    /// not-found, a below-threshold top score is ambiguous and carries the
    /// top candidate as a suggestion.
    pub fn resolve(
        &self,
        fingerprint: &Fingerprint,
        page: &PageSnapshot,
    ) -> Result<ResolutionResult, EngineError> {
        let result = self.rank(fingerprint, page);
        if result.winner.is_some() {
            return Ok(result);
        }
        match result.candidates.first() {
            None => Err(EngineError::ElementNotFound(format!(
                "no live element matches '{}'",
                fingerprint.display_name()
            ))),
            Some(top) => Err(EngineError::AmbiguousMatch {
                message: format!(
                    "best match for '{}' scored {:.1}, below the confidence threshold",
                    fingerprint.display_name(),
                    top.score
                ),
                suggestion: Box::new(top.clone()),
            }),
        }
    }

    fn finish(&self, mut candidates: Vec<Candidate>, fingerprint: &Fingerprint) -> ResolutionResult {
        let w = &self.weights;
        candidates.retain(|c| c.score > 0.0);
        // Ties prefer the candidate in the fingerprint's stored region, then
        // document order.
        let stored_region = fingerprint.region;
        candidates.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| {
                let a_region = stored_region.is_some() && a.region == stored_region;
                let b_region = stored_region.is_some() && b.region == stored_region;
                b_region.cmp(&a_region).then(a.node.cmp(&b.node))
            })
        });
        candidates.truncate(w.max_candidates);

        let top_score = candidates.first().map(|c| c.score).unwrap_or(0.0);
        let runner_up = candidates.get(1).map(|c| c.score);
        let confidence = normalized_confidence(top_score, runner_up, w.full_confidence_score);
        let winner = candidates
            .first()
            .filter(|c| c.score >= w.ambiguity_threshold)
            .cloned();

        debug!(
            candidates = candidates.len(),
            top_score,
            confidence,
            winner = winner.is_some(),
            "ranking complete"
        );
        ResolutionResult {
            candidates,
            winner,
            confidence,
            confidence_band: ConfidenceBand::from_confidence(confidence),
        }
    }

    fn rank_semantic(&self, fingerprint: &Fingerprint, page: &PageSnapshot) -> ResolutionResult {
        let w = &self.weights;
        let stored_name = fingerprint.name.trim();
        let stored_name_lower = stored_name.to_lowercase();
        let stored_words = words_of(stored_name);

        let mut candidates = Vec::new();
        for id in page.interactive_elements() {
            let el = page.get(id);
            let mut candidate = Candidate::from_element(page, id);

            // Primary signals.
            if let (Some(stored), Some(live)) = (&fingerprint.test_id, &el.test_id) {
                if stored == live {
                    candidate.add(Signal::TestId, w.test_id);
                }
            }

            let live_name = candidate.name.trim().to_string();
            let live_name_lower = live_name.to_lowercase();
            let role_matches = fingerprint.role == candidate.role;
            let names_present = !stored_name.is_empty() && !live_name.is_empty();
            let contains = names_present
                && (live_name_lower.contains(&stored_name_lower)
                    || stored_name_lower.contains(&live_name_lower));
            if names_present {
                if live_name_lower == stored_name_lower {
                    candidate.add(Signal::ExactName, w.exact_name);
                }
                if role_matches && contains {
                    candidate.add(Signal::RolePartialName, w.role_partial_name);
                }
            }

            if let (Some(stored), Some(live)) = (&fingerprint.aria_label, &el.aria_label) {
                if stored == live {
                    candidate.add(Signal::AriaLabel, w.aria_label);
                }
            }

            if fingerprint.tag_name == el.tag_name {
                candidate.add(Signal::TagName, w.tag_name);
            }

            // Supplementary signals never keep an otherwise signal-less
            // element alive.
            if candidate.score > 0.0 {
                if names_present && !contains {
                    let overlap = words_of(&live_name)
                        .intersection(&stored_words)
                        .count() as f64;
                    candidate.add(
                        Signal::WordOverlap,
                        (overlap * w.word_overlap).min(w.role_partial_name),
                    );
                }
                if let (Some(stored), Some(live)) = (&fingerprint.placeholder, &el.placeholder) {
                    if stored == live {
                        candidate.add(Signal::Placeholder, w.placeholder);
                    }
                }
                if let (Some(stored), Some(live)) = (&fingerprint.title, &el.title) {
                    if stored == live {
                        candidate.add(Signal::Title, w.title);
                    }
                }
                if fingerprint.region.is_some() && candidate.region == fingerprint.region {
                    candidate.add(Signal::Region, w.region);
                }
                if let Some(stored_anchor) = fingerprint.anchors.first() {
                    if let Some(live_anchor) = region::nearest_anchor(page, id) {
                        if live_anchor.role == stored_anchor.role
                            && live_anchor.name.to_lowercase()
                                == stored_anchor.name.to_lowercase()
                        {
                            candidate.add(Signal::Anchor, w.anchor);
                        }
                    }
                }
            }

            candidates.push(candidate);
        }
        self.finish(candidates, fingerprint)
    }

    /// Resolution for user-declared fingerprints: search by role within the
    /// stored region subtree, falling back to the whole page when the
    /// landmark is gone. Exactly one match is a full-confidence winner; any
    /// other count leaves `winner` unset.
    fn rank_in_region(
        &self,
        fingerprint: &Fingerprint,
        target_region: Region,
        page: &PageSnapshot,
    ) -> ResolutionResult {
        let w = &self.weights;
        let scope: Vec<NodeId> = match region::find_root(page, target_region) {
            Some(root) => {
                let mut ids = vec![root];
                ids.extend(page.descendants(root));
                ids
            }
            None => {
                debug!(region = %target_region, "region landmark missing, searching whole page");
                page.ids().collect()
            }
        };

        let interactive: BTreeSet<NodeId> = page.interactive_elements().into_iter().collect();
        let mut candidates = Vec::new();
        for id in scope {
            if !interactive.contains(&id) {
                continue;
            }
            if page.get(id).inferred_role() != fingerprint.role {
                continue;
            }
            let mut candidate = Candidate::from_element(page, id);
            candidate.add(Signal::RolePartialName, w.role_partial_name);
            candidate.add(Signal::Region, w.region);
            candidates.push(candidate);
        }

        let unique = candidates.len() == 1;
        let mut result = self.finish(candidates, fingerprint);
        if unique {
            // A lone role match inside the declared region is exactly what
            // the user described.
            result.confidence = 1.0;
            result.confidence_band = ConfidenceBand::Healthy;
        } else {
            result.winner = None;
            result.confidence_band = ConfidenceBand::AtRisk;
        }
        result
    }

    /// Multi-signal scorer for semantically void elements: icon keyword
    /// patterns, position clustering, href hints and nearby text, gated by a
    /// strict acceptance threshold.
    fn rank_structural(&self, fingerprint: &Fingerprint, page: &PageSnapshot) -> ResolutionResult {
        let sw = &self.weights.structural;
        let Some(system_role) = fingerprint.system_role else {
            debug!("structural fingerprint without system role, nothing to match");
            return ResolutionResult::empty();
        };
        let patterns = icon_patterns(system_role);

        let scope: Vec<NodeId> = match fingerprint.region.and_then(|r| region::find_root(page, r)) {
            Some(root) => {
                let mut ids = vec![root];
                ids.extend(page.descendants(root));
                ids
            }
            None => page.ids().collect(),
        };
        let interactive: BTreeSet<NodeId> = page.interactive_elements().into_iter().collect();

        let mut candidates = Vec::new();
        for id in scope {
            if !interactive.contains(&id) {
                continue;
            }
            let el = page.get(id);
            let mut candidate = Candidate::from_element(page, id);

            // Keyword patterns across subtree markup, the class list, and
            // the element's serialized attribute text.
            let markup = subtree_markup_text(page, id);
            let class_name = el.class_name.as_deref().unwrap_or("").to_lowercase();
            let attr_text = attribute_text(el);
            for pattern in patterns {
                if markup.contains(pattern) {
                    candidate.add(Signal::IconPattern, sw.markup_pattern);
                }
                if class_name.contains(pattern) {
                    candidate.add(Signal::IconPattern, sw.class_pattern);
                }
                if attr_text.contains(pattern) {
                    candidate.add(Signal::IconPattern, sw.attribute_pattern);
                }
            }

            // Position clustering: cart/profile live top-right, menu
            // top-left.
            if let Some((x, y, width, _)) = el.bounds {
                let viewport = page.viewport_width();
                let top_right = x + width > viewport * 0.7 && y < 100.0;
                let top_left = x < viewport * 0.3 && y < 100.0;
                let expects_top_right =
                    matches!(system_role, SystemRole::Cart | SystemRole::Profile);
                let expects_top_left = matches!(system_role, SystemRole::Menu);
                if (expects_top_right && top_right) || (expects_top_left && top_left) {
                    candidate.add(Signal::Position, sw.position);
                }
            }

            // Navigation hints.
            if let Some(href) = el.href.as_deref() {
                let href = href.to_lowercase();
                let hit = match system_role {
                    SystemRole::Cart => href.contains("cart") || href.contains("checkout"),
                    SystemRole::Profile => href.contains("profile") || href.contains("account"),
                    SystemRole::Search => href.contains("search") || href.contains("find"),
                    _ => false,
                };
                if hit {
                    candidate.add(Signal::Href, sw.href);
                }
            }

            // Nearby text.
            if let Some(parent) = page.parent(id) {
                let parent_text = page.get(parent).text.to_lowercase();
                for pattern in patterns {
                    if parent_text.contains(pattern) {
                        candidate.add(Signal::NearbyText, sw.nearby_text);
                    }
                }
            }

            candidates.push(candidate);
        }

        candidates.retain(|c| c.score > 0.0);
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.node.cmp(&b.node)));
        candidates.truncate(self.weights.max_candidates);

        let top_score = candidates.first().map(|c| c.score).unwrap_or(0.0);
        let runner_up = candidates.get(1).map(|c| c.score);
        let confidence = normalized_confidence(top_score, runner_up, sw.full_confidence_score);
        let winner = candidates
            .first()
            .filter(|c| c.score >= sw.threshold)
            .cloned();
        debug!(
            system_role = %system_role,
            candidates = candidates.len(),
            top_score,
            winner = winner.is_some(),
            "structural ranking complete"
        );
        ResolutionResult {
            candidates,
            winner,
            confidence,
            confidence_band: ConfidenceBand::from_confidence(confidence),
        }
    }
}

/// Lowercased tag names, class lists and ids of an element's subtree,
/// standing in for its inner markup.
fn subtree_markup_text(page: &PageSnapshot, id: NodeId) -> String {
    let mut parts = Vec::new();
    for descendant in page.descendants(id) {
        let el = page.get(descendant);
        parts.push(el.tag_name.clone());
        if let Some(class_name) = &el.class_name {
            parts.push(class_name.to_lowercase());
        }
        if let Some(el_id) = &el.id {
            parts.push(el_id.to_lowercase());
        }
        let text = el.text.trim();
        if !text.is_empty() {
            parts.push(text.to_lowercase());
        }
    }
    parts.join(" ")
}

fn attribute_text(el: &ElementState) -> String {
    [
        el.id.as_deref(),
        el.test_id.as_deref(),
        el.class_name.as_deref(),
        el.aria_label.as_deref(),
        el.title.as_deref(),
        el.href.as_deref(),
        el.value.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}
