use crate::capability::CapabilitySet;
use crate::region::{Anchor, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the accessible name stored in a fingerprint was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    Native,
    UserDeclared,
}

/// Authoring-time trust in the stored name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConfidence {
    High,
    Low,
    Declared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    #[default]
    Semantic,
    Structural,
}

impl IntentType {
    pub fn is_semantic(&self) -> bool {
        matches!(self, IntentType::Semantic)
    }
}

/// Fixed enumeration of system roles a user may declare for a semantically
/// void element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Cart,
    Menu,
    Search,
    Profile,
    Close,
    More,
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SystemRole::Cart => "cart",
            SystemRole::Menu => "menu",
            SystemRole::Search => "search",
            SystemRole::Profile => "profile",
            SystemRole::Close => "close",
            SystemRole::More => "more",
        };
        write!(f, "{s}")
    }
}

/// Durable, replay-time description of a target element.
///
/// A fingerprint is built exactly once per user pick and only ever changes
/// through an explicit, user-approved healing step. `name` is never empty
/// unless `intent_type` is structural, in which case `system_role` stands in
/// for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub role: String,
    #[serde(default)]
    pub name: String,
    pub name_source: NameSource,
    pub confidence: NameConfidence,
    /// Present when the name is weak and a landmark is needed for
    /// disambiguation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "IntentType::is_semantic", default)]
    pub intent_type: IntentType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system_role: Option<SystemRole>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub verification_required: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    pub tag_name: String,
    /// At most one nearest anchor in the current design.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub anchors: Vec<Anchor>,
    /// Captured for documentation and action validation, not for scoring.
    #[serde(default)]
    pub capabilities: CapabilitySet,
    /// Healing audit trail: unix seconds of the last applied proposal.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_healed_at: Option<u64>,
    /// Normalized confidence of the run that motivated the last healing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_confidence: Option<f64>,
}

impl Fingerprint {
    pub fn is_structural(&self) -> bool {
        self.intent_type == IntentType::Structural
    }

    /// Display name for logs and UI: the stored name, or the declared system
    /// role for structural fingerprints.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.system_role
            .map(|r| r.to_string())
            .unwrap_or_else(|| self.role.clone())
    }

    /// Whether this fingerprint is stable enough to capture text from.
    ///
    /// An element's saved text can only be re-verified later if the element
    /// itself can be re-identified; a fingerprint with no stable identity
    /// signal fails this check. Returns the user-facing reason when blocked.
    pub fn text_capture_blocked_reason(&self) -> Option<&'static str> {
        if !matches!(self.role.as_str(), "" | "generic" | "presentation" | "none") {
            return None;
        }
        if self.name_source == NameSource::UserDeclared
            || matches!(self.confidence, NameConfidence::High | NameConfidence::Declared)
        {
            return None;
        }
        if self.region.is_some() {
            return None;
        }
        Some(
            "This element's content changes and cannot be reliably re-identified. \
             Saving its text would be unstable.",
        )
    }
}

/// Partial update applied to a stored fingerprint by a user-approved healing
/// step. `None` fields are left untouched in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintPatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_healed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_confidence: Option<f64>,
}

impl FingerprintPatch {
    /// True when no attribute (audit fields aside) would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.test_id.is_none()
            && self.aria_label.is_none()
            && self.placeholder.is_none()
            && self.title.is_none()
            && self.tag_name.is_none()
    }

    /// Mutate exactly the fields this patch names and nothing else.
    pub fn apply_to(&self, fingerprint: &mut Fingerprint) {
        if let Some(name) = &self.name {
            fingerprint.name = name.clone();
        }
        if let Some(role) = &self.role {
            fingerprint.role = role.clone();
        }
        if let Some(test_id) = &self.test_id {
            fingerprint.test_id = Some(test_id.clone());
        }
        if let Some(aria_label) = &self.aria_label {
            fingerprint.aria_label = Some(aria_label.clone());
        }
        if let Some(placeholder) = &self.placeholder {
            fingerprint.placeholder = Some(placeholder.clone());
        }
        if let Some(title) = &self.title {
            fingerprint.title = Some(title.clone());
        }
        if let Some(tag_name) = &self.tag_name {
            fingerprint.tag_name = tag_name.clone();
        }
        if let Some(at) = self.last_healed_at {
            fingerprint.last_healed_at = Some(at);
        }
        if let Some(previous) = self.previous_confidence {
            fingerprint.previous_confidence = Some(previous);
        }
    }
}
