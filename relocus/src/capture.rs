use crate::capability::CapabilitySet;
use crate::element::{ElementState, NodeId, PageSnapshot};
use crate::errors::EngineError;
use crate::fingerprint::{
    Fingerprint, IntentType, NameConfidence, NameSource, SystemRole,
};
use crate::region::{self, Anchor, Region};
use tracing::{debug, instrument};

/// Names that carry no semantic identity: raw tag echoes and icon
/// boilerplate that authoring tools leak into text content.
const GENERIC_TOKENS: &[&str] = &["a", "svg", "icon", "img", "div", "span", "button", "link"];

/// Single characters that are accepted as real names (close, add, help,
/// info glyphs).
const MEANINGFUL_SINGLE_CHARS: &[char] = &['x', '+', '?', 'i'];

fn is_meaningless(name: &str) -> bool {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return true;
    }
    if GENERIC_TOKENS.contains(&normalized.as_str()) {
        return true;
    }
    let mut chars = normalized.chars();
    match (chars.next(), chars.next()) {
        (Some(only), None) => !MEANINGFUL_SINGLE_CHARS.contains(&only),
        _ => false,
    }
}

/// True when the element exposes no identity signal at all. File inputs are
/// exempt: they always have the built-in "File Input" name.
fn is_semantic_void(el: &ElementState) -> bool {
    if el.is_file_input() {
        return false;
    }
    let sources = [
        el.aria_label.as_deref(),
        el.placeholder.as_deref(),
        el.title.as_deref(),
        el.rendered_text(),
        el.value.as_deref(),
        el.label_text.as_deref(),
    ];
    sources
        .into_iter()
        .flatten()
        .all(|s| s.trim().is_empty())
}

/// Fields shared by all three authoring paths.
#[derive(Debug, Clone)]
struct CapturedBase {
    role: String,
    tag_name: String,
    test_id: Option<String>,
    aria_label: Option<String>,
    placeholder: Option<String>,
    title: Option<String>,
    anchors: Vec<Anchor>,
    capabilities: CapabilitySet,
}

impl CapturedBase {
    fn from_element(page: &PageSnapshot, id: NodeId) -> Self {
        let el = page.get(id);
        Self {
            role: el.inferred_role(),
            tag_name: el.tag_name.clone(),
            test_id: el.test_id.clone(),
            aria_label: el.aria_label.clone(),
            placeholder: el.placeholder.clone(),
            title: el.title.clone(),
            anchors: region::nearest_anchor(page, id).into_iter().collect(),
            capabilities: CapabilitySet::classify(el),
        }
    }

    fn into_fingerprint(
        self,
        name: String,
        name_source: NameSource,
        confidence: NameConfidence,
        region: Option<Region>,
    ) -> Fingerprint {
        Fingerprint {
            role: self.role,
            name,
            name_source,
            confidence,
            region,
            intent_type: IntentType::Semantic,
            system_role: None,
            verification_required: false,
            test_id: self.test_id,
            aria_label: self.aria_label,
            placeholder: self.placeholder,
            title: self.title,
            tag_name: self.tag_name,
            anchors: self.anchors,
            capabilities: self.capabilities,
            last_healed_at: None,
            previous_confidence: None,
        }
    }
}

/// A capture waiting on the user to declare a name. Produced when the
/// extracted name was empty or generic; the authoring UI shows the detected
/// region for confirmation or override.
#[derive(Debug, Clone)]
pub struct PendingDeclaration {
    base: CapturedBase,
    suggested_region: Region,
}

impl PendingDeclaration {
    /// Region pre-filled in the declaration dialog.
    pub fn suggested_region(&self) -> Region {
        self.suggested_region
    }

    pub fn role(&self) -> &str {
        &self.base.role
    }

    /// Finish the capture with the user-typed name and confirmed region.
    /// An empty name means the dialog was abandoned mid-way.
    pub fn declare(self, name: &str, region: Region) -> Result<Fingerprint, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::CaptureIncomplete(
                "a declared name is required to finish this capture".to_string(),
            ));
        }
        Ok(self.base.into_fingerprint(
            name.to_string(),
            NameSource::UserDeclared,
            NameConfidence::Low,
            Some(region),
        ))
    }
}

/// A capture of a semantically void element, waiting on the user to pick a
/// structural system role. Resolution for these fingerprints is multi-signal
/// and always verification-gated.
#[derive(Debug, Clone)]
pub struct PendingStructural {
    base: CapturedBase,
    region: Region,
}

impl PendingStructural {
    /// Region observed at capture time; stored on the fingerprint as-is.
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn declare(self, system_role: SystemRole) -> Fingerprint {
        let region = self.region;
        let mut fingerprint = self.base.into_fingerprint(
            String::new(),
            NameSource::UserDeclared,
            NameConfidence::Declared,
            Some(region),
        );
        fingerprint.intent_type = IntentType::Structural;
        fingerprint.system_role = Some(system_role);
        fingerprint.verification_required = true;
        fingerprint
    }
}

/// Which authoring path a user pick was routed to.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The element carried a trustworthy native name; the fingerprint is
    /// complete as-is.
    AutoResolved(Fingerprint),
    /// The name was empty or generic; the user must declare one.
    NeedsDeclaration(PendingDeclaration),
    /// No identity signal at all; the user must pick a structural role.
    SemanticVoid(PendingStructural),
}

/// Build a fingerprint from a user-selected element and classify it into one
/// of the three authoring paths. Triggered once per pick.
#[instrument(skip(page))]
pub fn capture(page: &PageSnapshot, id: NodeId) -> CaptureOutcome {
    let el = page.get(id);
    let base = CapturedBase::from_element(page, id);
    let detected = region::classify(page, id);

    if is_semantic_void(el) {
        debug!(tag = %el.tag_name, "capture routed to structural declaration");
        return CaptureOutcome::SemanticVoid(PendingStructural {
            base,
            // Capture-time default region.
            region: detected.unwrap_or(Region::Body),
        });
    }

    let name = el.accessible_name().unwrap_or_default();
    if is_meaningless(&name) {
        debug!(name = %name, "extracted name is generic, declaration required");
        return CaptureOutcome::NeedsDeclaration(PendingDeclaration {
            base,
            // Declaration-dialog default region, intentionally different
            // from the capture-time default above.
            suggested_region: detected.unwrap_or(Region::Main),
        });
    }

    debug!(name = %name, role = %base.role, "capture auto-resolved");
    CaptureOutcome::AutoResolved(base.into_fingerprint(
        name,
        NameSource::Native,
        NameConfidence::High,
        None,
    ))
}
