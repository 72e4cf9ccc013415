use crate::element::{ElementState, NodeId, PageSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anchor text is kept deliberately short; headings can run long.
const MAX_ANCHOR_TEXT: usize = 50;

/// Coarse page landmark classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Header,
    Navigation,
    Main,
    Footer,
    Toolbar,
    Body,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::Header => "header",
            Region::Navigation => "navigation",
            Region::Main => "main",
            Region::Footer => "footer",
            Region::Toolbar => "toolbar",
            Region::Body => "body",
        };
        write!(f, "{s}")
    }
}

fn landmark_of(el: &ElementState) -> Option<Region> {
    let role = el
        .role
        .as_deref()
        .map(|r| r.trim().to_lowercase())
        .unwrap_or_default();
    match (el.tag_name.as_str(), role.as_str()) {
        ("header", _) | (_, "banner") => Some(Region::Header),
        ("nav", _) | (_, "navigation") => Some(Region::Navigation),
        ("main", _) | (_, "main") => Some(Region::Main),
        ("footer", _) | (_, "contentinfo") => Some(Region::Footer),
        (_, "toolbar") => Some(Region::Toolbar),
        _ => None,
    }
}

/// Walk from `id` toward the page root (inclusive of `id`); the first
/// landmark ancestor wins. Returns `None` when no landmark encloses the
/// element — call sites choose their own default region: capture falls back
/// to [`Region::Body`], the authoring declaration dialog to [`Region::Main`].
pub fn classify(page: &PageSnapshot, id: NodeId) -> Option<Region> {
    page.ancestors_inclusive(id)
        .find_map(|ancestor| landmark_of(page.get(ancestor)))
}

/// First node in document order that is the landmark root for `region`.
/// Used to scope region-bound resolution; `None` means the landmark is
/// missing from the current page and the caller searches the whole page.
pub fn find_root(page: &PageSnapshot, region: Region) -> Option<NodeId> {
    page.ids()
        .find(|id| landmark_of(page.get(*id)) == Some(region))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRole {
    Heading,
    Label,
}

/// Nearest heading/label text used to disambiguate otherwise-identical
/// elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub role: AnchorRole,
    pub name: String,
}

fn anchor_from(el: &ElementState) -> Option<Anchor> {
    let role = if el.is_label() {
        AnchorRole::Label
    } else if el.is_heading() {
        AnchorRole::Heading
    } else {
        return None;
    };
    let text = el.rendered_text()?;
    Some(Anchor {
        role,
        name: text.chars().take(MAX_ANCHOR_TEXT).collect(),
    })
}

/// Walk strictly upward from `id`'s parent; at each ancestor, scan its
/// descendants in document order for the first heading or label element that
/// is not `id` itself. Returns `None` when no ancestor yields one before the
/// root.
pub fn nearest_anchor(page: &PageSnapshot, id: NodeId) -> Option<Anchor> {
    let mut ancestor = page.parent(id);
    while let Some(current) = ancestor {
        let found = page
            .descendants(current)
            .into_iter()
            .filter(|candidate| *candidate != id)
            .find_map(|candidate| anchor_from(page.get(candidate)));
        if found.is_some() {
            return found;
        }
        ancestor = page.parent(current);
    }
    None
}
