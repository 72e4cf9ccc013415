use crate::capability::CapabilitySet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static, point-in-time state of one live page element.
///
/// This is the unit of input supplied by the automation driver: everything
/// the engine reads about an element is captured here up front, so that a
/// whole resolution pass runs against one consistent snapshot and never
/// touches the live page again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub tag_name: String,
    /// `type` attribute of `<input>` elements, lowercased.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_type: Option<String>,
    /// Explicit `role` attribute, if any. See [`ElementState::inferred_role`]
    /// for the resolved semantic role.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    /// First of `data-testid` / `data-test-id` / `data-cy` / `data-qa`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// Text of a `<label for=...>` pointing at this element.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub href: Option<String>,
    /// Rendered text content, as the user sees it.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub disabled: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub readonly: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub content_editable: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub has_click_handler: bool,
    /// Computed cursor style resolved to `pointer`.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub pointer_cursor: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Bounding box as (x, y, width, height). `None` means the driver did not
    /// report geometry; such elements are assumed to occupy space.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bounds: Option<(f64, f64, f64, f64)>,
}

fn default_true() -> bool {
    true
}

impl ElementState {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_lowercase(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn is_file_input(&self) -> bool {
        self.tag_name == "input" && self.input_type.as_deref() == Some("file")
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self.tag_name.as_str(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        )
    }

    pub fn is_label(&self) -> bool {
        matches!(self.tag_name.as_str(), "label" | "legend")
    }

    /// Non-empty trimmed rendered text, if any.
    pub fn rendered_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn has_zero_area(&self) -> bool {
        matches!(self.bounds, Some((_, _, w, h)) if w * h == 0.0)
    }

    /// Semantic role of the element: the explicit `role` attribute when set,
    /// otherwise inferred from the tag (and `type` for inputs).
    pub fn inferred_role(&self) -> String {
        if let Some(role) = self.role.as_deref() {
            let trimmed = role.trim();
            if !trimmed.is_empty() {
                return trimmed.to_lowercase();
            }
        }
        match self.tag_name.as_str() {
            "button" => "button".to_string(),
            "a" => "link".to_string(),
            "input" => match self.input_type.as_deref() {
                Some("submit") | Some("button") | Some("reset") => "button".to_string(),
                _ => "input".to_string(),
            },
            _ if self.is_heading() => "heading".to_string(),
            _ if self.is_label() => "label".to_string(),
            tag => tag.to_string(),
        }
    }

    /// Accessible name, following one ordered precedence list wherever a name
    /// must be derived: aria-label, associated label, rendered text,
    /// placeholder, title, form value. A file input with none of these gets
    /// the literal name "File Input".
    pub fn accessible_name(&self) -> Option<String> {
        let sources = [
            self.aria_label.as_deref(),
            self.label_text.as_deref(),
            self.rendered_text(),
            self.placeholder.as_deref(),
            self.title.as_deref(),
            self.value.as_deref(),
        ];
        for source in sources.into_iter().flatten() {
            let trimmed = source.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if self.is_file_input() {
            return Some("File Input".to_string());
        }
        None
    }
}

/// Identifies one element within a [`PageSnapshot`], in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Serializable element tree, as delivered by the driver process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub element: ElementState,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(element: ElementState) -> Self {
        Self {
            element,
            children: Vec::new(),
        }
    }

    pub fn with_children(element: ElementState, children: Vec<DomNode>) -> Self {
        Self { element, children }
    }
}

struct Node {
    state: ElementState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A consistent snapshot of the live page's element tree.
///
/// Built once per capture or resolution attempt; each replay re-enumerates
/// from scratch rather than tracking DOM mutations incrementally. Node ids
/// follow pre-order document position, which doubles as the final
/// deterministic tiebreak during ranking.
pub struct PageSnapshot {
    nodes: Vec<Node>,
    viewport_width: f64,
}

const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

impl PageSnapshot {
    pub fn from_tree(root: &DomNode) -> Self {
        let mut snapshot = Self {
            nodes: Vec::new(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
        };
        snapshot.insert(root, None);
        snapshot
    }

    pub fn with_viewport_width(mut self, width: f64) -> Self {
        self.viewport_width = width;
        self
    }

    fn insert(&mut self, node: &DomNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            state: node.element.clone(),
            parent,
            children: Vec::new(),
        });
        for child in &node.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn get(&self, id: NodeId) -> &ElementState {
        &self.nodes[id.0].state
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// All node ids in document (pre-order) position.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Walk from `id` toward the root, inclusive of `id` itself.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.parent(id);
            Some(id)
        })
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn find(&self, mut predicate: impl FnMut(&ElementState) -> bool) -> Option<NodeId> {
        self.ids().find(|id| predicate(self.get(*id)))
    }

    /// Elements eligible for capture and resolution: visible, with non-zero
    /// rendered area, and carrying at least one interaction capability. The
    /// same filter applies at both authoring and replay time.
    pub fn interactive_elements(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|id| {
                let el = self.get(*id);
                el.visible && !el.has_zero_area() && CapabilitySet::classify(el).is_interactive()
            })
            .collect()
    }
}
