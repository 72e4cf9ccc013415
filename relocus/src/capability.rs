use crate::element::ElementState;
use serde::{Deserialize, Serialize};

/// Input `type`s that are not text entry even though they live on an
/// `<input>` tag. This is the canonical exclusion list for `editable`.
const NON_EDITABLE_INPUT_TYPES: &[&str] = &[
    "checkbox", "radio", "button", "submit", "reset", "file", "image", "hidden", "range", "color",
];

const CLICKABLE_ROLES: &[&str] = &[
    "button", "link", "menuitem", "tab", "checkbox", "radio", "switch", "option",
];

const CLICKABLE_INPUT_TYPES: &[&str] = &[
    "button", "submit", "reset", "image", "checkbox", "radio", "file",
];

const SELECT_ROLES: &[&str] = &["listbox", "combobox", "menu", "radiogroup"];

/// Interaction capabilities of one element, derived solely from static
/// element state. Flags are mutually non-exclusive; `disabled` forces every
/// flag except `readable` to false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub editable: bool,
    pub clickable: bool,
    pub select_like: bool,
    pub file_input: bool,
    pub readable: bool,
}

impl CapabilitySet {
    /// Classify a single element. Pure and total: no layout or animation
    /// signals are consulted beyond the pointer-cursor heuristic.
    pub fn classify(el: &ElementState) -> Self {
        let input_type = el.input_type.as_deref().unwrap_or("");
        let role = el.inferred_role();

        let editable = !el.disabled
            && !el.readonly
            && (el.content_editable
                || el.tag_name == "textarea"
                || (el.tag_name == "input" && !NON_EDITABLE_INPUT_TYPES.contains(&input_type)));

        let clickable = !el.disabled
            && (matches!(el.tag_name.as_str(), "button" | "a" | "summary" | "details")
                || CLICKABLE_ROLES.contains(&role.as_str())
                || (el.tag_name == "input" && CLICKABLE_INPUT_TYPES.contains(&input_type))
                || el.has_click_handler
                || el.pointer_cursor);

        let select_like =
            !el.disabled && (el.tag_name == "select" || SELECT_ROLES.contains(&role.as_str()));

        let file_input = !el.disabled && el.is_file_input();

        let readable = el.rendered_text().is_some();

        Self {
            editable,
            clickable,
            select_like,
            file_input,
            readable,
        }
    }

    /// Whether the element can be acted on at all. Used as the enumeration
    /// filter shared by capture and resolution.
    pub fn is_interactive(&self) -> bool {
        self.editable || self.clickable || self.select_like || self.file_input
    }
}
