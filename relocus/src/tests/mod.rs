mod healing_tests;
mod region_tests;
mod session_tests;

use crate::element::{DomNode, ElementState, PageSnapshot};

// Initialize tracing for tests
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

pub(crate) fn node(element: ElementState) -> DomNode {
    DomNode::new(element)
}

pub(crate) fn tree(element: ElementState, children: Vec<DomNode>) -> DomNode {
    DomNode::with_children(element, children)
}

/// Snapshot rooted at a plain `<body>` wrapping the given children.
pub(crate) fn page(children: Vec<DomNode>) -> PageSnapshot {
    PageSnapshot::from_tree(&tree(ElementState::new("body"), children))
}
