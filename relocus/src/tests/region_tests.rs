//! Tests for region classification and anchor location

use super::{node, page, tree};
use crate::element::ElementState;
use crate::region::{self, AnchorRole, Region};

#[test]
fn innermost_landmark_wins() {
    let snapshot = page(vec![tree(
        ElementState::new("header"),
        vec![tree(
            ElementState::new("nav"),
            vec![node(ElementState::new("button"))],
        )],
    )]);
    let button = snapshot.find(|el| el.tag_name == "button").unwrap();
    assert_eq!(region::classify(&snapshot, button), Some(Region::Navigation));
}

#[test]
fn landmark_roles_match_like_tags() {
    let snapshot = page(vec![
        tree(
            ElementState {
                role: Some("banner".to_string()),
                ..ElementState::new("div")
            },
            vec![node(ElementState::new("a"))],
        ),
        tree(
            ElementState {
                role: Some("toolbar".to_string()),
                ..ElementState::new("div")
            },
            vec![node(ElementState::new("button"))],
        ),
    ]);
    let link = snapshot.find(|el| el.tag_name == "a").unwrap();
    assert_eq!(region::classify(&snapshot, link), Some(Region::Header));
    let button = snapshot.find(|el| el.tag_name == "button").unwrap();
    assert_eq!(region::classify(&snapshot, button), Some(Region::Toolbar));
}

#[test]
fn element_inside_no_landmark_is_unclassified() {
    let snapshot = page(vec![tree(
        ElementState::new("div"),
        vec![node(ElementState::new("button"))],
    )]);
    let button = snapshot.find(|el| el.tag_name == "button").unwrap();
    assert_eq!(region::classify(&snapshot, button), None);
}

#[test]
fn landmark_element_classifies_itself() {
    let snapshot = page(vec![node(ElementState::new("main"))]);
    let main = snapshot.find(|el| el.tag_name == "main").unwrap();
    assert_eq!(region::classify(&snapshot, main), Some(Region::Main));
}

#[test]
fn find_root_returns_first_landmark_in_document_order() {
    let snapshot = page(vec![
        node(ElementState::new("header")),
        node(ElementState::new("main")),
        node(ElementState::new("footer")),
    ]);
    let main = region::find_root(&snapshot, Region::Main).unwrap();
    assert_eq!(snapshot.get(main).tag_name, "main");
    assert!(region::find_root(&snapshot, Region::Toolbar).is_none());
}

#[test]
fn nearest_anchor_finds_sibling_heading() {
    let snapshot = page(vec![tree(
        ElementState::new("section"),
        vec![
            node(ElementState {
                text: "Billing details".to_string(),
                ..ElementState::new("h2")
            }),
            node(ElementState::new("input")),
        ],
    )]);
    let input = snapshot.find(|el| el.tag_name == "input").unwrap();
    let anchor = region::nearest_anchor(&snapshot, input).unwrap();
    assert_eq!(anchor.role, AnchorRole::Heading);
    assert_eq!(anchor.name, "Billing details");
}

#[test]
fn nearest_anchor_prefers_closest_ancestor_scope() {
    let snapshot = page(vec![
        node(ElementState {
            text: "Page title".to_string(),
            ..ElementState::new("h1")
        }),
        tree(
            ElementState::new("fieldset"),
            vec![
                node(ElementState {
                    text: "Shipping address".to_string(),
                    ..ElementState::new("legend")
                }),
                node(ElementState::new("input")),
            ],
        ),
    ]);
    let input = snapshot.find(|el| el.tag_name == "input").unwrap();
    let anchor = region::nearest_anchor(&snapshot, input).unwrap();
    assert_eq!(anchor.role, AnchorRole::Label);
    assert_eq!(anchor.name, "Shipping address");
}

#[test]
fn nearest_anchor_never_returns_the_element_itself() {
    let snapshot = page(vec![tree(
        ElementState::new("div"),
        vec![node(ElementState {
            text: "Lonely heading".to_string(),
            ..ElementState::new("h3")
        })],
    )]);
    let heading = snapshot.find(|el| el.tag_name == "h3").unwrap();
    assert_eq!(region::nearest_anchor(&snapshot, heading), None);
}

#[test]
fn anchor_text_is_truncated() {
    let long = "An extremely long heading that keeps going well past fifty characters";
    let snapshot = page(vec![tree(
        ElementState::new("div"),
        vec![
            node(ElementState {
                text: long.to_string(),
                ..ElementState::new("h2")
            }),
            node(ElementState::new("button")),
        ],
    )]);
    let button = snapshot.find(|el| el.tag_name == "button").unwrap();
    let anchor = region::nearest_anchor(&snapshot, button).unwrap();
    assert_eq!(anchor.name.chars().count(), 50);
    assert!(long.starts_with(&anchor.name));
}
