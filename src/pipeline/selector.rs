//! Candidate selection: which elements are worth considering at all.

use crate::scene::{ElementInfo, NodeId, SceneProvider};

const INTERACTIVE_ROLES: [&str; 18] = [
    "button",
    "link",
    "checkbox",
    "radio",
    "input",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "switch",
    "tab",
    "treeitem",
    "gridcell",
    "search",
    "combobox",
    "listbox",
    "slider",
    "spinbutton",
];

const EDITABLE_INPUT_TYPES: [&str; 13] = [
    "text",
    "password",
    "email",
    "tel",
    "number",
    "search",
    "url",
    "date",
    "time",
    "datetime-local",
    "month",
    "week",
    "color",
];

/// Candidates in document order, split by how they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Matched an explicit interactive tag, attribute or role.
    pub fixed: Vec<NodeId>,
    /// Discovered through `cursor: pointer`.
    pub heuristic: Vec<NodeId>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.fixed.len() + self.heuristic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.heuristic.is_empty()
    }
}

pub trait CandidateSelector {
    fn select<P: SceneProvider>(&self, provider: &P) -> Selection;

    fn is_editable(&self, element: &ElementInfo) -> bool {
        is_editable(element)
    }
}

/// Tag, attribute and ARIA role rules, plus the pointer-cursor heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleSelector;

impl CandidateSelector for RoleSelector {
    fn select<P: SceneProvider>(&self, provider: &P) -> Selection {
        let count = provider.node_count();

        // Pre-order ids: children always follow their parent, so one reverse
        // pass settles descendant facts and one forward pass ancestor facts.
        let mut has_img_below = vec![false; count];
        for idx in (0..count).rev() {
            let node = NodeId(idx);
            if let Some(parent) = provider.parent(node) {
                if has_img_below[idx] || provider.element(node).is_tag("img") {
                    has_img_below[parent.0] = true;
                }
            }
        }

        let mut in_anchor = vec![false; count];
        let mut in_svg = vec![false; count];
        let mut in_fixed = vec![false; count];
        let mut fixed = vec![false; count];
        let mut selection = Selection::default();
        for idx in 0..count {
            let node = NodeId(idx);
            let element = provider.element(node);
            if let Some(parent) = provider.parent(node) {
                let parent_element = provider.element(parent);
                in_anchor[idx] = in_anchor[parent.0] || parent_element.is_tag("a");
                in_svg[idx] = in_svg[parent.0] || parent_element.is_tag("svg");
                in_fixed[idx] = in_fixed[parent.0] || fixed[parent.0];
            }

            if is_fixed_role(element, has_img_below[idx], in_anchor[idx]) {
                fixed[idx] = true;
                selection.fixed.push(node);
            } else if element.cursor.as_deref() == Some("pointer")
                && !in_svg[idx]
                && !element.is_tag("svg")
                && !in_fixed[idx]
            {
                selection.heuristic.push(node);
            }
        }
        selection
    }
}

fn is_fixed_role(element: &ElementInfo, has_img_below: bool, in_anchor: bool) -> bool {
    let tag_match = match element.tag.as_str() {
        "a" => !has_img_below,
        "img" => in_anchor,
        "button" | "select" | "textarea" => true,
        "input" => !element
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
        _ => false,
    };
    tag_match
        || element.attr("tabindex").is_some_and(|v| v.trim() != "-1")
        || is_content_editable(element)
        || element.has_class("btn")
        || element.role.as_deref().is_some_and(|role| {
            INTERACTIVE_ROLES
                .iter()
                .any(|r| role.eq_ignore_ascii_case(r))
        })
}

fn is_content_editable(element: &ElementInfo) -> bool {
    element
        .attr("contenteditable")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Text-entry controls. An `input` without a `type` is a text input.
pub fn is_editable(element: &ElementInfo) -> bool {
    if element.is_tag("textarea") || is_content_editable(element) {
        return true;
    }
    if !element.is_tag("input") {
        return false;
    }
    let kind = element.attr("type").unwrap_or("text");
    EDITABLE_INPUT_TYPES
        .iter()
        .any(|t| kind.eq_ignore_ascii_case(t))
}
