//! Uniqueness checks. Everything here is a pure function of the document.

use crate::dom::{query_all, query_rooted, CssSelector, Document, NodeId};
use crate::errors::Result;
use crate::selector::candidate::SelectorCandidate;
use crate::utils::accessibility::{accessible_name, is_form_control, label_text, role};
use crate::utils::text::normalize_whitespace;
use crate::utils::visibility::is_visible;

/// How one selector segment finds elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    Css(CssSelector),
    Role { role: String, name: Option<String> },
    Text(String),
    Label(String),
}

impl Engine {
    /// Matches inside `scopes` and every shadow tree nested in them.
    pub fn query(&self, doc: &Document, scopes: &[NodeId]) -> Vec<NodeId> {
        match self {
            Engine::Css(selector) => pierce(doc, scopes)
                .into_iter()
                .flat_map(|root| query_all(doc, root, selector))
                .collect(),
            _ => {
                let elements: Vec<NodeId> = pierce(doc, scopes)
                    .into_iter()
                    .flat_map(|root| doc.descendants(root))
                    .collect();
                self.filter_elements(doc, elements)
            }
        }
    }

    /// Matches inside the tree of each scope only, with CSS chains starting at
    /// the scope's children.
    pub fn query_rooted(&self, doc: &Document, scopes: &[NodeId]) -> Vec<NodeId> {
        match self {
            Engine::Css(selector) => scopes
                .iter()
                .flat_map(|root| query_rooted(doc, *root, selector))
                .collect(),
            _ => {
                let elements: Vec<NodeId> = scopes
                    .iter()
                    .flat_map(|root| doc.descendants(*root))
                    .collect();
                self.filter_elements(doc, elements)
            }
        }
    }

    fn filter_elements(&self, doc: &Document, elements: Vec<NodeId>) -> Vec<NodeId> {
        match self {
            Engine::Css(selector) => elements
                .into_iter()
                .filter(|node| selector.matches(doc, *node))
                .collect(),
            Engine::Role { role: wanted, name } => elements
                .into_iter()
                .filter(|node| role(doc, *node).as_deref() == Some(wanted.as_str()))
                .filter(|node| {
                    name.as_ref()
                        .map_or(true, |name| accessible_name(doc, *node) == *name)
                })
                .collect(),
            Engine::Label(text) => elements
                .into_iter()
                .filter(|node| is_form_control(doc, *node))
                .filter(|node| label_text(doc, *node).as_deref() == Some(text.as_str()))
                .collect(),
            Engine::Text(text) => text_matches(doc, elements, text),
        }
    }
}

/// Exact own-text matches when there are any, substring matches otherwise.
fn text_matches(doc: &Document, elements: Vec<NodeId>, text: &str) -> Vec<NodeId> {
    let mut exact = Vec::new();
    let mut partial = Vec::new();
    for node in elements {
        if is_form_control(doc, node) || !is_visible(doc, node) {
            continue;
        }
        let own = normalize_whitespace(&doc.own_text(node));
        if own.is_empty() {
            continue;
        }
        if own == text {
            exact.push(node);
        } else if own.contains(text) {
            partial.push(node);
        }
    }
    if exact.is_empty() {
        partial
    } else {
        exact
    }
}

/// Each scope followed by the shadow roots nested anywhere below it.
fn pierce(doc: &Document, scopes: &[NodeId]) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = scopes.to_vec();
    let mut index = 0;
    while index < roots.len() {
        let scope = roots[index];
        for element in doc.descendants(scope) {
            if let Some(shadow) = doc.shadow_root(element) {
                roots.push(shadow);
            }
        }
        index += 1;
    }
    roots
}

/// Elements a candidate resolves to, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    nodes: Vec<NodeId>,
}

impl MatchSet {
    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        let mut seen = std::collections::HashSet::new();
        nodes.retain(|node| seen.insert(*node));
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Exactly one match, and it is `target`.
    pub fn is_unique_match(&self, target: NodeId) -> bool {
        self.nodes.as_slice() == [target]
    }
}

pub fn candidate_engine(candidate: &SelectorCandidate) -> Result<Engine> {
    Ok(match candidate {
        SelectorCandidate::Label { text } => Engine::Label(text.clone()),
        SelectorCandidate::Role { role, name } => Engine::Role {
            role: role.clone(),
            name: name.clone(),
        },
        SelectorCandidate::Text { text } => Engine::Text(text.clone()),
        other => Engine::Css(CssSelector::parse(&other.to_selector())?),
    })
}

/// Re-queries the whole document, shadow roots included, with the
/// candidate's own engine.
pub fn find_matches(doc: &Document, candidate: &SelectorCandidate) -> Result<MatchSet> {
    let engine = candidate_engine(candidate)?;
    Ok(MatchSet::new(engine.query(doc, &[doc.root()])))
}
