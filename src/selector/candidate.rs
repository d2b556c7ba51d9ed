use crate::core::SelectorConfig;
use crate::dom::{quote_css_string, Document, NodeId};
use crate::utils::accessibility::{
    accessible_name, is_form_control, label_text, role, NAME_OPTIONAL_ROLES,
};
use crate::utils::text::{char_len, normalize_whitespace};
use crate::utils::visibility::is_visible;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateKind {
    Testid,
    Placeholder,
    Label,
    Role,
    Text,
    AltText,
    Title,
    AttributeCss,
}

/// One way of relocating an element, with what is needed to query it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectorCandidate {
    Testid { attribute: String, value: String },
    Placeholder { tag: String, value: String },
    Label { text: String },
    Role { role: String, name: Option<String> },
    Text { text: String },
    AltText { value: String },
    Title { value: String },
    AttributeCss { css: String },
}

impl SelectorCandidate {
    pub fn kind(&self) -> CandidateKind {
        match self {
            SelectorCandidate::Testid { .. } => CandidateKind::Testid,
            SelectorCandidate::Placeholder { .. } => CandidateKind::Placeholder,
            SelectorCandidate::Label { .. } => CandidateKind::Label,
            SelectorCandidate::Role { .. } => CandidateKind::Role,
            SelectorCandidate::Text { .. } => CandidateKind::Text,
            SelectorCandidate::AltText { .. } => CandidateKind::AltText,
            SelectorCandidate::Title { .. } => CandidateKind::Title,
            SelectorCandidate::AttributeCss { .. } => CandidateKind::AttributeCss,
        }
    }

    pub fn score(&self) -> u32 {
        match self.kind() {
            CandidateKind::Testid => 1000,
            CandidateKind::Placeholder => 900,
            CandidateKind::Label => 800,
            CandidateKind::Role => 700,
            CandidateKind::Text => 500,
            CandidateKind::AltText => 400,
            CandidateKind::Title => 350,
            CandidateKind::AttributeCss => 300,
        }
    }

    /// The selector string handed to the host; parses back with
    /// [`SelectorExpr::parse`](crate::selector::SelectorExpr::parse).
    pub fn to_selector(&self) -> String {
        match self {
            SelectorCandidate::Testid { attribute, value } => {
                format!("[{}={}]", attribute, quote_css_string(value))
            }
            SelectorCandidate::Placeholder { tag, value } => {
                format!("{}[placeholder={}]", tag, quote_css_string(value))
            }
            SelectorCandidate::Label { text } => format!("label={}", quote_css_string(text)),
            SelectorCandidate::Role { role, name: Some(name) } => {
                format!("role={}[name={}]", role, quote_css_string(name))
            }
            SelectorCandidate::Role { role, name: None } => format!("role={}", role),
            SelectorCandidate::Text { text } => format!("text={}", quote_css_string(text)),
            SelectorCandidate::AltText { value } => format!("[alt={}]", quote_css_string(value)),
            SelectorCandidate::Title { value } => format!("[title={}]", quote_css_string(value)),
            SelectorCandidate::AttributeCss { css } => css.clone(),
        }
    }
}

/// Candidates for `node` in ladder order. Nothing here checks uniqueness.
pub fn collect_candidates(
    doc: &Document,
    node: NodeId,
    config: &SelectorConfig,
) -> Vec<SelectorCandidate> {
    let mut out = Vec::new();
    let Some(tag) = doc.tag_name(node).map(str::to_string) else {
        return out;
    };

    for attribute in &config.test_id_attributes {
        if let Some(value) = non_empty_attr(doc, node, attribute) {
            out.push(SelectorCandidate::Testid {
                attribute: attribute.to_ascii_lowercase(),
                value,
            });
        }
    }

    if matches!(tag.as_str(), "input" | "textarea") {
        if let Some(value) = non_empty_attr(doc, node, "placeholder") {
            out.push(SelectorCandidate::Placeholder {
                tag: tag.clone(),
                value,
            });
        }
    }

    if is_form_control(doc, node) {
        if let Some(text) = label_text(doc, node) {
            out.push(SelectorCandidate::Label { text });
        }
    }

    if let Some(role) = role(doc, node) {
        let name = accessible_name(doc, node);
        if !name.is_empty() {
            out.push(SelectorCandidate::Role {
                role,
                name: Some(name),
            });
        } else if NAME_OPTIONAL_ROLES.contains(&role.as_str()) {
            out.push(SelectorCandidate::Role { role, name: None });
        }
    }

    if let Some(text) = text_candidate(doc, node, config.max_text_length) {
        out.push(SelectorCandidate::Text { text });
    }

    if let Some(value) = non_empty_attr(doc, node, "alt") {
        out.push(SelectorCandidate::AltText { value });
    }
    if let Some(value) = non_empty_attr(doc, node, "title") {
        out.push(SelectorCandidate::Title { value });
    }

    if tag == "input" {
        if let Some(name) = non_empty_attr(doc, node, "name") {
            out.push(SelectorCandidate::AttributeCss {
                css: format!("input[name={}]", quote_css_string(&name)),
            });
        }
    }

    out
}

/// Own visible text of a non-form-control element, if short enough.
pub fn text_candidate(doc: &Document, node: NodeId, max_len: usize) -> Option<String> {
    if is_form_control(doc, node) || !is_visible(doc, node) {
        return None;
    }
    let text = normalize_whitespace(&doc.own_text(node));
    if text.is_empty() || char_len(&text) >= max_len {
        return None;
    }
    Some(text)
}

fn non_empty_attr(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    doc.attr(node, name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
