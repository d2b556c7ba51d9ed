use crate::core::SelectorConfig;
use crate::dom::{Document, NodeId};
use crate::selector::candidate::collect_candidates;
use crate::selector::fallback::{ancestor_chain, css_path};
use crate::selector::matcher::find_matches;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub const ANCESTOR_CHAIN_SCORE: u32 = 200;
pub const CSS_PATH_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorOptions {
    pub max_selectors: usize,
    pub min_score: u32,
    pub validate: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            max_selectors: 3,
            min_score: CSS_PATH_SCORE,
            validate: true,
        }
    }
}

/// Selectors for `node`, best first. Never empty: when nothing semantic is
/// unique the structural path is returned.
pub fn generate_and_validate_selectors(
    doc: &Document,
    node: NodeId,
    options: SelectorOptions,
    config: &SelectorConfig,
) -> Vec<String> {
    let max = options.max_selectors.max(1);
    let mut selectors: Vec<String> = Vec::new();

    if doc.is_element(node) {
        for candidate in collect_candidates(doc, node, config) {
            if selectors.len() >= max {
                break;
            }
            if candidate.score() < options.min_score {
                continue;
            }
            let selector = candidate.to_selector();
            if options.validate {
                match find_matches(doc, &candidate) {
                    Ok(matches) if matches.is_unique_match(node) => {}
                    Ok(matches) => {
                        trace!(%selector, matches = matches.len(), "candidate not unique");
                        continue;
                    }
                    Err(err) => {
                        debug!(%selector, "candidate did not parse: {}", err);
                        continue;
                    }
                }
            }
            push_unique(&mut selectors, selector);
        }
    }

    let want_fallbacks = selectors.is_empty() || selectors.len() < max;
    if want_fallbacks && doc.is_element(node) {
        let chain_allowed = selectors.is_empty() || ANCESTOR_CHAIN_SCORE >= options.min_score;
        if chain_allowed && selectors.len() < max {
            if let Some(chain) = ancestor_chain(doc, node, config.ancestor_depth) {
                push_unique(&mut selectors, chain);
            }
        }
        let path_allowed = selectors.is_empty() || CSS_PATH_SCORE >= options.min_score;
        if path_allowed && selectors.len() < max {
            push_unique(&mut selectors, css_path(doc, node));
        }
    }

    if selectors.is_empty() {
        selectors.push(css_path(doc, node));
    }
    selectors
}

fn push_unique(selectors: &mut Vec<String>, selector: String) {
    if !selector.is_empty() && !selectors.contains(&selector) {
        selectors.push(selector);
    }
}

/// Config-bound front end used by the action handlers.
#[derive(Debug, Clone)]
pub struct SelectorGenerator {
    config: SelectorConfig,
}

impl SelectorGenerator {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn generate(&self, doc: &Document, node: NodeId, min_score: u32) -> Vec<String> {
        generate_and_validate_selectors(
            doc,
            node,
            SelectorOptions {
                max_selectors: self.config.max_selectors,
                min_score,
                validate: true,
            },
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::selector::expr::resolves_uniquely_to;

    fn generate(doc: &Document, node: NodeId, min_score: u32) -> Vec<String> {
        generate_and_validate_selectors(
            doc,
            node,
            SelectorOptions {
                min_score,
                ..SelectorOptions::default()
            },
            &SelectorConfig::default(),
        )
    }

    #[test]
    fn test_id_outranks_label() {
        let doc = parse_html(
            r#"<body><input id="e" data-testid="email-field" aria-label="Email"></body>"#,
        )
        .unwrap();
        let node = doc.by_id("e").unwrap();
        let selectors = generate(&doc, node, 100);
        assert_eq!(selectors[0], r#"[data-testid="email-field"]"#);
        assert_eq!(selectors[1], r#"label="Email""#);
        assert_eq!(selectors.len(), 3);
    }

    #[test]
    fn duplicate_signals_fall_through_to_structure() {
        let doc = parse_html(
            r#"<body><ul><li><span>Item</span></li><li><span>Item</span></li></ul></body>"#,
        )
        .unwrap();
        let body = doc.body().unwrap();
        let list = doc.element_children(body)[0];
        let second = doc.element_children(doc.element_children(list)[1])[0];
        let selectors = generate(&doc, second, 100);
        assert_eq!(selectors, vec!["html > body > ul > li:nth-of-type(2) > span"]);
        assert!(resolves_uniquely_to(&doc, &selectors[0], second));
    }

    #[test]
    fn high_threshold_skips_low_scores_but_never_returns_nothing() {
        let doc = parse_html(r#"<body><div><select name="size"></select></div></body>"#).unwrap();
        let body = doc.body().unwrap();
        let select = doc.element_children(doc.element_children(body)[0])[0];
        let selectors = generate(&doc, select, 300);
        // combobox without a name is not a candidate and `name` is input-only.
        assert_eq!(selectors.len(), 1);
        assert!(resolves_uniquely_to(&doc, &selectors[0], select));
    }

    #[test]
    fn every_element_resolves_through_its_first_selector() {
        let doc = parse_html(
            r#"<body>
                <header><a href="/">Home</a><a href="/about">About</a></header>
                <main>
                    <h1>Welcome</h1>
                    <form><label>Name <input name="name"></label><button>Go</button><button>Go</button></form>
                    <p>text <b>bold</b></p><p>text</p>
                </main>
            </body>"#,
        )
        .unwrap();
        for node in doc.descendants(doc.root()) {
            let selectors = generate(&doc, node, 100);
            assert!(!selectors.is_empty());
            assert!(
                resolves_uniquely_to(&doc, &selectors[0], node),
                "{:?} -> {}",
                doc.tag_name(node),
                selectors[0]
            );
        }
    }
}
