//! The on-page input surface where the user confirms an expected value. It is
//! a real panel node, so events inside it pass through the interceptors.

use crate::assert::AssertType;
use crate::core::AssertConfig;
use crate::dom::{Document, NodeId};
use crate::errors::{RecorderError, Result};
use crate::types::{ElementRect, Point, Viewport};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ASSERT_PANEL: &str = "assert";
const ACTION_ATTRIBUTE: &str = "data-recorder-action";
const SURFACE_Z_INDEX: &str = "2147483647";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    Confirm,
    Cancel,
}

/// One entry of the variable lookup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableItem {
    pub original_name: String,
    pub user_defined_name: String,
    #[serde(default)]
    pub statement_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableItems {
    #[serde(default)]
    pub items: Vec<VariableItem>,
}

/// `{success, data: {items: [...]}}` as returned by the variable provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableLookup {
    pub success: bool,
    #[serde(default)]
    pub data: VariableItems,
}

impl VariableLookup {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn find(&self, user_defined_name: &str) -> Option<&VariableItem> {
        self.data
            .items
            .iter()
            .find(|item| item.user_defined_name == user_defined_name)
    }
}

/// Top-left corner for a surface anchored to `anchor`: below it when there
/// is room, else above, clamped inside the viewport.
pub fn place_surface(anchor: ElementRect, viewport: Viewport, config: &AssertConfig) -> Point {
    let margin = config.surface_margin;
    let max_left = (viewport.width - config.surface_width - margin).max(margin);
    let max_top = (viewport.height - config.surface_height - margin).max(margin);

    let below = anchor.bottom() + margin;
    let top = if below + config.surface_height <= viewport.height - margin {
        below
    } else {
        anchor.y - config.surface_height - margin
    };
    Point::new(anchor.x.clamp(margin, max_left), top.clamp(margin, max_top))
}

#[derive(Debug, Clone)]
pub struct AssertInputSurface {
    pub node: NodeId,
    pub input: NodeId,
    pub target: NodeId,
    pub assert_type: AssertType,
    pub default_value: String,
    pub position: Point,
    query: Option<serde_json::Value>,
    api_request: Option<serde_json::Value>,
}

impl AssertInputSurface {
    /// Builds the panel under `body`, pre-filled with `default_value`.
    pub fn open(
        doc: &mut Document,
        target: NodeId,
        assert_type: AssertType,
        default_value: &str,
        position: Point,
        config: &AssertConfig,
    ) -> Result<Self> {
        let body = doc
            .body()
            .ok_or_else(|| RecorderError::NodeNotFound("body".to_string()))?;

        let panel = doc.create_element("div");
        doc.set_attr(panel, &config.panel_attribute, ASSERT_PANEL);
        doc.set_attr(
            panel,
            "style",
            &format!(
                "position: fixed; left: {}px; top: {}px; width: {}px; height: {}px; z-index: {}",
                position.x, position.y, config.surface_width, config.surface_height, SURFACE_Z_INDEX
            ),
        );

        let label = doc.create_element("label");
        doc.set_text_content(label, &format!("Expected {}", assert_type))?;
        let input = doc.create_element("input");
        doc.set_attr(input, "type", "text");
        doc.set_attr(input, "value", default_value);
        let confirm = doc.create_element("button");
        doc.set_attr(confirm, ACTION_ATTRIBUTE, "confirm");
        doc.set_text_content(confirm, "OK")?;
        let cancel = doc.create_element("button");
        doc.set_attr(cancel, ACTION_ATTRIBUTE, "cancel");
        doc.set_text_content(cancel, "Cancel")?;

        for child in [label, input, confirm, cancel] {
            doc.append_child(panel, child)?;
        }
        doc.append_child(body, panel)?;

        Ok(Self {
            node: panel,
            input,
            target,
            assert_type,
            default_value: default_value.to_string(),
            position,
            query: None,
            api_request: None,
        })
    }

    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        node == self.node || doc.is_descendant_of(node, self.node)
    }

    pub fn value(&self, doc: &Document) -> String {
        doc.value(self.input)
    }

    pub fn set_value(&self, doc: &mut Document, value: &str) {
        doc.set_value(self.input, value);
    }

    /// Appends `{{user_defined_name}}` to the current value.
    pub fn insert_variable(&self, doc: &mut Document, variable: &VariableItem) {
        let value = format!("{}{{{{{}}}}}", self.value(doc), variable.user_defined_name);
        doc.set_value(self.input, &value);
    }

    pub fn attach_query(&mut self, payload: serde_json::Value) {
        self.query = Some(payload);
    }

    pub fn attach_api_request(&mut self, payload: serde_json::Value) {
        self.api_request = Some(payload);
    }

    pub fn query(&self) -> Option<&serde_json::Value> {
        self.query.as_ref()
    }

    pub fn api_request(&self) -> Option<&serde_json::Value> {
        self.api_request.as_ref()
    }

    /// Which button, if any, `node` belongs to.
    pub fn action_at(&self, doc: &Document, node: NodeId) -> Option<SurfaceAction> {
        std::iter::once(node)
            .chain(doc.ancestors(node))
            .take_while(|candidate| *candidate != self.node)
            .find_map(|candidate| match doc.attr(candidate, ACTION_ATTRIBUTE) {
                Some("confirm") => Some(SurfaceAction::Confirm),
                Some("cancel") => Some(SurfaceAction::Cancel),
                _ => None,
            })
    }

    pub fn close(self, doc: &mut Document) {
        if doc.parent(self.node).is_some() {
            if let Err(err) = doc.remove(self.node) {
                warn!("assert surface could not be removed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn placement_flips_above_and_clamps() {
        let config = AssertConfig::default();
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
        };
        let below = place_surface(ElementRect::new(100.0, 100.0, 80.0, 20.0), viewport, &config);
        assert_eq!(below, Point::new(100.0, 128.0));

        let near_bottom = place_surface(ElementRect::new(700.0, 560.0, 80.0, 20.0), viewport, &config);
        assert_eq!(near_bottom.x, 800.0 - 320.0 - 8.0);
        assert_eq!(near_bottom.y, 560.0 - 148.0 - 8.0);

        let top_left = place_surface(ElementRect::new(-50.0, 0.0, 10.0, 10.0), viewport, &config);
        assert_eq!(top_left, Point::new(8.0, 18.0));
    }

    #[test]
    fn variables_append_placeholders() {
        let mut doc = parse_html(r#"<body><input id="t" value="abc"></body>"#).unwrap();
        let target = doc.by_id("t").unwrap();
        let config = AssertConfig::default();
        let surface = AssertInputSurface::open(
            &mut doc,
            target,
            AssertType::Value,
            "abc",
            Point::new(8.0, 8.0),
            &config,
        )
        .unwrap();
        let lookup = VariableLookup::from_json_str(
            r#"{"success": true, "data": {"items": [{"original_name": "u", "user_defined_name": "userName", "statement_id": 4}]}}"#,
        )
        .unwrap();
        surface.insert_variable(&mut doc, lookup.find("userName").unwrap());
        assert_eq!(surface.value(&doc), "abc{{userName}}");

        let confirm = doc
            .descendants(surface.node)
            .into_iter()
            .find(|node| doc.attr(*node, ACTION_ATTRIBUTE) == Some("confirm"))
            .unwrap();
        assert_eq!(surface.action_at(&doc, confirm), Some(SurfaceAction::Confirm));
        let node = surface.node;
        surface.close(&mut doc);
        assert!(!doc.is_connected(node));
    }
}
