use crate::assert::AssertType;
use crate::types::{Point, Viewport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    DoubleClick,
    RightClick,
    ShiftClick,
    Input,
    Select,
    Check,
    Keyboard,
    Scroll,
    WindowResize,
    DragStart,
    Drop,
    DragEnd,
    Upload,
    Navigate,
    Reload,
    BackForward,
    PageFocus,
    Assert,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::DoubleClick => "double_click",
            ActionType::RightClick => "right_click",
            ActionType::ShiftClick => "shift_click",
            ActionType::Input => "input",
            ActionType::Select => "select",
            ActionType::Check => "check",
            ActionType::Keyboard => "keyboard",
            ActionType::Scroll => "scroll",
            ActionType::WindowResize => "window_resize",
            ActionType::DragStart => "drag_start",
            ActionType::Drop => "drop",
            ActionType::DragEnd => "drag_end",
            ActionType::Upload => "upload",
            ActionType::Navigate => "navigate",
            ActionType::Reload => "reload",
            ActionType::BackForward => "back_forward",
            ActionType::PageFocus => "page_focus",
            ActionType::Assert => "assert",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorValue {
    pub value: String,
}

/// Serialized view of the element an action touched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub html: String,
    pub text: String,
    pub tag_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionElement {
    pub selectors: Vec<SelectorValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_data: Option<ElementSnapshot>,
}

impl ActionElement {
    pub fn new(selectors: Vec<String>) -> Self {
        Self {
            selectors: selectors
                .into_iter()
                .map(|value| SelectorValue { value })
                .collect(),
            order_index: None,
            element_data: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: ElementSnapshot) -> Self {
        self.element_data = Some(snapshot);
        self
    }

    pub fn with_order_index(mut self, index: u32) -> Self {
        self.order_index = Some(index);
        self
    }

    pub fn primary_selector(&self) -> Option<&str> {
        self.selectors.first().map(|selector| selector.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: i64,
    pub data_url: String,
}

/// Payload of one `action_data` entry; absent fields are left out of the wire form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_upload: Option<FileUpload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert_type: Option<AssertType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_request: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ActionValue {
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    pub value: ActionValue,
}

/// One replayable step, in the shape the host stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action_type: ActionType,
    pub elements: Vec<ActionElement>,
    pub action_datas: Vec<ActionData>,
}

impl ActionRecord {
    /// Every record starts with one data entry.
    pub fn new(action_type: ActionType, value: ActionValue) -> Self {
        Self {
            action_type,
            elements: Vec::new(),
            action_datas: vec![ActionData { value }],
        }
    }

    pub fn with_element(mut self, element: ActionElement) -> Self {
        let index = self.elements.len() as u32;
        self.elements.push(element.with_order_index(index));
        self
    }

    pub fn push_data(&mut self, value: ActionValue) {
        self.action_datas.push(ActionData { value });
    }

    pub fn primary_selector(&self) -> Option<&str> {
        self.elements.first().and_then(ActionElement::primary_selector)
    }

    /// First data entry; present by construction.
    pub fn value(&self) -> Option<&ActionValue> {
        self.action_datas.first().map(|data| &data.value)
    }

    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_to_the_wire_shape() {
        let record = ActionRecord::new(
            ActionType::Click,
            ActionValue {
                position: Some(Point::new(10.0, 20.0)),
                ..ActionValue::at(1_000)
            },
        )
        .with_element(ActionElement::new(vec![r#"[data-testid="go"]"#.to_string()]));

        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(
            wire,
            json!({
                "action_type": "click",
                "elements": [{"selectors": [{"value": "[data-testid=\"go\"]"}], "order_index": 0}],
                "action_datas": [{"value": {"position": {"x": 10.0, "y": 20.0}, "timestamp": 1000}}]
            })
        );
    }
}
