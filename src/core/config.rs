use crate::errors::{RecorderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub selector: SelectorConfig,
    pub navigation: NavigationConfig,
    pub capture: CaptureConfig,
    #[serde(rename = "assert")]
    pub assertion: AssertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub max_selectors: usize,
    pub click_min_score: u32,
    pub change_min_score: u32,
    pub max_text_length: usize,
    pub ancestor_depth: usize,
    pub test_id_attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub gesture_window_ms: i64,
    pub redirect_window_ms: i64,
    pub navigating_reset_ms: i64,
    pub link_click_window_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub focus_debounce_ms: i64,
    pub preview_max_length: usize,
    pub element_text_max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssertConfig {
    pub surface_width: f64,
    pub surface_height: f64,
    pub surface_margin: f64,
    pub asserted_cleanup_interval_ms: i64,
    pub panel_attribute: String,
}

impl RecorderConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: RecorderConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selector.max_selectors == 0 {
            return Err(RecorderError::Configuration(
                "selector.max_selectors must be at least 1".to_string(),
            ));
        }
        if self.selector.test_id_attributes.is_empty() {
            return Err(RecorderError::Configuration(
                "selector.test_id_attributes must not be empty".to_string(),
            ));
        }
        if self.navigation.gesture_window_ms < 0 || self.navigation.redirect_window_ms < 0 {
            return Err(RecorderError::Configuration(
                "navigation windows must be non-negative".to_string(),
            ));
        }
        if self.assertion.panel_attribute.trim().is_empty() {
            return Err(RecorderError::Configuration(
                "assert.panel_attribute must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_selectors: 3,
            click_min_score: 100,
            change_min_score: 300,
            max_text_length: 50,
            ancestor_depth: 3,
            test_id_attributes: vec![
                "data-testid".to_string(),
                "data-test-id".to_string(),
                "data-test".to_string(),
                "data-cy".to_string(),
                "data-qa".to_string(),
            ],
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            gesture_window_ms: 2000,
            redirect_window_ms: 3000,
            navigating_reset_ms: 2000,
            link_click_window_ms: 1000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            focus_debounce_ms: 500,
            preview_max_length: 600,
            element_text_max_length: 200,
        }
    }
}

impl Default for AssertConfig {
    fn default() -> Self {
        Self {
            surface_width: 320.0,
            surface_height: 148.0,
            surface_margin: 8.0,
            asserted_cleanup_interval_ms: 5000,
            panel_attribute: "data-recorder-panel".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            RecorderConfig::from_json_str(r#"{"navigation": {"gesture_window_ms": 1500}}"#)
                .unwrap();
        assert_eq!(config.navigation.gesture_window_ms, 1500);
        assert_eq!(config.navigation.redirect_window_ms, 3000);
        assert_eq!(config.selector.change_min_score, 300);
        assert_eq!(config.assertion.panel_attribute, "data-recorder-panel");
    }

    #[test]
    fn rejects_zero_selectors() {
        let err = RecorderConfig::from_json_str(r#"{"selector": {"max_selectors": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, RecorderError::Configuration(_)));
    }
}
