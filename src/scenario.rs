//! Scripted sessions: a JSON list of user gestures, page-script effects and
//! host control calls replayed through a [`Recorder`].
//!
//! ```json
//! {"url": "https://shop.test/", "steps": [
//!   {"action": "click", "target": "[data-testid=\"submit\"]"},
//!   {"action": "type", "target": "#email", "value": "a@b.c"},
//!   {"action": "advance", "ms": 500}
//! ]}
//! ```

use crate::actions::{ActionRecord, MemorySink};
use crate::assert::{AssertType, VariableItem};
use crate::core::{Clock, RecorderConfig};
use crate::dom::{NodeId, SelectedFile};
use crate::errors::{RecorderError, Result};
use crate::page::{DomEvent, EventKind, Modifiers, Page};
use crate::recorder::Recorder;
use crate::selector::SelectorExpr;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

fn default_url() -> String {
    "https://localhost/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSpec {
    pub name: String,
    #[serde(default = "default_mime")]
    pub mime_type: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_mime() -> String {
    "application/octet-stream".to_string()
}

impl FileSpec {
    fn selected(&self) -> SelectedFile {
        match (&self.path, &self.content) {
            (Some(path), _) => SelectedFile::from_path(&self.name, &self.mime_type, path.clone()),
            (None, content) => SelectedFile::from_bytes(
                &self.name,
                &self.mime_type,
                content.clone().unwrap_or_default().into_bytes(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    // user gestures
    Click {
        target: String,
        #[serde(default)]
        modifiers: Modifiers,
        /// `element.click()` instead of a real pointer click.
        #[serde(default)]
        programmatic: bool,
    },
    DoubleClick { target: String },
    RightClick { target: String },
    Type { target: String, value: String },
    Select { target: String, value: String },
    Check { target: String, checked: bool },
    Upload { target: String, files: Vec<FileSpec> },
    Key {
        #[serde(default)]
        target: Option<String>,
        key: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseOver { target: String },
    MouseOut { target: String },
    Scroll { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    DragStart { target: String },
    Drop { target: String, x: f64, y: f64 },
    DragEnd { target: String },
    Navigate { url: String },
    Reload,
    Back,
    Forward,
    FocusWindow,
    Visibility { visible: bool },

    // page-script effects
    PushState { url: String },
    ReplaceState { url: String },
    LocationAssign { url: String },
    ScriptTimeout { code: String, delay_ms: u64 },
    Remove { target: String },
    Advance { ms: i64 },
    Frame,

    // host control calls
    Pause { paused: bool },
    AssertMode {
        enabled: bool,
        #[serde(default)]
        assert_type: Option<AssertType>,
    },
    AssertValue { value: String },
    InsertVariable { name: String },
    AttachQuery { payload: serde_json::Value },
    AttachApiRequest { payload: serde_json::Value },
    Confirm,
    Cancel,
    HoverEffects { enabled: bool },
    ExecutingActions { executing: bool },
    ResetLastInput,
    Unfreeze,
}

impl Scenario {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn resolve(page: &Page, target: &str) -> Result<NodeId> {
    SelectorExpr::parse(target)?
        .resolve(&page.document)
        .nodes()
        .first()
        .copied()
        .ok_or_else(|| RecorderError::NodeNotFound(target.to_string()))
}

/// Replays `scenario` against `html` and returns every record the recorder
/// sent, in order.
pub async fn run_scenario(
    scenario: &Scenario,
    html: &str,
    config: RecorderConfig,
    clock: &dyn Clock,
) -> Result<Vec<ActionRecord>> {
    let mut page = Page::from_html(html, &scenario.url)?;
    page.sync_clock(clock);
    let sink = MemorySink::new();
    let mut recorder = Recorder::new(config, &page)?.with_sink(Arc::new(sink.clone()));

    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, ?step, "scenario step");
        apply(&mut recorder, &mut page, step).await?;
    }
    let records = sink.take();
    info!(steps = scenario.steps.len(), records = records.len(), "scenario finished");
    Ok(records)
}

async fn fire(recorder: &mut Recorder, page: &mut Page, mut event: DomEvent) -> usize {
    recorder.dispatch(page, &mut event).await
}

async fn apply(recorder: &mut Recorder, page: &mut Page, step: &Step) -> Result<()> {
    match step {
        Step::Click {
            target,
            modifiers,
            programmatic,
        } => {
            let node = resolve(page, target)?;
            let event = if *programmatic {
                DomEvent::new(EventKind::Click, node)
            } else {
                let center = page.document.rect(node).center();
                DomEvent::pointer(EventKind::Click, node, center.x, center.y)
            };
            fire(recorder, page, event.with_modifiers(*modifiers)).await;
        }
        Step::DoubleClick { target } => {
            let node = resolve(page, target)?;
            let center = page.document.rect(node).center();
            fire(recorder, page, DomEvent::pointer(EventKind::DblClick, node, center.x, center.y)).await;
        }
        Step::RightClick { target } => {
            let node = resolve(page, target)?;
            let center = page.document.rect(node).center();
            let event = DomEvent::pointer(EventKind::ContextMenu, node, center.x, center.y);
            fire(recorder, page, event).await;
        }
        Step::Type { target, value } => {
            let node = resolve(page, target)?;
            page.document.set_value(node, value);
            fire(recorder, page, DomEvent::new(EventKind::Input, node)).await;
        }
        Step::Select { target, value } => {
            let node = resolve(page, target)?;
            if !page.document.select_option(node, value) {
                return Err(RecorderError::NodeNotFound(format!("option '{}' in {}", value, target)));
            }
            fire(recorder, page, DomEvent::new(EventKind::Change, node)).await;
        }
        Step::Check { target, checked } => {
            let node = resolve(page, target)?;
            page.document.set_checked(node, *checked);
            fire(recorder, page, DomEvent::new(EventKind::Change, node)).await;
        }
        Step::Upload { target, files } => {
            let node = resolve(page, target)?;
            page.document
                .set_files(node, files.iter().map(FileSpec::selected).collect());
            fire(recorder, page, DomEvent::new(EventKind::Change, node)).await;
        }
        Step::Key {
            target,
            key,
            code,
            modifiers,
        } => {
            let node = match target {
                Some(target) => resolve(page, target)?,
                None => page.document.body().unwrap_or_else(|| page.document.root()),
            };
            let code = code.as_deref().unwrap_or(key);
            let event = DomEvent::key(EventKind::KeyDown, node, key, code).with_modifiers(*modifiers);
            fire(recorder, page, event).await;
        }
        Step::MouseOver { target } => {
            let node = resolve(page, target)?;
            fire(recorder, page, DomEvent::new(EventKind::MouseOver, node)).await;
        }
        Step::MouseOut { target } => {
            let node = resolve(page, target)?;
            fire(recorder, page, DomEvent::new(EventKind::MouseOut, node)).await;
        }
        Step::Scroll { x, y } => {
            page.scroll_to(*x, *y);
            let root = page.document.root();
            fire(recorder, page, DomEvent::new(EventKind::Scroll, root)).await;
        }
        Step::Resize { width, height } => {
            page.resize(*width, *height);
            let root = page.document.root();
            fire(recorder, page, DomEvent::new(EventKind::Resize, root)).await;
        }
        Step::DragStart { target } => {
            let node = resolve(page, target)?;
            let center = page.document.rect(node).center();
            let event = DomEvent::pointer(EventKind::DragStart, node, center.x, center.y);
            fire(recorder, page, event).await;
        }
        Step::Drop { target, x, y } => {
            let node = resolve(page, target)?;
            fire(recorder, page, DomEvent::pointer(EventKind::Drop, node, *x, *y)).await;
        }
        Step::DragEnd { target } => {
            let node = resolve(page, target)?;
            fire(recorder, page, DomEvent::new(EventKind::DragEnd, node)).await;
        }
        Step::Navigate { url } => {
            page.navigate(url)?;
            recorder.sync(page);
        }
        Step::Reload => {
            page.user_reload();
            recorder.sync(page);
        }
        Step::Back | Step::Forward => {
            if matches!(step, Step::Back) {
                page.history_back();
            } else {
                page.history_forward();
            }
            let root = page.document.root();
            fire(recorder, page, DomEvent::new(EventKind::PopState, root)).await;
        }
        Step::FocusWindow => {
            let root = page.document.root();
            fire(recorder, page, DomEvent::new(EventKind::Focus, root)).await;
        }
        Step::Visibility { visible } => {
            page.set_visible(*visible);
            let root = page.document.root();
            fire(recorder, page, DomEvent::new(EventKind::VisibilityChange, root)).await;
        }
        Step::PushState { url } => {
            page.push_state(url)?;
            recorder.sync(page);
        }
        Step::ReplaceState { url } => {
            page.replace_state(url)?;
            recorder.sync(page);
        }
        Step::LocationAssign { url } => {
            page.location_assign(url)?;
            recorder.sync(page);
        }
        Step::ScriptTimeout { code, delay_ms } => {
            page.set_timeout_script(code, *delay_ms);
            recorder.sync(page);
        }
        Step::Remove { target } => {
            let node = resolve(page, target)?;
            page.document.remove(node)?;
            recorder.sync(page);
        }
        Step::Advance { ms } => {
            page.advance_time(*ms);
            recorder.sync(page);
        }
        Step::Frame => {
            recorder.on_animation_frame(page);
        }
        Step::Pause { paused } => recorder.set_pause_mode(*paused),
        Step::AssertMode {
            enabled,
            assert_type,
        } => recorder.set_assert_mode(page, *enabled, *assert_type),
        Step::AssertValue { value } => {
            recorder.set_assert_value(page, value);
        }
        Step::InsertVariable { name } => {
            let variable = VariableItem {
                original_name: name.clone(),
                user_defined_name: name.clone(),
                statement_id: None,
            };
            recorder.insert_variable(page, &variable);
        }
        Step::AttachQuery { payload } => {
            recorder.attach_query(payload.clone());
        }
        Step::AttachApiRequest { payload } => {
            recorder.attach_api_request(payload.clone());
        }
        Step::Confirm => {
            recorder.confirm_assertion(page);
        }
        Step::Cancel => {
            recorder.cancel_assertion(page);
        }
        Step::HoverEffects { enabled } => {
            if *enabled {
                recorder.enable_hover_effects();
            } else {
                recorder.disable_hover_effects(page);
            }
        }
        Step::ExecutingActions { executing } => recorder.set_executing_actions_state(*executing),
        Step::ResetLastInput => recorder.reset_last_input_action(),
        Step::Unfreeze => {
            recorder.unfreeze_entire_screen(page);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionType;
    use crate::core::ManualClock;

    const FORM: &str = r#"<body>
        <input id="email" name="email">
        <button data-testid="submit">Send</button>
    </body>"#;

    #[tokio::test]
    async fn replays_gestures_in_order() {
        let scenario = Scenario::from_json_str(
            r##"{"url": "https://shop.test/", "steps": [
                {"action": "type", "target": "#email", "value": "a@b.c"},
                {"action": "click", "target": "[data-testid=\"submit\"]"},
                {"action": "click", "target": "[data-testid=\"submit\"]", "programmatic": true},
                {"action": "scroll", "x": 0, "y": 300},
                {"action": "frame"}
            ]}"##,
        )
        .unwrap();
        let records = run_scenario(&scenario, FORM, RecorderConfig::default(), &ManualClock::new(0))
            .await
            .unwrap();
        let types: Vec<ActionType> = records.iter().map(|r| r.action_type).collect();
        assert_eq!(
            types,
            vec![ActionType::Input, ActionType::Click, ActionType::Scroll]
        );
    }

    #[tokio::test]
    async fn unknown_targets_fail_the_run() {
        let scenario = Scenario {
            url: default_url(),
            steps: vec![Step::Click {
                target: "#nope".to_string(),
                modifiers: Modifiers::default(),
                programmatic: false,
            }],
        };
        let result = run_scenario(&scenario, FORM, RecorderConfig::default(), &ManualClock::new(0)).await;
        assert!(matches!(result, Err(RecorderError::NodeNotFound(_))));
    }
}
