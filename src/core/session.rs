use crate::actions::ActionRecord;
use crate::assert::AssertType;
use tracing::info;
use uuid::Uuid;

/// Mode state for one injected page lifetime. A fresh page load gets a fresh
/// session with both flags off.
#[derive(Debug, Clone)]
pub struct RecorderSession {
    pub id: Uuid,
    paused: bool,
    assert_mode: bool,
    assert_type: Option<AssertType>,
    last_input_action: Option<ActionRecord>,
    executing_actions: bool,
    hover_effects: bool,
}

impl Default for RecorderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            paused: false,
            assert_mode: false,
            assert_type: None,
            last_input_action: None,
            executing_actions: false,
            hover_effects: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!(session = %self.id, paused, "pause mode changed");
        }
        self.paused = paused;
    }

    pub fn is_assert_mode(&self) -> bool {
        self.assert_mode
    }

    pub fn assert_type(&self) -> Option<AssertType> {
        self.assert_type
    }

    pub fn set_assert_mode(&mut self, enabled: bool, assert_type: Option<AssertType>) {
        self.assert_mode = enabled;
        self.assert_type = if enabled { assert_type } else { None };
    }

    pub fn last_input_action(&self) -> Option<&ActionRecord> {
        self.last_input_action.as_ref()
    }

    pub fn set_last_input_action(&mut self, record: ActionRecord) {
        self.last_input_action = Some(record);
    }

    pub fn reset_last_input_action(&mut self) {
        self.last_input_action = None;
    }

    pub fn is_executing_actions(&self) -> bool {
        self.executing_actions
    }

    pub fn set_executing_actions(&mut self, executing: bool) {
        self.executing_actions = executing;
    }

    pub fn hover_effects(&self) -> bool {
        self.hover_effects
    }

    pub fn set_hover_effects(&mut self, enabled: bool) {
        self.hover_effects = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_sessions_start_idle_with_their_own_id() {
        let first = RecorderSession::new();
        let second = RecorderSession::default();
        assert_ne!(first.id, second.id);
        assert!(!first.is_paused() && !first.is_assert_mode());
        assert!(first.last_input_action().is_none());
        let copy = first.clone();
        assert_eq!(copy.id, first.id);
    }

    #[test]
    fn disabling_assert_mode_clears_the_type() {
        let mut session = RecorderSession::new();
        session.set_assert_mode(true, Some(AssertType::Value));
        assert_eq!(session.assert_type(), Some(AssertType::Value));
        session.set_assert_mode(false, Some(AssertType::Text));
        assert!(!session.is_assert_mode());
        assert_eq!(session.assert_type(), None);
    }
}
