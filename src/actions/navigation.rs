//! Tells user navigation apart from navigation a click or a page script caused.
//!
//! A URL change inside the gesture window is attributed to the gesture (the
//! click is already recorded); inside the redirect window it is a script
//! redirect. Everything else is emitted, and emitting opens a redirect window
//! so the follow-on hop of a redirect chain is not recorded twice.

use crate::actions::record::{ActionRecord, ActionType, ActionValue};
use crate::core::NavigationConfig;
use crate::utils::text::cached_regex;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlChangeCause {
    PushState,
    ReplaceState,
    PopState,
    HashChange,
    BeforeUnload,
    Unload,
    PageHide,
}

impl UrlChangeCause {
    pub fn is_unload(&self) -> bool {
        matches!(
            self,
            UrlChangeCause::BeforeUnload | UrlChangeCause::Unload | UrlChangeCause::PageHide
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationDecision {
    pub action_type: ActionType,
    pub url: String,
    pub previous_url: String,
}

#[derive(Debug, Clone)]
pub struct NavigationTracker {
    config: NavigationConfig,
    last_user_gesture_ts: Option<i64>,
    last_auto_redirect_ts: Option<i64>,
    last_known_url: String,
    navigating_since: Option<i64>,
    last_link_click: Option<(String, i64)>,
}

fn within(since: Option<i64>, now: i64, window_ms: i64) -> bool {
    since.map_or(false, |ts| now - ts < window_ms)
}

/// Script source that can move the page somewhere else.
pub fn mentions_navigation(code: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(
        &PATTERN,
        r"\b(?:location|href|assign|replace|reload|navigate|pushState|replaceState|history\.go|history\.back)\b",
    )
    .map_or(false, |pattern| pattern.is_match(code))
}

impl NavigationTracker {
    pub fn new(config: NavigationConfig, url: &str) -> Self {
        Self {
            config,
            last_user_gesture_ts: None,
            last_auto_redirect_ts: None,
            last_known_url: url.to_string(),
            navigating_since: None,
            last_link_click: None,
        }
    }

    pub fn last_known_url(&self) -> &str {
        &self.last_known_url
    }

    /// Follows a URL change without classifying it (recording is paused).
    pub fn sync_url(&mut self, url: &str) {
        self.last_known_url = url.to_string();
    }

    pub fn note_user_gesture(&mut self, now: i64) {
        self.last_user_gesture_ts = Some(now);
    }

    pub fn note_link_click(&mut self, href: &str, now: i64) {
        self.last_link_click = Some((href.to_string(), now));
    }

    pub fn note_auto_redirect(&mut self, now: i64) {
        self.last_auto_redirect_ts = Some(now);
    }

    pub fn note_script_timer(&mut self, code: &str, now: i64) {
        if mentions_navigation(code) {
            debug!("string timer with navigation: {}", code);
            self.note_auto_redirect(now);
        }
    }

    /// True until `navigating_reset_ms` after the last emitted navigation.
    pub fn is_navigating(&self, now: i64) -> bool {
        within(self.navigating_since, now, self.config.navigating_reset_ms)
    }

    pub fn on_url_change(
        &mut self,
        cause: UrlChangeCause,
        reported_url: &str,
        now: i64,
    ) -> Option<NavigationDecision> {
        let url = if cause.is_unload() {
            self.recent_link_click(now).unwrap_or_else(|| reported_url.to_string())
        } else {
            reported_url.to_string()
        };

        let same_url = url == self.last_known_url;
        if same_url && !cause.is_unload() {
            return None;
        }
        if within(self.last_user_gesture_ts, now, self.config.gesture_window_ms) {
            debug!(%url, ?cause, "url change follows a user gesture");
            self.last_known_url = url;
            return None;
        }
        if within(self.last_auto_redirect_ts, now, self.config.redirect_window_ms)
            || self.is_navigating(now)
        {
            debug!(%url, ?cause, "url change is a script redirect");
            self.last_known_url = url;
            return None;
        }

        let action_type = match cause {
            _ if cause.is_unload() && same_url => ActionType::Reload,
            UrlChangeCause::BeforeUnload => ActionType::Reload,
            UrlChangeCause::PopState => ActionType::BackForward,
            _ => ActionType::Navigate,
        };
        let previous_url = std::mem::replace(&mut self.last_known_url, url.clone());
        self.last_auto_redirect_ts = Some(now);
        self.navigating_since = Some(now);
        Some(NavigationDecision {
            action_type,
            url,
            previous_url,
        })
    }

    /// The href of a link clicked within `link_click_window_ms`. A link click
    /// is also a gesture, so under the default windows this href only becomes
    /// the tracked URL; it reaches a record only when `gesture_window_ms` is
    /// shorter than the link window.
    fn recent_link_click(&self, now: i64) -> Option<String> {
        self.last_link_click
            .as_ref()
            .filter(|(_, ts)| now - ts < self.config.link_click_window_ms)
            .map(|(href, _)| href.clone())
    }
}

impl NavigationDecision {
    pub fn into_record(self, title: &str, page_index: usize, now: i64) -> ActionRecord {
        ActionRecord::new(
            self.action_type,
            ActionValue {
                url: Some(self.url),
                previous_url: Some(self.previous_url),
                title: (!title.is_empty()).then(|| title.to_string()),
                page_index: Some(page_index),
                ..ActionValue::at(now)
            },
        )
    }
}
