use crate::errors::{RecorderError, Result};
use crate::page::{PageSignal, WindowState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// History and location methods page scripts can call.
pub trait NavigationApi {
    fn push_state(&self, window: &mut WindowState, url: &str) -> Result<()>;
    fn replace_state(&self, window: &mut WindowState, url: &str) -> Result<()>;
    fn go(&self, window: &mut WindowState, delta: i64);
    fn assign(&self, window: &mut WindowState, url: &str) -> Result<()>;
    fn replace(&self, window: &mut WindowState, url: &str) -> Result<()>;
    fn reload(&self, window: &mut WindowState);

    fn name(&self) -> &'static str;
}

/// `XMLHttpRequest` and `fetch`.
pub trait NetworkApi {
    fn xhr_open(&self, log: &mut NetworkLog, method: &str, url: &str) -> XhrId;
    fn xhr_send(&self, log: &mut NetworkLog, id: XhrId, body: Option<String>) -> Result<()>;
    fn fetch(&self, log: &mut NetworkLog, request: FetchRequest) -> Result<usize>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XhrId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.to_string(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    pub via_fetch: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct OpenXhr {
    id: XhrId,
    method: String,
    url: String,
}

/// Requests that actually left the page.
#[derive(Debug, Default, Clone)]
pub struct NetworkLog {
    sent: Vec<NetworkEntry>,
    open: Vec<OpenXhr>,
    next_xhr: u64,
}

impl NetworkLog {
    pub fn sent(&self) -> &[NetworkEntry] {
        &self.sent
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn open(&mut self, method: &str, url: &str) -> XhrId {
        self.next_xhr += 1;
        let id = XhrId(self.next_xhr);
        self.open.push(OpenXhr {
            id,
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        });
        id
    }

    fn send(&mut self, id: XhrId, body: Option<String>) -> Result<()> {
        let position = self
            .open
            .iter()
            .position(|xhr| xhr.id == id)
            .ok_or_else(|| RecorderError::NetworkBlocked(format!("{:?} was never opened", id)))?;
        let xhr = self.open.remove(position);
        self.sent.push(NetworkEntry {
            method: xhr.method,
            url: xhr.url,
            body,
            via_fetch: false,
        });
        Ok(())
    }

    fn record_fetch(&mut self, request: FetchRequest) -> usize {
        self.sent.push(NetworkEntry {
            method: request.method.to_ascii_uppercase(),
            url: request.url,
            body: request.body,
            via_fetch: true,
        });
        self.sent.len() - 1
    }
}

#[derive(Debug, Default)]
pub struct NativeNavigation;

impl NavigationApi for NativeNavigation {
    fn push_state(&self, window: &mut WindowState, url: &str) -> Result<()> {
        let target = window.resolve(url)?;
        window.history.truncate(window.history_index + 1);
        window.history.push(target.clone());
        window.history_index = window.history.len() - 1;
        window.location = target.clone();
        window.raise(PageSignal::PushState {
            url: target.to_string(),
        });
        Ok(())
    }

    fn replace_state(&self, window: &mut WindowState, url: &str) -> Result<()> {
        let target = window.resolve(url)?;
        if let Some(entry) = window.history.get_mut(window.history_index) {
            *entry = target.clone();
        }
        window.location = target.clone();
        window.raise(PageSignal::ReplaceState {
            url: target.to_string(),
        });
        Ok(())
    }

    fn go(&self, window: &mut WindowState, delta: i64) {
        let index = window.history_index as i64 + delta;
        if delta == 0 || index < 0 || index >= window.history.len() as i64 {
            debug!("history.go({}) out of range", delta);
            return;
        }
        let previous = window.location.clone();
        window.history_index = index as usize;
        window.location = window.history[window.history_index].clone();
        let url = window.location.to_string();
        let hash_only = previous.as_str().split('#').next() == url.split('#').next()
            && previous.fragment() != window.location.fragment();
        window.raise(PageSignal::PopState { url: url.clone() });
        if hash_only {
            window.raise(PageSignal::HashChange { url });
        }
    }

    fn assign(&self, window: &mut WindowState, url: &str) -> Result<()> {
        let target = window.resolve(url)?;
        window.raise(PageSignal::ScriptNavigation {
            url: target.to_string(),
        });
        window.commit_navigation(target, true);
        Ok(())
    }

    fn replace(&self, window: &mut WindowState, url: &str) -> Result<()> {
        let target = window.resolve(url)?;
        window.raise(PageSignal::ScriptNavigation {
            url: target.to_string(),
        });
        window.commit_navigation(target, false);
        Ok(())
    }

    fn reload(&self, window: &mut WindowState) {
        window.raise(PageSignal::ScriptReload);
        let current = window.location.clone();
        window.raise(PageSignal::Unload {
            url: current.to_string(),
        });
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

#[derive(Debug, Default)]
pub struct NativeNetwork;

impl NetworkApi for NativeNetwork {
    fn xhr_open(&self, log: &mut NetworkLog, method: &str, url: &str) -> XhrId {
        log.open(method, url)
    }

    fn xhr_send(&self, log: &mut NetworkLog, id: XhrId, body: Option<String>) -> Result<()> {
        log.send(id, body)
    }

    fn fetch(&self, log: &mut NetworkLog, request: FetchRequest) -> Result<usize> {
        Ok(log.record_fetch(request))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// `open` is still forwarded while blocked so header setup on the returned
/// request keeps working.
pub(crate) fn forward_xhr_open(log: &mut NetworkLog, method: &str, url: &str) -> XhrId {
    log.open(method, url)
}

pub(crate) fn discard_xhr(log: &mut NetworkLog, id: XhrId) {
    log.open.retain(|xhr| xhr.id != id);
}
