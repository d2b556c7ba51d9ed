//! Navigation and network suppression while assert mode is armed. Installing
//! swaps the window's APIs for blocking ones; uninstalling puts back exactly
//! the objects that were there before.

use crate::errors::{RecorderError, Result};
use crate::page::navigation::{discard_xhr, forward_xhr_open};
use crate::page::{
    FetchRequest, NavigationApi, NetworkApi, NetworkLog, Window, WindowState, XhrId,
};
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct BlockedNavigation;

impl NavigationApi for BlockedNavigation {
    fn push_state(&self, _window: &mut WindowState, url: &str) -> Result<()> {
        debug!(%url, "pushState blocked");
        Ok(())
    }

    fn replace_state(&self, _window: &mut WindowState, url: &str) -> Result<()> {
        debug!(%url, "replaceState blocked");
        Ok(())
    }

    fn go(&self, _window: &mut WindowState, delta: i64) {
        debug!(delta, "history.go blocked");
    }

    fn assign(&self, _window: &mut WindowState, url: &str) -> Result<()> {
        debug!(%url, "location.assign blocked");
        Ok(())
    }

    fn replace(&self, _window: &mut WindowState, url: &str) -> Result<()> {
        debug!(%url, "location.replace blocked");
        Ok(())
    }

    fn reload(&self, _window: &mut WindowState) {
        debug!("location.reload blocked");
    }

    fn name(&self) -> &'static str {
        "blocked"
    }
}

/// `open` still works so scripts can set headers; `send` goes nowhere and
/// `fetch` rejects.
#[derive(Debug, Default)]
pub struct BlockedNetwork;

impl NetworkApi for BlockedNetwork {
    fn xhr_open(&self, log: &mut NetworkLog, method: &str, url: &str) -> XhrId {
        forward_xhr_open(log, method, url)
    }

    fn xhr_send(&self, log: &mut NetworkLog, id: XhrId, _body: Option<String>) -> Result<()> {
        debug!(?id, "XMLHttpRequest.send blocked");
        discard_xhr(log, id);
        Ok(())
    }

    fn fetch(&self, _log: &mut NetworkLog, request: FetchRequest) -> Result<usize> {
        debug!(url = %request.url, "fetch blocked");
        Err(RecorderError::NetworkBlocked(request.url))
    }

    fn name(&self) -> &'static str {
        "blocked"
    }
}

#[derive(Default)]
pub struct InterceptionLayer {
    saved: Option<(Rc<dyn NavigationApi>, Rc<dyn NetworkApi>)>,
}

impl std::fmt::Debug for InterceptionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionLayer")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl InterceptionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.saved.is_some()
    }

    /// False when already installed.
    pub fn install(&mut self, window: &mut Window) -> bool {
        if self.is_installed() {
            return false;
        }
        let navigation = window.replace_navigation(Rc::new(BlockedNavigation));
        let network = window.replace_network(Rc::new(BlockedNetwork));
        self.saved = Some((navigation, network));
        info!("navigation and network interception installed");
        true
    }

    /// False when nothing was installed.
    pub fn uninstall(&mut self, window: &mut Window) -> bool {
        let Some((navigation, network)) = self.saved.take() else {
            return false;
        };
        window.replace_navigation(navigation);
        window.replace_network(network);
        info!("navigation and network interception removed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    #[test]
    fn blocks_side_effects_and_restores_originals() {
        let mut page = Page::from_html("<body></body>", "https://app.test/").unwrap();
        let original_navigation = page.window.navigation();
        let original_network = page.window.network();
        let mut layer = InterceptionLayer::new();

        assert!(layer.install(&mut page.window));
        assert!(!layer.install(&mut page.window));

        page.push_state("/elsewhere").unwrap();
        page.location_assign("/login").unwrap();
        let xhr = page.xhr_open("POST", "/api/save");
        page.xhr_send(xhr, None).unwrap();
        assert!(matches!(
            page.fetch(FetchRequest::get("/api/items")),
            Err(RecorderError::NetworkBlocked(_))
        ));
        assert_eq!(page.url(), "https://app.test/");
        assert!(page.take_signals().is_empty());
        assert!(page.window.state.network.sent().is_empty());

        assert!(layer.uninstall(&mut page.window));
        assert!(!layer.uninstall(&mut page.window));
        assert!(Rc::ptr_eq(&page.window.navigation(), &original_navigation));
        assert!(Rc::ptr_eq(&page.window.network(), &original_network));
    }
}
