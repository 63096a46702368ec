//! The environment a worker runs in.
//!
//! The worker never owns windows or the notification tray; it asks the host.
//! [`LocalHost`] is the in-process host used by the proxy: it tracks the
//! pages it has served as window clients and records notifications.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use laojobs_core::Error;

use super::push::Notification;

/// Upper bound on tracked windows; the oldest is forgotten first.
const MAX_WINDOWS: usize = 64;

/// Upper bound on retained notifications.
const MAX_NOTIFICATIONS: usize = 100;

/// A page the host is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    pub focused: bool,
    /// Version of the worker controlling this page, if any.
    pub controller: Option<String>,
}

/// Host capabilities a worker may use.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Make `version` the controller of every open client. Returns how many.
    async fn claim_clients(&self, version: &str) -> Result<usize, Error>;

    /// Open window clients, most recently used last.
    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error>;

    /// Bring a window to the front.
    async fn focus(&self, client_id: &str) -> Result<(), Error>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &Url) -> Result<WindowClient, Error>;

    /// Display a platform notification.
    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Dismiss a shown notification. Closing one that is not shown is a no-op.
    async fn close_notification(&self, notification: &Notification) -> Result<(), Error>;
}

#[derive(Debug, Default)]
struct HostState {
    windows: Vec<WindowClient>,
    notifications: Vec<Notification>,
    controller: Option<String>,
    next_id: u64,
}

impl HostState {
    fn add_window(&mut self, url: Url) -> WindowClient {
        self.next_id += 1;
        for window in &mut self.windows {
            window.focused = false;
        }
        let window = WindowClient {
            id: format!("window-{}", self.next_id),
            url,
            focused: true,
            controller: self.controller.clone(),
        };
        self.windows.push(window.clone());
        if self.windows.len() > MAX_WINDOWS {
            self.windows.remove(0);
        }
        window
    }
}

/// In-process host.
#[derive(Debug, Default)]
pub struct LocalHost {
    state: RwLock<HostState>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a page was navigated to and return its client.
    ///
    /// A navigation to a URL already open reuses that window.
    pub async fn record_navigation(&self, url: &Url) -> WindowClient {
        let mut state = self.state.write().await;
        if let Some(pos) = state.windows.iter().position(|w| &w.url == url) {
            let mut window = state.windows.remove(pos);
            for other in &mut state.windows {
                other.focused = false;
            }
            window.focused = true;
            window.controller = state.controller.clone();
            state.windows.push(window.clone());
            return window;
        }
        state.add_window(url.clone())
    }

    /// Notifications currently shown, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    /// Version currently controlling new and claimed clients.
    pub async fn controller(&self) -> Option<String> {
        self.state.read().await.controller.clone()
    }
}

#[async_trait]
impl WorkerHost for LocalHost {
    async fn claim_clients(&self, version: &str) -> Result<usize, Error> {
        let mut state = self.state.write().await;
        state.controller = Some(version.to_string());
        for window in &mut state.windows {
            window.controller = Some(version.to_string());
        }
        tracing::debug!(version, clients = state.windows.len(), "claimed clients");
        Ok(state.windows.len())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.state.read().await.windows.clone())
    }

    async fn focus(&self, client_id: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let Some(pos) = state.windows.iter().position(|w| w.id == client_id) else {
            return Err(Error::InvalidInput(format!("no window client {client_id}")));
        };
        let mut window = state.windows.remove(pos);
        for other in &mut state.windows {
            other.focused = false;
        }
        window.focused = true;
        tracing::info!(client = %window.id, url = %window.url, "focused window");
        state.windows.push(window);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<WindowClient, Error> {
        let window = self.state.write().await.add_window(url.clone());
        tracing::info!(client = %window.id, %url, "opened window");
        Ok(window)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, url = %notification.data.url, "showing notification");
        let mut state = self.state.write().await;
        state.notifications.push(notification.clone());
        if state.notifications.len() > MAX_NOTIFICATIONS {
            state.notifications.remove(0);
        }
        Ok(())
    }

    async fn close_notification(&self, notification: &Notification) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state.notifications.retain(|shown| shown != notification);
        tracing::debug!(title = %notification.title, closed = before - state.notifications.len(), "closed notification");
        Ok(())
    }
}
