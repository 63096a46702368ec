//! Push notifications for job alerts.
//!
//! A push carries `{title, body, url?}`. It becomes a notification with a
//! `view` and a `close` action. Clicking `view` (or the notification body)
//! focuses a window already showing the target URL, or opens one.

use serde::{Deserialize, Serialize};
use url::Url;

use laojobs_core::Error;

use super::host::WindowClient;

pub const NOTIFICATION_ICON: &str = "/static/images/icon-192.png";
pub const NOTIFICATION_BADGE: &str = "/static/images/badge-72.png";
pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

pub const ACTION_VIEW: &str = "view";
pub const ACTION_CLOSE: &str = "close";

/// Body of a push message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(data).map_err(|e| Error::InvalidInput(format!("push payload: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

/// A notification as handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn from_payload(payload: PushPayload) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData { url: payload.url.unwrap_or_else(|| "/".to_string()) },
            actions: vec![
                NotificationAction { action: ACTION_VIEW.into(), title: "ເບິ່ງ".into() },
                NotificationAction { action: ACTION_CLOSE.into(), title: "ປິດ".into() },
            ],
        }
    }
}

/// What a notification click should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "lowercase")]
pub enum ClickDecision {
    /// Focus the existing window with this id.
    Focus(String),
    /// Open a new window at this URL.
    Open(Url),
    /// Nothing beyond closing the notification.
    Dismiss,
}

/// Decide how to handle a click on a notification pointing at `target`.
///
/// `action` is `None` when the notification body itself was clicked.
pub fn resolve_click(action: Option<&str>, target: &Url, windows: &[WindowClient]) -> ClickDecision {
    match action {
        None | Some(ACTION_VIEW) => {}
        Some(_) => return ClickDecision::Dismiss,
    }

    match windows.iter().find(|w| &w.url == target) {
        Some(window) => ClickDecision::Focus(window.id.clone()),
        None => ClickDecision::Open(target.clone()),
    }
}
