//! JSON webhook notifiers (Slack, Teams, Discord).
//!
//! All three accept `POST {"text": "<message>"}`. Discord is reached
//! through its Slack-compatible endpoint, `<webhook_url>/slack`.

use std::sync::{Arc, OnceLock};

use alertik_core::BoxFuture;
use alertik_core::config::{NotifierKind, NotifiersConfig};
use alertik_core::error::{ConfigError, NotifyError};
use serde_json::json;

use super::Notifier;
use super::transport::HttpTransport;

/// Generic JSON webhook notifier
pub struct WebhookNotifier {
    kind: NotifierKind,
    /// appended to the configured URL
    url_suffix: &'static str,
    transport: Arc<dyn HttpTransport>,
    url: OnceLock<String>,
}

impl WebhookNotifier {
    pub fn slack(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_kind(NotifierKind::Slack, "", transport)
    }

    pub fn teams(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_kind(NotifierKind::Teams, "", transport)
    }

    pub fn discord(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_kind(NotifierKind::Discord, "/slack", transport)
    }

    fn with_kind(
        kind: NotifierKind,
        url_suffix: &'static str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            kind,
            url_suffix,
            transport,
            url: OnceLock::new(),
        }
    }

    fn configured_url(&self, config: &NotifiersConfig) -> (Option<String>, &'static str) {
        match self.kind {
            NotifierKind::Slack => (config.slack_webhook_url.clone(), "SLACK_WEBHOOK_URL"),
            NotifierKind::Teams => (config.teams_webhook_url.clone(), "TEAMS_WEBHOOK_URL"),
            NotifierKind::Discord => (config.discord_webhook_url.clone(), "DISCORD_WEBHOOK_URL"),
            NotifierKind::Telegram => (None, "TELEGRAM_BOT_TOKEN"),
        }
    }

    /// Effective endpoint, once set up.
    pub fn endpoint(&self) -> Option<&str> {
        self.url.get().map(String::as_str)
    }
}

impl Notifier for WebhookNotifier {
    fn kind(&self) -> NotifierKind {
        self.kind
    }

    fn setup(&self, config: &NotifiersConfig) -> Result<(), ConfigError> {
        if self.url.get().is_some() {
            return Ok(());
        }

        let (url, key) = self.configured_url(config);
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return Err(ConfigError::MissingCredentials {
                notifier: self.kind.to_string(),
                keys: vec![key],
            });
        };

        let _ = self.url.set(format!("{url}{}", self.url_suffix));
        Ok(())
    }

    fn is_set_up(&self) -> bool {
        self.url.get().is_some()
    }

    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let url = self.url.get().ok_or_else(|| NotifyError::NotSetUp {
                notifier: self.kind.to_string(),
            })?;

            let body = json!({ "text": message });
            let status = self
                .transport
                .post_json(url, &body)
                .await
                .map_err(|e| NotifyError::Transport {
                    notifier: self.kind.to_string(),
                    reason: e.to_string(),
                })?;
            super::check_status(self.kind, status)
        })
    }
}
