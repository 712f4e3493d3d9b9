//! Notifier dispatch -- outbound alert channels.
//!
//! Every back-end implements [`Notifier`]: a one-time `setup` that reads
//! its credentials (fatal when absent) and a per-message `send`.
//! [`NotifierSet`] is the fixed table of the four back-ends, indexed by
//! [`NotifierKind`].
//!
//! - [`telegram`]: Bot API `sendMessage` (GET)
//! - [`webhook`]: Slack / Teams / Discord JSON webhooks (POST)
//! - [`transport`]: HTTP seam and its `reqwest` implementation

pub mod telegram;
pub mod transport;
pub mod webhook;

pub use telegram::TelegramNotifier;
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
pub use webhook::WebhookNotifier;

use std::sync::Arc;
use std::time::Duration;

use alertik_core::BoxFuture;
use alertik_core::config::{DispatchConfig, NotifierKind, NotifiersConfig};
use alertik_core::error::{ConfigError, NotifyError};
use tracing::{info, warn};

use crate::error::RelayError;

/// Outbound alert channel
pub trait Notifier: Send + Sync {
    fn kind(&self) -> NotifierKind;

    /// Reads and validates credentials. Calls after the first success are
    /// no-ops.
    fn setup(&self, config: &NotifiersConfig) -> Result<(), ConfigError>;

    fn is_set_up(&self) -> bool;

    /// Delivers one message. Non-2xx responses are errors.
    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Maps an HTTP status to a send result.
pub(crate) fn check_status(kind: NotifierKind, status: u16) -> Result<(), NotifyError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(NotifyError::Status {
            notifier: kind.to_string(),
            status,
        })
    }
}

/// Fixed table of notifiers
pub struct NotifierSet {
    notifiers: [Box<dyn Notifier>; 4],
}

impl NotifierSet {
    /// Builds all four back-ends on a shared transport.
    pub fn new(transport: Arc<dyn HttpTransport>, telegram_api_url: &str) -> Self {
        Self::from_notifiers([
            Box::new(TelegramNotifier::new(telegram_api_url, Arc::clone(&transport))),
            Box::new(WebhookNotifier::slack(Arc::clone(&transport))),
            Box::new(WebhookNotifier::teams(Arc::clone(&transport))),
            Box::new(WebhookNotifier::discord(transport)),
        ])
    }

    /// Builds the table with a `reqwest` transport.
    pub fn from_config(dispatch: &DispatchConfig) -> Result<Self, RelayError> {
        let transport =
            ReqwestTransport::new(Duration::from_secs(dispatch.http_timeout_secs))?;
        Ok(Self::new(Arc::new(transport), &dispatch.telegram_api_url))
    }

    /// Uses custom notifiers; slot `i` must hold `NotifierKind::ALL[i]`.
    pub fn from_notifiers(notifiers: [Box<dyn Notifier>; 4]) -> Self {
        debug_assert!(
            notifiers
                .iter()
                .zip(NotifierKind::ALL)
                .all(|(n, kind)| n.kind() == kind)
        );
        Self { notifiers }
    }

    pub fn get(&self, kind: NotifierKind) -> &dyn Notifier {
        self.notifiers[kind.index()].as_ref()
    }

    /// Sets up each notifier in `kinds`; the first failure is returned.
    pub fn setup(&self, kinds: &[NotifierKind], config: &NotifiersConfig) -> Result<(), ConfigError> {
        for &kind in kinds {
            self.get(kind).setup(config)?;
            info!(notifier = %kind, "notifier ready");
        }
        Ok(())
    }

    /// Sends `message` through `kind`, logging failures.
    pub async fn send(&self, kind: NotifierKind, message: &str) -> Result<(), NotifyError> {
        let result = self.get(kind).send(message).await;
        if let Err(e) = &result {
            warn!(notifier = %kind, error = %e, "unable to send the notification");
        }
        result
    }
}
