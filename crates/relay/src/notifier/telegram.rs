//! Telegram Bot API notifier.
//!
//! Sends `GET <api>/bot<token>/sendMessage?chat_id=<id>&text=<message>`,
//! with the chat id and message URL-escaped.

use std::sync::{Arc, OnceLock};

use alertik_core::BoxFuture;
use alertik_core::config::{NotifierKind, NotifiersConfig};
use alertik_core::error::{ConfigError, NotifyError};

use super::Notifier;
use super::transport::HttpTransport;

struct Credentials {
    bot_token: String,
    chat_id: String,
}

/// Telegram notifier
pub struct TelegramNotifier {
    api_url: String,
    transport: Arc<dyn HttpTransport>,
    credentials: OnceLock<Credentials>,
}

impl TelegramNotifier {
    pub fn new(api_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            transport,
            credentials: OnceLock::new(),
        }
    }

    fn request_url(&self, credentials: &Credentials, message: &str) -> String {
        format!(
            "{}/bot{}/sendMessage?chat_id={}&text={}",
            self.api_url,
            credentials.bot_token,
            urlencoding::encode(&credentials.chat_id),
            urlencoding::encode(message)
        )
    }
}

impl Notifier for TelegramNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Telegram
    }

    fn setup(&self, config: &NotifiersConfig) -> Result<(), ConfigError> {
        if self.credentials.get().is_some() {
            return Ok(());
        }

        let token = config.telegram_bot_token.as_deref().filter(|v| !v.is_empty());
        let chat_id = config.telegram_chat_id.as_deref().filter(|v| !v.is_empty());
        let (Some(bot_token), Some(chat_id)) = (token, chat_id) else {
            return Err(ConfigError::MissingCredentials {
                notifier: self.kind().to_string(),
                keys: vec!["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"],
            });
        };

        // a concurrent setup may have won; either value is equivalent
        let _ = self.credentials.set(Credentials {
            bot_token: bot_token.to_owned(),
            chat_id: chat_id.to_owned(),
        });
        Ok(())
    }

    fn is_set_up(&self) -> bool {
        self.credentials.get().is_some()
    }

    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let credentials = self.credentials.get().ok_or_else(|| NotifyError::NotSetUp {
                notifier: self.kind().to_string(),
            })?;

            let url = self.request_url(credentials, message);
            let status = self
                .transport
                .get(&url)
                .await
                .map_err(|e| NotifyError::Transport {
                    notifier: self.kind().to_string(),
                    reason: e.to_string(),
                })?;
            super::check_status(self.kind(), status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use crate::notifier::transport::ReqwestTransport;

    fn notifier(api_url: &str) -> TelegramNotifier {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        TelegramNotifier::new(api_url, Arc::new(transport))
    }

    fn credentials() -> NotifiersConfig {
        NotifiersConfig {
            telegram_bot_token: Some("123:abc".to_owned()),
            telegram_chat_id: Some("-1001".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn setup_requires_token_and_chat_id() {
        let n = notifier("http://localhost");
        let config = NotifiersConfig {
            telegram_bot_token: Some("123:abc".to_owned()),
            ..Default::default()
        };
        let err = n.setup(&config).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));
        assert!(!n.is_set_up());
    }

    #[test]
    fn setup_is_idempotent() {
        let n = notifier("http://localhost");
        n.setup(&credentials()).unwrap();
        // later calls keep the first credentials, even with an empty config
        n.setup(&NotifiersConfig::default()).unwrap();
        assert!(n.is_set_up());
    }

    #[tokio::test]
    async fn send_before_setup_fails() {
        let n = notifier("http://localhost");
        let err = n.send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotSetUp { .. }));
    }

    #[tokio::test]
    async fn send_escapes_message_in_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/bot123:abc/sendMessage".to_owned()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("chat_id".to_owned(), "-1001".to_owned()),
                Matcher::UrlEncoded("text".to_owned(), "a & b = c?, at: now".to_owned()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let n = notifier(&server.url());
        n.setup(&credentials()).unwrap();
        n.send("a & b = c?, at: now").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let n = notifier(&server.url());
        n.setup(&credentials()).unwrap();
        let err = n.send("hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 401, .. }));
    }

    #[test]
    fn request_url_shape() {
        let n = notifier("https://api.telegram.org/");
        let url = n.request_url(
            &Credentials {
                bot_token: "1:x".to_owned(),
                chat_id: "42".to_owned(),
            },
            "hello world",
        );
        assert_eq!(
            url,
            "https://api.telegram.org/bot1:x/sendMessage?chat_id=42&text=hello%20world"
        );
    }
}
