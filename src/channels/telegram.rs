//! Telegram Bot API client.
//!
//! Implements [`ChatSender`] over `sendMessage` and exposes `getUpdates`
//! long-polling for the bot loop in [`crate::bot`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ChatSender;
use crate::domain::ChatId;
use crate::error::DeliveryError;

/// Extra time granted to a long-poll request beyond the server-side wait.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Thin async client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Creates a client for the bot identified by `token`.
    #[must_use]
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// Long-polls for updates with IDs at or above `offset`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the request fails or Telegram answers
    /// with `ok: false`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, DeliveryError> {
        let response = self
            .client
            .get(format!(
                "{}?offset={offset}&timeout={}",
                self.method_url("getUpdates"),
                timeout.as_secs()
            ))
            .timeout(timeout + POLL_GRACE)
            .send()
            .await
            .map_err(transport_error)?;

        Self::unwrap_response(response).await
    }

    /// Sends a plain-text message to `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the request fails or Telegram answers
    /// with `ok: false`.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(transport_error)?;

        let _: serde_json::Value = Self::unwrap_response(response).await?;
        Ok(())
    }

    async fn unwrap_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DeliveryError> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| {
            DeliveryError::Rejected(format!("telegram returned {status}: {body}"))
        })?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => {
                let reason = description.unwrap_or_else(|| status.to_string());
                warn!(status = %status, reason = %reason, "telegram request failed");
                Err(DeliveryError::Rejected(reason))
            }
        }
    }
}

/// Strips the request URL, which embeds the bot token, from a transport error.
fn transport_error(err: reqwest::Error) -> DeliveryError {
    DeliveryError::Http(err.without_url())
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        debug!(chat_id, "sending telegram message");
        self.send_message(chat_id, text).await
    }
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// One incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier; the next poll offset is this plus one.
    pub update_id: i64,
    /// New incoming message, if this update carries one.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

/// Incoming chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Conversation the message belongs to.
    pub chat: Chat,
    /// Text content; absent for stickers, photos and the like.
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: ChatId,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_message_posts_chat_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(json!({"chat_id": 100, "text": "hola"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"message_id": 1}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "test-token");
        assert!(client.send_text(100, "hola").await.is_ok());
    }

    #[tokio::test]
    async fn rejected_message_reports_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(
                json!({"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}),
            ))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "test-token");
        let Err(DeliveryError::Rejected(reason)) = client.send_text(100, "hola").await else {
            panic!("expected rejection");
        };
        assert!(reason.contains("blocked"));
    }

    #[tokio::test]
    async fn get_updates_parses_text_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 55, "type": "private"}, "text": "/registrar"}},
                    {"update_id": 11, "edited_message": {"message_id": 1}}
                ]
            })))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "test-token");
        let Ok(updates) = client.get_updates(0, Duration::from_secs(0)).await else {
            panic!("expected updates");
        };
        assert_eq!(updates.len(), 2);
        let Some(Update {
            update_id: 10,
            message: Some(message),
        }) = updates.first()
        else {
            panic!("expected first update with a message");
        };
        assert_eq!(message.chat.id, 55);
        assert_eq!(message.text.as_deref(), Some("/registrar"));
        assert!(updates.get(1).is_some_and(|u| u.message.is_none()));
    }

    #[tokio::test]
    async fn transport_error_hides_token() {
        let client = TelegramClient::new("http://127.0.0.1:9", "123456:SECRET-TOKEN");

        let Err(err) = client.send_text(100, "hola").await else {
            panic!("nothing listens on the discard port");
        };
        assert!(matches!(err, DeliveryError::Http(_)));
        assert!(!err.to_string().contains("SECRET-TOKEN"));

        let Err(err) = client.get_updates(0, Duration::from_secs(0)).await else {
            panic!("nothing listens on the discard port");
        };
        assert!(!err.to_string().contains("SECRET-TOKEN"));
    }

    #[test]
    fn debug_redacts_token() {
        let client = TelegramClient::new("https://api.telegram.org/", "secret");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("https://api.telegram.org"));
    }
}
