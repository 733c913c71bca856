//! `getUpdates` polling loop and per-update handling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::ChatSender;
use crate::channels::telegram::{TelegramClient, Update};
use crate::domain::ChatId;
use crate::service::{ChatInput, RegistrationService};

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Handles a single update: runs the conversation step and sends the reply.
///
/// Updates without a text message are ignored. A failed reply is logged
/// and dropped; the conversation state has already advanced.
pub async fn handle_update(update: Update, registration: &RegistrationService, chat: &dyn ChatSender) {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "ignoring non-message update");
        return;
    };
    let Some(text) = message.text else {
        debug!(update_id = update.update_id, "ignoring message without text");
        return;
    };

    let chat_id = message.chat.id;
    let reply = registration.handle(chat_id, ChatInput::parse(&text)).await;
    if let Err(e) = chat.send_text(chat_id, &reply).await {
        warn!(chat_id, error = %e, "failed to send bot reply");
    }
}

/// Polls Telegram forever, spawning one task per received update.
///
/// The offset always moves past the highest update seen, so an update is
/// handed out at most once. Updates from the same chat are handled in the
/// order Telegram delivered them: each chat's task waits for that chat's
/// previous task before running. Poll failures are logged and retried
/// after a short pause.
pub async fn run_bot(
    client: Arc<TelegramClient>,
    registration: Arc<RegistrationService>,
    chat: Arc<dyn ChatSender>,
    poll_timeout: Duration,
) {
    info!(poll_timeout_secs = poll_timeout.as_secs(), "telegram bot polling started");
    let mut offset = 0_i64;
    let mut in_flight: HashMap<ChatId, JoinHandle<()>> = HashMap::new();

    loop {
        match client.get_updates(offset, poll_timeout).await {
            Ok(updates) => {
                in_flight.retain(|_, task| !task.is_finished());
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(chat_id) = update.message.as_ref().map(|m| m.chat.id) else {
                        debug!(update_id = update.update_id, "ignoring non-message update");
                        continue;
                    };

                    let previous = in_flight.remove(&chat_id);
                    let registration = Arc::clone(&registration);
                    let chat = Arc::clone(&chat);
                    let task = tokio::spawn(async move {
                        if let Some(previous) = previous {
                            let _ = previous.await;
                        }
                        handle_update(update, &registration, chat.as_ref()).await;
                    });
                    in_flight.insert(chat_id, task);
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to poll telegram updates");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
