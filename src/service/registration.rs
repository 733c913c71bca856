//! Device registration conversation driven by chat messages.
//!
//! A flat two-state machine per chat: `Idle` and `AwaitingSerial`. The
//! register command moves a chat to `AwaitingSerial`; a serial that links
//! successfully moves it back to `Idle`. An unknown serial keeps the chat
//! waiting so the user can simply try another one.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{ChatId, ConversationState, ConversationTable, DeviceSerial};
use crate::error::GatewayError;
use crate::persistence::{DeviceDirectory, ReadingStore};

/// Reply to the start command.
pub const WELCOME_TEXT: &str = "¡Bienvenido! Para registrar tu ESP32, usa uno de los siguientes comandos:\n\n\
     /registrar - Registrar un nuevo producto ESP32\n\
     /ultimaalerta - Ver la última alerta de tu sensor";

/// Reply to the register command.
pub const SERIAL_PROMPT_TEXT: &str = "Por favor, ingresa el número de serial de tu ESP32:";

/// Reply after a successful link.
pub const LINKED_TEXT: &str =
    "¡ESP32 registrado exitosamente! Recibirás alertas cuando se detecte humo o fuego.";

/// Reply when the serial is unknown; the chat keeps waiting.
pub const RETRY_SERIAL_TEXT: &str =
    "El número de serial no es válido. Por favor, verifica e intenta nuevamente.";

/// Reply to free text outside a registration.
pub const HELP_POINTER_TEXT: &str = "Por favor, usa /start para ver los comandos disponibles.";

/// Reply when a pending serial prompt has expired.
pub const EXPIRED_TEXT: &str =
    "El registro expiró. Usa /registrar para ingresar el serial nuevamente.";

/// Reply to the last-reading command for a chat without devices.
pub const NO_DEVICE_TEXT: &str = "No tienes ningún ESP32 registrado. Por favor, usa /registrar primero para vincular tu dispositivo.";

/// Reply to the last-reading command when nothing was stored yet.
pub const NO_READINGS_TEXT: &str = "No se encontraron lecturas para tu ESP32.";

/// A chat message interpreted as a command or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// `/start`: reset and show help.
    Start,
    /// `/registrar` or `/register`: ask for a serial.
    Register,
    /// `/ultimaalerta` or `/last_reading`: show the latest stored reading.
    LastReading,
    /// Anything else, including unknown commands.
    Text(String),
}

impl ChatInput {
    /// Interprets a raw message. A `@botname` suffix on commands is ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some(command) = trimmed
            .split_whitespace()
            .next()
            .filter(|word| word.starts_with('/'))
        else {
            return Self::Text(trimmed.to_string());
        };
        let name = command.split('@').next().unwrap_or(command);
        match name.to_lowercase().as_str() {
            "/start" => Self::Start,
            "/registrar" | "/register" => Self::Register,
            "/ultimaalerta" | "/last_reading" => Self::LastReading,
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

/// Drives the registration conversation for every chat.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    directory: Arc<dyn DeviceDirectory>,
    readings: Arc<dyn ReadingStore>,
    conversations: Arc<ConversationTable>,
    awaiting_timeout: Option<Duration>,
}

impl RegistrationService {
    /// Creates a new `RegistrationService`.
    ///
    /// `awaiting_timeout` bounds how long a serial prompt stays open;
    /// `None` keeps it open until the chat answers.
    #[must_use]
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        readings: Arc<dyn ReadingStore>,
        awaiting_timeout: Option<Duration>,
    ) -> Self {
        Self {
            directory,
            readings,
            conversations: Arc::new(ConversationTable::new()),
            awaiting_timeout,
        }
    }

    /// Returns a reference to the inner [`ConversationTable`].
    #[must_use]
    pub fn conversations(&self) -> &Arc<ConversationTable> {
        &self.conversations
    }

    /// Handles one chat event and returns the reply text.
    ///
    /// The chat's state lock is held for the whole event, so concurrent
    /// events for the same chat apply one after the other. Chats left
    /// `Idle` are dropped from the table afterwards.
    pub async fn handle(&self, chat_id: ChatId, input: ChatInput) -> String {
        let entry = self.conversations.entry(chat_id).await;
        let reply = {
            let mut state = entry.lock().await;
            self.step(chat_id, &mut state, input).await
        };
        drop(entry);
        self.conversations.evict_if_idle(chat_id).await;
        reply
    }

    async fn step(
        &self,
        chat_id: ChatId,
        state: &mut ConversationState,
        input: ChatInput,
    ) -> String {
        match input {
            ChatInput::Start => {
                *state = ConversationState::Idle;
                WELCOME_TEXT.to_string()
            }
            ChatInput::Register => {
                *state = ConversationState::AwaitingSerial {
                    since: Instant::now(),
                };
                debug!(chat_id, "awaiting serial");
                SERIAL_PROMPT_TEXT.to_string()
            }
            ChatInput::LastReading => self.last_reading(chat_id).await,
            ChatInput::Text(text) => {
                if state.is_expired(self.awaiting_timeout) {
                    *state = ConversationState::Idle;
                    debug!(chat_id, "serial prompt expired");
                    return EXPIRED_TEXT.to_string();
                }
                if !state.is_awaiting_serial() {
                    return HELP_POINTER_TEXT.to_string();
                }
                let serial = DeviceSerial::new(&text);
                if serial.is_empty() {
                    return RETRY_SERIAL_TEXT.to_string();
                }
                match self.directory.link_chat_to_device(chat_id, &serial).await {
                    Ok(_) => {
                        *state = ConversationState::Idle;
                        info!(chat_id, %serial, "chat linked to device");
                        LINKED_TEXT.to_string()
                    }
                    Err(GatewayError::LinkDeviceNotFound(_)) => {
                        debug!(chat_id, %serial, "unknown serial");
                        RETRY_SERIAL_TEXT.to_string()
                    }
                    Err(e) => {
                        warn!(chat_id, %serial, error = %e, "failed to link chat");
                        format!("Error: {e}")
                    }
                }
            }
        }
    }

    async fn last_reading(&self, chat_id: ChatId) -> String {
        let serial = match self.directory.get_device_serial_for_chat(chat_id).await {
            Ok(Some(serial)) => serial,
            Ok(None) => return NO_DEVICE_TEXT.to_string(),
            Err(e) => return format!("Error al obtener la última lectura: {e}"),
        };
        match self.readings.get_last_reading(&serial).await {
            Ok(Some(reading)) => format!(
                "Última lectura del sensor:\nFecha: {}\nEstado: {}",
                reading.activated_at, reading.state
            ),
            Ok(None) => NO_READINGS_TEXT.to_string(),
            Err(e) => format!("Error al obtener la última lectura: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::NewReading;
    use crate::persistence::memory::{MemoryDirectory, MemoryReadingStore};

    fn service_with(
        timeout: Option<Duration>,
    ) -> (Arc<MemoryDirectory>, Arc<MemoryReadingStore>, RegistrationService) {
        let directory = Arc::new(MemoryDirectory::new());
        let readings = Arc::new(MemoryReadingStore::new());
        let service = RegistrationService::new(
            Arc::clone(&directory) as Arc<dyn DeviceDirectory>,
            Arc::clone(&readings) as Arc<dyn ReadingStore>,
            timeout,
        );
        (directory, readings, service)
    }

    #[test]
    fn parse_recognizes_commands_and_aliases() {
        assert_eq!(ChatInput::parse("/start"), ChatInput::Start);
        assert_eq!(ChatInput::parse("/registrar"), ChatInput::Register);
        assert_eq!(ChatInput::parse("/register@alert_bot"), ChatInput::Register);
        assert_eq!(ChatInput::parse(" /ultimaalerta "), ChatInput::LastReading);
        assert_eq!(ChatInput::parse("/last_reading"), ChatInput::LastReading);
        assert_eq!(
            ChatInput::parse("/unknown"),
            ChatInput::Text("/unknown".to_string())
        );
        assert_eq!(
            ChatInput::parse("ABC123"),
            ChatInput::Text("ABC123".to_string())
        );
    }

    #[tokio::test]
    async fn start_resets_to_idle() {
        let (_, _, service) = service_with(None);
        let _ = service.handle(1, ChatInput::Register).await;
        let reply = service.handle(1, ChatInput::Start).await;
        assert_eq!(reply, WELCOME_TEXT);
        assert_eq!(
            service.conversations().state(1).await,
            ConversationState::Idle
        );
    }

    #[tokio::test]
    async fn text_while_idle_points_to_help() {
        let (directory, _, service) = service_with(None);
        directory.add_device("GOODSERIAL", None).await;

        let reply = service
            .handle(1, ChatInput::Text("GOODSERIAL".to_string()))
            .await;

        assert_eq!(reply, HELP_POINTER_TEXT);
        assert!(directory.links().await.is_empty());
    }

    #[tokio::test]
    async fn bad_then_good_serial_links_once() {
        let (directory, _, service) = service_with(None);
        directory.add_device("GOODSERIAL", None).await;

        assert_eq!(
            service.handle(55, ChatInput::Register).await,
            SERIAL_PROMPT_TEXT
        );

        let reply = service
            .handle(55, ChatInput::Text("BADSERIAL".to_string()))
            .await;
        assert_eq!(reply, RETRY_SERIAL_TEXT);
        assert!(service.conversations().state(55).await.is_awaiting_serial());

        let reply = service
            .handle(55, ChatInput::Text("GOODSERIAL".to_string()))
            .await;
        assert_eq!(reply, LINKED_TEXT);
        assert_eq!(
            service.conversations().state(55).await,
            ConversationState::Idle
        );

        let links = directory.links().await;
        assert_eq!(links.len(), 1);
        assert!(
            links
                .first()
                .is_some_and(|l| l.chat_id == 55 && l.serial.as_str() == "GOODSERIAL")
        );
    }

    #[tokio::test]
    async fn finished_conversations_leave_the_table() {
        let (directory, _, service) = service_with(None);
        directory.add_device("GOODSERIAL", None).await;

        let _ = service.handle(1, ChatInput::Start).await;
        let _ = service.handle(2, ChatInput::Text("hola".to_string())).await;
        let _ = service.handle(3, ChatInput::Register).await;
        assert_eq!(service.conversations().len().await, 1);

        let _ = service
            .handle(3, ChatInput::Text("GOODSERIAL".to_string()))
            .await;
        assert!(service.conversations().is_empty().await);
    }

    #[tokio::test]
    async fn storage_error_keeps_chat_waiting() {
        let (directory, _, service) = service_with(None);
        let _ = service.handle(5, ChatInput::Register).await;
        directory.set_failing(true);

        let reply = service.handle(5, ChatInput::Text("ANY".to_string())).await;

        assert!(reply.starts_with("Error: "));
        assert!(service.conversations().state(5).await.is_awaiting_serial());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_prompt_returns_to_idle() {
        let (directory, _, service) = service_with(Some(Duration::from_secs(300)));
        directory.add_device("GOODSERIAL", None).await;
        let _ = service.handle(8, ChatInput::Register).await;

        tokio::time::advance(Duration::from_secs(301)).await;
        let reply = service
            .handle(8, ChatInput::Text("GOODSERIAL".to_string()))
            .await;

        assert_eq!(reply, EXPIRED_TEXT);
        assert_eq!(
            service.conversations().state(8).await,
            ConversationState::Idle
        );
        assert!(directory.links().await.is_empty());
    }

    #[tokio::test]
    async fn last_reading_reports_latest_value() {
        let (directory, readings, service) = service_with(None);
        assert_eq!(
            service.handle(3, ChatInput::LastReading).await,
            NO_DEVICE_TEXT
        );

        directory.add_device("ABC123", None).await;
        let _ = directory
            .link_chat_to_device(3, &DeviceSerial::from("ABC123"))
            .await;
        assert_eq!(
            service.handle(3, ChatInput::LastReading).await,
            NO_READINGS_TEXT
        );

        for state in ["1", "0"] {
            let _ = readings
                .save_reading(NewReading {
                    serial: DeviceSerial::from("ABC123"),
                    activated_at: "2024-05-01 10:00:00".to_string(),
                    state: state.to_string(),
                })
                .await;
        }
        let reply = service.handle(3, ChatInput::LastReading).await;
        assert!(reply.contains("Fecha: 2024-05-01 10:00:00"));
        assert!(reply.ends_with("Estado: 0"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_serials_for_one_chat_link_once() {
        let (directory, _, service) = service_with(None);
        directory.add_device("GOODSERIAL", None).await;
        let _ = service.handle(9, ChatInput::Register).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let service = service.clone();
            tasks.spawn(async move {
                service
                    .handle(9, ChatInput::Text("GOODSERIAL".to_string()))
                    .await
            });
        }
        let mut linked_replies = 0;
        while let Some(reply) = tasks.join_next().await {
            if reply.is_ok_and(|r| r == LINKED_TEXT) {
                linked_replies += 1;
            }
        }

        assert_eq!(linked_replies, 1);
        assert_eq!(directory.links().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_chats_end_in_their_own_last_state() {
        let (_, _, service) = service_with(None);

        let mut tasks = tokio::task::JoinSet::new();
        for chat_id in 0..64_i64 {
            let service = service.clone();
            tasks.spawn(async move {
                for round in 0..10 {
                    let input = if (chat_id + round) % 2 == 0 {
                        ChatInput::Register
                    } else {
                        ChatInput::Start
                    };
                    let _ = service.handle(chat_id, input).await;
                    tokio::task::yield_now().await;
                }
                // Last round is 9: odd chats end on Register, even on Start.
            });
        }
        while tasks.join_next().await.is_some() {}

        for chat_id in 0..64_i64 {
            let state = service.conversations().state(chat_id).await;
            assert_eq!(
                state.is_awaiting_serial(),
                chat_id % 2 == 1,
                "chat {chat_id}"
            );
        }
        assert_eq!(service.conversations().len().await, 32);
    }
}
