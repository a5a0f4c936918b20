use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::TelegramConfig;
use crate::error::ChannelError;
use crate::types::{
    DownloadedFile, EventPayload, FileRef, InboundEvent, OutboundMessage, ReplyMarkup, Sender,
};
use crate::util::{file_basename, http, truncate_string};

use super::{is_allowed, Channel, Messenger};

/// Long-poll window passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;
/// Extra time a `getUpdates` request may take beyond the long-poll window.
const POLL_GRACE_SECS: u64 = 15;
/// Pause after a failed poll before trying again.
const POLL_BACKOFF_SECS: u64 = 5;

// ====== Bot API Types ======

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ChannelError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ChannelError::Api(
                self.description.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}

/// Telegram Update object (subset).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

/// Telegram Message object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<TelegramEntity>,
    pub contact: Option<TelegramContact>,
    #[serde(default)]
    pub photo: Vec<TelegramPhotoSize>,
}

/// Telegram Chat object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

/// Telegram User object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

/// Telegram MessageEntity object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
}

/// Telegram Contact object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramContact {
    pub phone_number: String,
    pub first_name: String,
    pub user_id: Option<i64>,
}

/// Telegram PhotoSize object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramPhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// Telegram File object returned by `getFile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_path: Option<String>,
}

impl TelegramMessage {
    fn is_command(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.kind == "bot_command" && e.offset == 0)
    }

    /// Classify the message body into a transport-neutral payload.
    ///
    /// `bot_username` is this bot's own username, used to ignore commands
    /// addressed to another bot (`/start@other_bot`).
    fn payload(&self, bot_username: Option<&str>) -> EventPayload {
        if let Some(text) = self.text.as_deref() {
            if self.is_command() {
                return parse_command(text, bot_username);
            }
        }
        if let Some(contact) = &self.contact {
            return EventPayload::Contact {
                phone_number: contact.phone_number.clone(),
            };
        }
        if !self.photo.is_empty() {
            return EventPayload::Photo {
                sizes: self
                    .photo
                    .iter()
                    .map(|p| FileRef {
                        file_id: p.file_id.clone(),
                    })
                    .collect(),
            };
        }
        match &self.text {
            Some(text) => EventPayload::Text(text.clone()),
            None => EventPayload::Unsupported,
        }
    }
}

/// Split `/cmd@bot arg1 arg2` into name and arguments.
///
/// A command addressed to a different bot is `Unsupported`. Without a known
/// own username every `@` suffix is accepted.
fn parse_command(text: &str, bot_username: Option<&str>) -> EventPayload {
    let mut tokens = text.split_whitespace();
    let head = tokens.next().unwrap_or("").trim_start_matches('/');
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };

    if let (Some(target), Some(own)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(own) {
            return EventPayload::Unsupported;
        }
    }

    EventPayload::Command {
        name: name.to_lowercase(),
        args: tokens.map(String::from).collect(),
    }
}

impl TelegramUpdate {
    /// Convert into an inbound event. Updates without a message or sender are skipped.
    pub fn into_event(self, bot_username: Option<&str>) -> Option<InboundEvent> {
        let message = self.message?;
        let from = message.from.as_ref()?;
        let sender = Sender {
            id: from.id,
            first_name: from.first_name.clone(),
            username: from.username.clone(),
        };
        let payload = message.payload(bot_username);
        let mut event = InboundEvent::new(message.chat.id, sender, payload);
        event.update_id = self.update_id;
        Some(event)
    }
}

// ====== API Client ======

/// Thin client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramApi {
    token: String,
    api_base: String,
}

impl TelegramApi {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(config.token.clone(), config.api_base.clone())
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    fn request(&self, method: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        http::client().post(self.api_url(method)).json(body)
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ChannelError> {
        let response: ApiResponse<T> = request.send().await?.json().await?;
        response.into_result()
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        Self::execute(self.request(method, body)).await
    }

    fn updates_request(&self, offset: i64) -> reqwest::RequestBuilder {
        let body = json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });
        self.request("getUpdates", &body)
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + POLL_GRACE_SECS))
    }

    /// Long-poll for raw updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<serde_json::Value>, ChannelError> {
        Self::execute(self.updates_request(offset)).await
    }

    /// Identity of the bot owning the token.
    pub async fn get_me(&self) -> Result<TelegramUser, ChannelError> {
        self.call("getMe", &json!({})).await
    }

    /// Resolve a file id into a downloadable path.
    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile, ChannelError> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    fn message_body(msg: &OutboundMessage) -> serde_json::Value {
        let mut body = json!({
            "chat_id": msg.chat_id,
            "text": msg.text,
        });
        if let Some(ReplyMarkup::RequestContact { label }) = &msg.reply_markup {
            body["reply_markup"] = json!({
                "keyboard": [[{"text": label, "request_contact": true}]],
                "resize_keyboard": true,
            });
        }
        body
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let _: serde_json::Value = self.call("sendMessage", &Self::message_body(msg)).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, ChannelError> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| ChannelError::Api(format!("file {} has no download path", file_id)))?;

        let response = http::client().get(self.file_url(&path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Api(format!(
                "file download returned {}",
                status
            )));
        }
        let bytes = response.bytes().await?;

        let file_name = match file_basename(&path) {
            "" => file_id.to_string(),
            name => name.to_string(),
        };
        Ok(DownloadedFile {
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

// ====== Channel Implementation ======

/// Telegram channel using Bot API polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    api: TelegramApi,
    bot_username: Option<String>,
    inbound_tx: mpsc::Sender<InboundEvent>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, inbound_tx: mpsc::Sender<InboundEvent>) -> Self {
        let api = TelegramApi::from_config(&config);
        Self {
            config,
            api,
            bot_username: None,
            inbound_tx,
        }
    }

    /// Parse a raw update, apply the allow list, and forward it.
    ///
    /// Returns `false` once the receiving side has shut down.
    async fn handle_update(&self, update: serde_json::Value) -> bool {
        let update: TelegramUpdate = match serde_json::from_value(update) {
            Ok(u) => u,
            Err(e) => {
                warn!("Skipping unparseable Telegram update: {}", e);
                return true;
            }
        };

        let event = match update.into_event(self.bot_username.as_deref()) {
            Some(event) => event,
            None => return true,
        };

        let sender_id = event.sender.allow_key();
        if !is_allowed(&sender_id, &self.config.allow_from) {
            warn!("Access denied for sender {} on telegram", sender_id);
            return true;
        }

        if let EventPayload::Text(text) = &event.payload {
            debug!("Telegram message from {}: {}", sender_id, truncate_string(text, 50, "..."));
        } else {
            debug!("Telegram {} event from {}", event.payload.kind(), sender_id);
        }

        self.inbound_tx.send(event).await.is_ok()
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&mut self) -> anyhow::Result<()> {
        if self.config.token.is_empty() {
            return Err(ChannelError::NoToken.into());
        }

        match self.api.get_me().await {
            Ok(me) => {
                info!(
                    "Starting Telegram bot @{} (polling mode)...",
                    me.username.as_deref().unwrap_or("?")
                );
                self.bot_username = me.username;
            }
            Err(e) => {
                warn!("getMe failed, commands for other bots will not be filtered: {}", e);
                info!("Starting Telegram bot (polling mode)...");
            }
        }

        let mut offset: i64 = 0;
        loop {
            match self.api.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        if let Some(id) = update.get("update_id").and_then(|v| v.as_i64()) {
                            offset = id + 1;
                        }
                        if !self.handle_update(update).await {
                            info!("Event receiver closed, stopping Telegram polling");
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    error!("Telegram polling error: {}", e);
                    tokio::time::sleep(Duration::from_secs(POLL_BACKOFF_SECS)).await;
                }
            }
        }
    }
}
