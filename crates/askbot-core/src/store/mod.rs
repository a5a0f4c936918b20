pub mod memory;

#[cfg(feature = "mongodb-backend")]
pub mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::Sender;

/// Collection holding one profile per conversation.
pub const USERS: &str = "users";
/// Append-only log of text exchanges.
pub const CHAT_HISTORY: &str = "chat_history";
/// Append-only log of described images.
pub const FILE_METADATA: &str = "file_metadata";

/// User profile, keyed by chat id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub chat_id: i64,
    pub first_name: String,
    pub username: Option<String>,
    pub phone_number: Option<String>,
}

/// Identity fields refreshed on every `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub chat_id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl ProfileSnapshot {
    pub fn from_sender(chat_id: i64, sender: &Sender) -> Self {
        Self {
            chat_id,
            first_name: sender.first_name.clone(),
            username: sender.username.clone(),
        }
    }
}

/// One text exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub user_input: String,
    pub bot_response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(chat_id: i64, user_input: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            chat_id,
            user_input: user_input.into(),
            bot_response: bot_response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One described image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub chat_id: i64,
    pub filename: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl MediaRecord {
    pub fn new(chat_id: i64, filename: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            chat_id,
            filename: filename.into(),
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Trait for document storage backends.
///
/// Profile writes are idempotent upserts keyed on `chat_id`; record writes
/// are plain appends with no uniqueness constraint.
#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Check connectivity.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert or refresh name/handle. A known phone number is left untouched.
    async fn upsert_profile(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError>;

    /// Set the phone number, creating the profile if needed.
    async fn set_phone_number(&self, chat_id: i64, phone_number: &str) -> Result<(), StoreError>;

    /// Append a text exchange.
    async fn insert_chat(&self, record: &ChatRecord) -> Result<(), StoreError>;

    /// Append an image description.
    async fn insert_media(&self, record: &MediaRecord) -> Result<(), StoreError>;
}
