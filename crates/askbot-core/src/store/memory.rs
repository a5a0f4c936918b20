use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;

use super::{ChatRecord, MediaRecord, ProfileSnapshot, Store, UserProfile, CHAT_HISTORY, FILE_METADATA};

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<i64, UserProfile>,
    chats: Mutex<Vec<ChatRecord>>,
    media: Mutex<Vec<MediaRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, chat_id: i64) -> Option<UserProfile> {
        self.users.get(&chat_id).map(|entry| entry.value().clone())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn chat_records(&self) -> Vec<ChatRecord> {
        self.chats.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn media_records(&self) -> Vec<MediaRecord> {
        self.media.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_profile(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.users
            .entry(snapshot.chat_id)
            .and_modify(|p| {
                p.first_name = snapshot.first_name.clone();
                p.username = snapshot.username.clone();
            })
            .or_insert_with(|| UserProfile {
                chat_id: snapshot.chat_id,
                first_name: snapshot.first_name.clone(),
                username: snapshot.username.clone(),
                phone_number: None,
            });
        Ok(())
    }

    async fn set_phone_number(&self, chat_id: i64, phone_number: &str) -> Result<(), StoreError> {
        self.users
            .entry(chat_id)
            .and_modify(|p| p.phone_number = Some(phone_number.to_string()))
            .or_insert_with(|| UserProfile {
                chat_id,
                first_name: String::new(),
                username: None,
                phone_number: Some(phone_number.to_string()),
            });
        Ok(())
    }

    async fn insert_chat(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.chats
            .lock()
            .map_err(|e| StoreError::Write {
                collection: CHAT_HISTORY,
                message: e.to_string(),
            })?
            .push(record.clone());
        Ok(())
    }

    async fn insert_media(&self, record: &MediaRecord) -> Result<(), StoreError> {
        self.media
            .lock()
            .map_err(|e| StoreError::Write {
                collection: FILE_METADATA,
                message: e.to_string(),
            })?
            .push(record.clone());
        Ok(())
    }
}
