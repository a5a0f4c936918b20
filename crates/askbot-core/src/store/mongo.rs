use async_trait::async_trait;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::{Client, Collection};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::StoreError;

use super::{
    ChatRecord, MediaRecord, ProfileSnapshot, Store, CHAT_HISTORY, FILE_METADATA, USERS,
};

/// MongoDB-backed store.
///
/// The client is built on first use. A failed build (bad URI, SRV lookup
/// error) is retried on the next call; until one succeeds every operation
/// returns [`StoreError::Connection`].
pub struct MongoStore {
    uri: String,
    database: String,
    client: OnceCell<Client>,
}

impl MongoStore {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client, StoreError> {
        self.client
            .get_or_try_init(|| async {
                Client::with_uri_str(&self.uri)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))
            })
            .await
    }

    async fn collection(&self, name: &str) -> Result<Collection<Document>, StoreError> {
        let client = self.client().await?;
        Ok(client.database(&self.database).collection::<Document>(name))
    }

    fn write_error(collection: &'static str, e: mongodb::error::Error) -> StoreError {
        StoreError::Write {
            collection,
            message: e.to_string(),
        }
    }
}

fn optional_string(value: &Option<String>) -> Bson {
    match value {
        Some(v) => Bson::String(v.clone()),
        None => Bson::Null,
    }
}

fn bson_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(ts.timestamp_millis())
}

/// `$set` the identity fields; `phone_number` is only initialised on insert.
fn profile_update(snapshot: &ProfileSnapshot) -> Document {
    doc! {
        "$set": {
            "first_name": snapshot.first_name.as_str(),
            "username": optional_string(&snapshot.username),
            "chat_id": snapshot.chat_id,
        },
        "$setOnInsert": { "phone_number": Bson::Null },
    }
}

fn chat_document(record: &ChatRecord) -> Document {
    doc! {
        "chat_id": record.chat_id,
        "user_input": record.user_input.as_str(),
        "bot_response": record.bot_response.as_str(),
        "timestamp": bson_timestamp(&record.timestamp),
    }
}

fn media_document(record: &MediaRecord) -> Document {
    doc! {
        "chat_id": record.chat_id,
        "filename": record.filename.as_str(),
        "description": record.description.as_str(),
        "timestamp": bson_timestamp(&record.timestamp),
    }
}

#[async_trait]
impl Store for MongoStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client()
            .await?
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn upsert_profile(&self, snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        self.collection(USERS)
            .await?
            .update_one(doc! { "chat_id": snapshot.chat_id }, profile_update(snapshot))
            .upsert(true)
            .await
            .map_err(|e| Self::write_error(USERS, e))?;
        debug!("Upserted profile for chat {}", snapshot.chat_id);
        Ok(())
    }

    async fn set_phone_number(&self, chat_id: i64, phone_number: &str) -> Result<(), StoreError> {
        self.collection(USERS)
            .await?
            .update_one(
                doc! { "chat_id": chat_id },
                doc! { "$set": { "phone_number": phone_number } },
            )
            .upsert(true)
            .await
            .map_err(|e| Self::write_error(USERS, e))?;
        Ok(())
    }

    async fn insert_chat(&self, record: &ChatRecord) -> Result<(), StoreError> {
        self.collection(CHAT_HISTORY)
            .await?
            .insert_one(chat_document(record))
            .await
            .map_err(|e| Self::write_error(CHAT_HISTORY, e))?;
        Ok(())
    }

    async fn insert_media(&self, record: &MediaRecord) -> Result<(), StoreError> {
        self.collection(FILE_METADATA)
            .await?
            .insert_one(media_document(record))
            .await
            .map_err(|e| Self::write_error(FILE_METADATA, e))?;
        Ok(())
    }
}
