//! End-to-end routing tests with in-process fakes for every collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use askbot_core::channel::Messenger;
use askbot_core::error::{ChannelError, ProviderError, SearchError, StoreError};
use askbot_core::handler::media::DESCRIBE_INSTRUCTION;
use askbot_core::handler::search::SEARCH_FAILED;
use askbot_core::handler::user::{CONTACT_SAVED, SHARE_CONTACT_LABEL, WELCOME};
use askbot_core::handler::HandlerContext;
use askbot_core::provider::LlmProvider;
use askbot_core::router::{Router, GENERIC_FAILURE};
use askbot_core::search::{OrganicResult, SearchProvider, WebSearch};
use askbot_core::store::memory::MemoryStore;
use askbot_core::store::{ChatRecord, MediaRecord, ProfileSnapshot, Store};
use askbot_core::types::{
    DownloadedFile, EventPayload, FileRef, InboundEvent, OutboundMessage, ReplyMarkup, Sender,
};

// ====== Fakes ======

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<OutboundMessage>>,
    files: HashMap<String, DownloadedFile>,
}

impl RecordingMessenger {
    fn with_file(mut self, file_id: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.files.insert(
            file_id.to_string(),
            DownloadedFile {
                file_name: file_name.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        self
    }

    fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text)
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, ChannelError> {
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| ChannelError::Api(format!("Bad Request: invalid file_id {}", file_id)))
    }
}

/// Echoes prompts; any prompt containing "boom" fails.
#[derive(Default)]
struct ScriptedLlm {
    prompts: Mutex<Vec<String>>,
    images: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("boom") {
            return Err(ProviderError::Api {
                status: 500,
                message: "internal".into(),
            });
        }
        Ok(format!("echo: {}", prompt))
    }

    async fn describe_image(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ProviderError> {
        self.images
            .lock()
            .unwrap()
            .push((instruction.to_string(), image.len(), mime_type.to_string()));
        Ok("A cat sitting on a mat.".to_string())
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

/// Returns canned results for "rust"; nothing for anything else.
#[derive(Default)]
struct ScriptedSearch {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<Vec<OrganicResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if query == "rust" {
            let hit = |snippet: Option<&str>, link: &str| OrganicResult {
                    snippet: snippet.map(String::from),
                link: Some(link.to_string()),
            };
            return Ok(vec![
                hit(Some("Rust is a systems language."), "https://www.rust-lang.org"),
                hit(None, "https://doc.rust-lang.org/book"),
                hit(None, "https://crates.io"),
                hit(None, "https://example.com/fourth"),
            ]);
        }
        Err(SearchError::NoResults)
    }
}

/// Store whose database is unreachable.
struct UnreachableStore;

#[async_trait]
impl Store for UnreachableStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("server selection timeout".into()))
    }

    async fn upsert_profile(&self, _snapshot: &ProfileSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Connection("server selection timeout".into()))
    }

    async fn set_phone_number(&self, _chat_id: i64, _phone: &str) -> Result<(), StoreError> {
        Err(StoreError::Connection("server selection timeout".into()))
    }

    async fn insert_chat(&self, _record: &ChatRecord) -> Result<(), StoreError> {
        Err(StoreError::Connection("server selection timeout".into()))
    }

    async fn insert_media(&self, _record: &MediaRecord) -> Result<(), StoreError> {
        Err(StoreError::Connection("server selection timeout".into()))
    }
}

struct Harness {
    router: Router,
    store: Arc<MemoryStore>,
    llm: Arc<ScriptedLlm>,
    search: Arc<ScriptedSearch>,
    messenger: Arc<RecordingMessenger>,
}

fn harness_with(messenger: RecordingMessenger) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let llm = Arc::new(ScriptedLlm::default());
    let search = Arc::new(ScriptedSearch::default());
    let messenger = Arc::new(messenger);

    let ctx = HandlerContext::new(
        store.clone(),
        llm.clone(),
        WebSearch::new(search.clone(), llm.clone(), 3),
        messenger.clone(),
    );

    Harness {
        router: Router::new(ctx),
        store,
        llm,
        search,
        messenger,
    }
}

fn harness() -> Harness {
    harness_with(RecordingMessenger::default())
}

fn sender(id: i64, name: &str) -> Sender {
    Sender {
        id,
        first_name: name.to_string(),
        username: Some(name.to_lowercase()),
    }
}

fn event(chat_id: i64, payload: EventPayload) -> InboundEvent {
    InboundEvent::new(chat_id, sender(chat_id, "Ada"), payload)
}

fn command(chat_id: i64, name: &str, args: &[&str]) -> InboundEvent {
    event(
        chat_id,
        EventPayload::Command {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        },
    )
}

fn contact(chat_id: i64, phone: &str) -> InboundEvent {
    event(
        chat_id,
        EventPayload::Contact {
            phone_number: phone.to_string(),
        },
    )
}

fn text(chat_id: i64, body: &str) -> InboundEvent {
    event(chat_id, EventPayload::Text(body.to_string()))
}

// ====== User registry ======

#[tokio::test]
async fn start_registers_profile_and_requests_contact() {
    let h = harness();
    h.router.handle_event(&command(10, "start", &[])).await;

    let profile = h.store.profile(10).expect("profile created");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.username.as_deref(), Some("ada"));
    assert_eq!(profile.phone_number, None);

    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, WELCOME);
    assert_eq!(
        sent[0].reply_markup,
        Some(ReplyMarkup::RequestContact {
            label: SHARE_CONTACT_LABEL.to_string()
        })
    );
}

#[tokio::test]
async fn contact_after_start_sets_phone_number() {
    let h = harness();
    h.router.handle_event(&command(11, "start", &[])).await;
    h.router.handle_event(&contact(11, "+15550100")).await;

    let profile = h.store.profile(11).unwrap();
    assert_eq!(profile.phone_number.as_deref(), Some("+15550100"));
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(h.messenger.texts_for(11), vec![WELCOME, CONTACT_SAVED]);
}

#[tokio::test]
async fn repeated_start_keeps_known_phone_number() {
    let h = harness();
    h.router.handle_event(&command(12, "start", &[])).await;
    h.router.handle_event(&contact(12, "+4420000000")).await;

    let renamed = InboundEvent::new(
        12,
        sender(12, "Lovelace"),
        EventPayload::Command {
            name: "start".into(),
            args: vec![],
        },
    );
    h.router.handle_event(&renamed).await;

    let profile = h.store.profile(12).unwrap();
    assert_eq!(profile.first_name, "Lovelace");
    assert_eq!(profile.phone_number.as_deref(), Some("+4420000000"));
    assert_eq!(h.store.user_count(), 1);
}

// ====== Conversation ======

#[tokio::test]
async fn text_appends_one_chat_record_and_replies_verbatim() {
    let h = harness();
    h.router.handle_event(&text(20, "What is Rust?")).await;

    let records = h.store.chat_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].chat_id, 20);
    assert_eq!(records[0].user_input, "What is Rust?");
    assert_eq!(records[0].bot_response, "echo: What is Rust?");
    assert_eq!(h.messenger.texts_for(20), vec!["echo: What is Rust?"]);
}

#[tokio::test]
async fn whitespace_text_is_forwarded_unchanged() {
    let h = harness();
    h.router.handle_event(&text(21, "   ")).await;

    assert_eq!(*h.llm.prompts.lock().unwrap(), vec!["   ".to_string()]);
    assert_eq!(h.store.chat_records()[0].user_input, "   ");
}

#[tokio::test]
async fn failed_generation_sends_generic_reply_and_records_nothing() {
    let h = harness();
    h.router.handle_event(&text(22, "boom")).await;

    assert!(h.store.chat_records().is_empty());
    assert_eq!(h.messenger.texts_for(22), vec![GENERIC_FAILURE]);
}

// ====== Media ======

#[tokio::test]
async fn photo_uses_largest_variant_and_records_description() {
    let h = harness_with(RecordingMessenger::default().with_file(
        "large-id",
        "file_7.jpg",
        b"\xff\xd8\xff\xe0jpeg",
    ));

    let photo = event(
        30,
        EventPayload::Photo {
            sizes: vec![
                FileRef {
                    file_id: "small-id".into(),
                },
                FileRef {
                    file_id: "large-id".into(),
                },
            ],
        },
    );
    h.router.handle_event(&photo).await;

    let media = h.store.media_records();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].chat_id, 30);
    assert_eq!(media[0].filename, "file_7.jpg");
    assert_eq!(media[0].description, "A cat sitting on a mat.");
    assert_eq!(h.messenger.texts_for(30), vec![media[0].description.clone()]);

    let images = h.llm.images.lock().unwrap().clone();
    assert_eq!(
        images,
        vec![(DESCRIBE_INSTRUCTION.to_string(), 8, "image/jpeg".to_string())]
    );
}

#[tokio::test]
async fn photo_fetch_failure_is_reported_generically() {
    let h = harness();
    let photo = event(
        31,
        EventPayload::Photo {
            sizes: vec![FileRef {
                file_id: "missing".into(),
            }],
        },
    );
    h.router.handle_event(&photo).await;

    assert!(h.store.media_records().is_empty());
    assert_eq!(h.messenger.texts_for(31), vec![GENERIC_FAILURE]);
}

// ====== Search ======

#[tokio::test]
async fn websearch_replies_with_summary_and_top_three_links() {
    let h = harness();
    h.router.handle_event(&command(40, "websearch", &["rust"])).await;

    assert_eq!(
        h.messenger.texts_for(40),
        vec![
            "🔎 **Summary:** echo: Summarize this: Rust is a systems language.\n\n\
             🌐 **Top Links:**\nhttps://www.rust-lang.org\nhttps://doc.rust-lang.org/book\nhttps://crates.io"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn websearch_without_results_sends_fixed_error_only() {
    let h = harness();
    h.router
        .handle_event(&command(41, "websearch", &["weather", "today"]))
        .await;

    assert_eq!(
        *h.search.queries.lock().unwrap(),
        vec!["weather today".to_string()]
    );
    assert_eq!(h.messenger.texts_for(41), vec![SEARCH_FAILED]);
    assert!(h.llm.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn websearch_with_empty_query_is_sent_as_is() {
    let h = harness();
    h.router.handle_event(&command(42, "websearch", &[])).await;

    assert_eq!(*h.search.queries.lock().unwrap(), vec![String::new()]);
    assert_eq!(h.messenger.texts_for(42), vec![SEARCH_FAILED]);
}

// ====== Routing ======

#[tokio::test]
async fn unmatched_events_are_dropped_silently() {
    let h = harness();
    h.router.handle_event(&command(50, "help", &[])).await;
    h.router.handle_event(&event(50, EventPayload::Unsupported)).await;

    assert!(h.messenger.sent().is_empty());
    assert!(h.llm.prompts.lock().unwrap().is_empty());
    assert_eq!(h.store.user_count(), 0);
}

#[tokio::test]
async fn dispatch_reports_whether_a_handler_ran() {
    let h = harness();
    assert!(!h.router.dispatch(&command(51, "settings", &[])).await.unwrap());
    assert!(h.router.dispatch(&text(51, "hello")).await.unwrap());
    assert!(h.router.dispatch(&text(51, "boom")).await.is_err());
}

#[tokio::test]
async fn failure_in_one_conversation_does_not_block_another() {
    let h = harness();
    let (tx, rx) = mpsc::channel(8);

    tx.send(text(60, "boom")).await.unwrap();
    tx.send(text(61, "hello")).await.unwrap();
    tx.send(command(61, "start", &[])).await.unwrap();
    drop(tx);

    h.router.run(rx).await;

    assert_eq!(h.messenger.texts_for(60), vec![GENERIC_FAILURE]);
    assert_eq!(h.messenger.texts_for(61), vec!["echo: hello", WELCOME]);
    assert_eq!(h.store.chat_records().len(), 1);
    assert!(h.store.profile(61).is_some());
}

#[tokio::test]
async fn storage_outage_is_reported_instead_of_answered() {
    let llm = Arc::new(ScriptedLlm::default());
    let messenger = Arc::new(RecordingMessenger::default());
    let ctx = HandlerContext::new(
        Arc::new(UnreachableStore),
        llm.clone(),
        WebSearch::new(Arc::new(ScriptedSearch::default()), llm.clone(), 3),
        messenger.clone(),
    );
    let router = Router::new(ctx);

    router.handle_event(&text(70, "hello")).await;
    router.handle_event(&command(70, "start", &[])).await;

    assert_eq!(
        messenger.texts_for(70),
        vec![GENERIC_FAILURE, GENERIC_FAILURE]
    );
}
