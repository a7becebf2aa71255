//! Shared fixtures for the handler tests.

use std::{
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use avio_core::{
    audit::AuditLogger,
    broadcast::BroadcastDialogues,
    config::Config,
    delivery::DeliveryService,
    directory::{MemoryDirectory, UserDirectory},
    domain::{ChatId, MessageId, MessageRef, UserId, UserRecord},
    locale::LocaleStore,
    messaging::{InlineKeyboard, MediaAttachment, SendResult, Transport},
    registration::RegistrationFlow,
    tasks::TaskRegistry,
    totals::TotalLibrary,
    Result,
};

use crate::router::AppState;

pub const OPERATOR: i64 = 999;

/// Always-succeeding transport that records what each chat received.
#[derive(Default)]
pub struct RecordingTransport {
    sends: Mutex<Vec<(i64, String)>>,
}

impl RecordingTransport {
    async fn hit(&self, chat: ChatId, label: &str) -> SendResult<MessageRef> {
        self.sends.lock().await.push((chat.0, label.to_string()));
        Ok(MessageRef {
            chat_id: chat,
            message_id: MessageId(1),
        })
    }

    pub async fn sends_to(&self, chat: i64) -> Vec<String> {
        self.sends
            .lock()
            .await
            .iter()
            .filter(|(c, _)| *c == chat)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef> {
        self.hit(chat_id, text).await
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> SendResult<MessageRef> {
        self.hit(chat_id, html).await
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &MediaAttachment,
        _caption: Option<&str>,
        _spoiler: bool,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, &format!("media:{}", media.filename)).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        _bytes: Vec<u8>,
        filename: &str,
        _caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, &format!("document:{filename}")).await
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> SendResult<()> {
        self.hit(msg.chat_id, html).await.map(|_| ())
    }

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()> {
        self.hit(msg.chat_id, "delete").await.map(|_| ())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        _keyboard: InlineKeyboard,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, text).await
    }

    async fn send_contact_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        _button_label: &str,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, text).await
    }

    async fn send_text_clear_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, &format!("clear:{text}")).await
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> SendResult<()> {
        Ok(())
    }
}

/// Directory wrapper counting recipient resolutions.
pub struct CountingDirectory {
    inner: MemoryDirectory,
    pub resolutions: AtomicUsize,
}

impl CountingDirectory {
    pub async fn with(users: &[UserRecord]) -> Self {
        let inner = MemoryDirectory::new();
        for u in users {
            inner.insert_if_absent(u).await.unwrap();
        }
        Self {
            inner,
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for CountingDirectory {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.inner.get_user(id).await
    }

    async fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.inner.get_user_by_handle(handle).await
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>> {
        self.inner.list_all().await
    }

    async fn list_countries(&self) -> Result<Vec<String>> {
        self.inner.list_countries().await
    }

    async fn list_by_country(&self, country: &str) -> Result<Vec<UserId>> {
        self.inner.list_by_country(country).await
    }

    async fn insert_if_absent(&self, record: &UserRecord) -> Result<bool> {
        self.inner.insert_if_absent(record).await
    }
}

pub fn test_config(tag: &str) -> Config {
    Config {
        bot_token: "token".to_string(),
        operator_chat_id: OPERATOR,
        secret_password: "s3cret".to_string(),
        total_dir: PathBuf::from("/nonexistent-totals"),
        lang_dir: PathBuf::from("/nonexistent-lang"),
        database_url: None,
        series_count: 1,
        series_interval: Duration::from_secs(1),
        broadcast_pacing: Duration::from_millis(1),
        throttle_global_interval: Duration::ZERO,
        throttle_per_chat_interval: Duration::ZERO,
        audit_log_path: std::env::temp_dir()
            .join(format!("avio-handlers-{tag}-{}.log", process::id())),
    }
}

pub fn app_state(
    cfg: Config,
    directory: Arc<dyn UserDirectory>,
) -> (Arc<AppState>, Arc<RecordingTransport>) {
    let cfg = Arc::new(cfg);
    let transport = Arc::new(RecordingTransport::default());
    let locales = Arc::new(LocaleStore::new(cfg.lang_dir.clone()));
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        directory: directory.clone(),
        locales: locales.clone(),
        delivery: Arc::new(DeliveryService::new(transport.clone(), directory, locales)),
        totals: Arc::new(TotalLibrary::new(cfg.total_dir.clone())),
        dialogues: Arc::new(BroadcastDialogues::new()),
        registration: Arc::new(RegistrationFlow::new(cfg.secret_password.clone())),
        tasks: Arc::new(TaskRegistry::new()),
        transport: transport.clone(),
        audit: Arc::new(AuditLogger::new(cfg.audit_log_path.clone())),
    });
    (state, transport)
}

pub fn record(id: i64, username: Option<&str>, country: &str) -> UserRecord {
    UserRecord {
        id: UserId(id),
        username: username.map(|s| s.to_string()),
        phone: format!("+7916000{id:04}"),
        country: country.to_string(),
    }
}
