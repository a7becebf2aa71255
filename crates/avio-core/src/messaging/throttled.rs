use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{
        port::{SendResult, Transport},
        types::{InlineKeyboard, MediaAttachment},
    },
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat (Telegram 1 msg/sec style limits).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// Transport decorator that rate-limits outbound calls.
///
/// This is a best-effort defense against 429s during broadcasts and series;
/// the delivery layer still handles the RetryAfter the API may return.
pub struct ThrottledTransport {
    inner: Arc<dyn Transport>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledTransport {
    pub fn new(inner: Arc<dyn Transport>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if wait > Duration::from_millis(0) {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if wait > Duration::from_millis(0) {
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl Transport for ThrottledTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &MediaAttachment,
        caption: Option<&str>,
        spoiler: bool,
    ) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_media(chat_id, media, caption, spoiler).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner
            .send_document(chat_id, bytes, filename, caption)
            .await
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> SendResult<()> {
        self.throttle_chat(msg.chat_id.0).await;
        self.inner.edit_html(msg, html).await
    }

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()> {
        self.throttle_chat(msg.chat_id.0).await;
        self.inner.delete_message(msg).await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner
            .send_inline_keyboard(chat_id, text, keyboard)
            .await
    }

    async fn send_contact_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
    ) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner
            .send_contact_keyboard(chat_id, text, button_label)
            .await
    }

    async fn send_text_clear_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> SendResult<MessageRef> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_text_clear_keyboard(chat_id, text).await
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SendResult<()> {
        // No chat id available here; apply global throttling only.
        self.throttle_global().await;
        self.inner.answer_callback(callback_id, text).await
    }
}
