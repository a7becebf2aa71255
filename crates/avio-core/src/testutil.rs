//! Shared test doubles for the core crates' unit tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, MessageId, MessageRef, UserId, UserRecord},
    directory::{MemoryDirectory, UserDirectory},
    messaging::{
        port::{SendError, SendResult, Transport},
        types::{InlineKeyboard, MediaAttachment},
    },
};

/// Scripted transport: per-chat queues of failures to return before
/// succeeding, plus a record of every send that reached the wire.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<HashMap<i64, VecDeque<SendError>>>,
    always_forbidden: Mutex<Vec<i64>>,
    pub sends: Mutex<Vec<(i64, String)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next send to `chat`.
    pub async fn fail_next(&self, chat: i64, err: SendError) {
        self.script
            .lock()
            .await
            .entry(chat)
            .or_default()
            .push_back(err);
    }

    /// Every send to `chat` fails with `Forbidden`.
    pub async fn mark_unreachable(&self, chat: i64) {
        self.always_forbidden.lock().await.push(chat);
    }

    pub async fn send_count(&self) -> usize {
        self.sends.lock().await.len()
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

    async fn hit(&self, chat: ChatId, label: &str) -> SendResult<MessageRef> {
        if self.always_forbidden.lock().await.contains(&chat.0) {
            return Err(SendError::Forbidden);
        }
        if let Some(queue) = self.script.lock().await.get_mut(&chat.0) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }
        self.sends.lock().await.push((chat.0, label.to_string()));
        Ok(MessageRef {
            chat_id: chat,
            message_id: MessageId(1),
        })
    }
}

#[async_trait]
impl Transport for FakeTransport {
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
        caption: Option<&str>,
        _spoiler: bool,
    ) -> SendResult<MessageRef> {
        let label = format!(
            "media:{}:{}",
            media.filename,
            caption.unwrap_or_default()
        );
        self.hit(chat_id, &label).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        _bytes: Vec<u8>,
        filename: &str,
        _caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        let label = format!("document:{filename}");
        self.hit(chat_id, &label).await
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> SendResult<()> {
        self.hit(msg.chat_id, &format!("edit:{html}")).await.map(|_| ())
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
        self.hit(chat_id, &format!("keyboard:{text}")).await
    }

    async fn send_contact_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        _button_label: &str,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, &format!("contact:{text}")).await
    }

    async fn send_text_clear_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> SendResult<MessageRef> {
        self.hit(chat_id, text).await
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> SendResult<()> {
        Ok(())
    }
}

pub fn record(id: i64, username: Option<&str>, country: &str) -> UserRecord {
    UserRecord {
        id: UserId(id),
        username: username.map(|s| s.to_string()),
        phone: format!("+7916000{id:04}"),
        country: country.to_string(),
    }
}

pub async fn directory_with(users: &[UserRecord]) -> MemoryDirectory {
    let dir = MemoryDirectory::new();
    for u in users {
        dir.insert_if_absent(u).await.unwrap();
    }
    dir
}
