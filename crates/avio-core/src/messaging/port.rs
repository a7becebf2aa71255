use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{InlineKeyboard, MediaAttachment},
};

/// Transport-level send failure.
///
/// `Forbidden` and `RetryAfter` are the two conditions the delivery layer
/// has a policy for; everything else is opaque.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The recipient cannot be reached (blocked the bot, deactivated, ...).
    #[error("recipient unreachable")]
    Forbidden,

    /// The API asked us to back off for the given duration.
    #[error("rate limited, retry after {0:?}")]
    RetryAfter(Duration),

    #[error("transport error: {0}")]
    Other(String),
}

pub type SendResult<T> = std::result::Result<T, SendError>;

/// Cross-messenger outbound port.
///
/// Telegram is the first implementation; the shape is kept narrow enough
/// that another chat transport could sit behind it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef>;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> SendResult<MessageRef>;

    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &MediaAttachment,
        caption: Option<&str>,
        spoiler: bool,
    ) -> SendResult<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef>;

    async fn edit_html(&self, msg: MessageRef, html: &str) -> SendResult<()>;

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> SendResult<MessageRef>;

    /// Reply keyboard with a single request-contact button.
    async fn send_contact_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
    ) -> SendResult<MessageRef>;

    /// Send text and clear any active reply keyboard.
    async fn send_text_clear_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> SendResult<MessageRef>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SendResult<()>;
}
