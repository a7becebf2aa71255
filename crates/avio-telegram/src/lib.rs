//! Telegram adapter (teloxide).
//!
//! Implements the `avio-core` `Transport` port over the Bot API. Error
//! mapping happens here; retry and backoff policy stay in the core.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
        KeyboardMarkup, KeyboardRemove, ParseMode,
    },
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;
#[cfg(test)]
pub(crate) mod testutil;

use avio_core::{
    domain::{ChatId, MessageId, MessageRef},
    formatting::{escape_html, spoiler},
    messaging::{
        port::{SendError, SendResult, Transport},
        types::{InlineKeyboard, MediaAttachment, MediaKind},
    },
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn msg_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }
}

fn map_err(e: RequestError) -> SendError {
    match e {
        RequestError::RetryAfter(d) => SendError::RetryAfter(d),
        RequestError::Api(api) => match api {
            ApiError::BotBlocked
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation
            | ApiError::CantTalkWithBots => SendError::Forbidden,
            ApiError::Unknown(ref s) if s.contains("blocked") => SendError::Forbidden,
            other => SendError::Other(format!("telegram api error: {other}")),
        },
        other => SendError::Other(format!("telegram error: {other}")),
    }
}

#[async_trait]
impl Transport for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> SendResult<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        media: &MediaAttachment,
        caption: Option<&str>,
        spoilered: bool,
    ) -> SendResult<MessageRef> {
        let file = InputFile::memory(media.bytes.clone()).file_name(media.filename.clone());
        // Spoilered media hides the caption behind a spoiler too.
        let caption = caption.map(|c| {
            if spoilered {
                spoiler(c)
            } else {
                escape_html(c)
            }
        });

        let chat = Self::tg_chat(chat_id);
        let msg = match media.kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat, file).has_spoiler(spoilered);
                if let Some(c) = caption {
                    req = req.caption(c).parse_mode(ParseMode::Html);
                }
                req.await.map_err(map_err)?
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat, file).has_spoiler(spoilered);
                if let Some(c) = caption {
                    req = req.caption(c).parse_mode(ParseMode::Html);
                }
                req.await.map_err(map_err)?
            }
            MediaKind::Animation => {
                let mut req = self.bot.send_animation(chat, file).has_spoiler(spoilered);
                if let Some(c) = caption {
                    req = req.caption(c).parse_mode(ParseMode::Html);
                }
                req.await.map_err(map_err)?
            }
        };
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        bytes: Vec<u8>,
        filename: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        let file = InputFile::memory(bytes).file_name(filename.to_string());
        let mut req = self.bot.send_document(Self::tg_chat(chat_id), file);
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        let msg = req.await.map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> SendResult<()> {
        self.bot
            .edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                html.to_string(),
            )
            .parse_mode(ParseMode::Html)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()> {
        self.bot
            .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> SendResult<MessageRef> {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .buttons
            .into_iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label, b.callback_data)])
            .collect();
        let markup = InlineKeyboardMarkup::new(rows);

        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .reply_markup(markup)
            .await
            .map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_contact_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        button_label: &str,
    ) -> SendResult<MessageRef> {
        let keyboard = KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(button_label.to_string()).request(ButtonRequest::Contact),
        ]])
        .resize_keyboard(true)
        .one_time_keyboard(true);

        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .reply_markup(keyboard)
            .await
            .map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_text_clear_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
    ) -> SendResult<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .reply_markup(KeyboardRemove::new())
            .await
            .map_err(map_err)?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SendResult<()> {
        let mut req = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(t) = text {
            req = req.text(t.to_string());
        }
        req.await.map_err(map_err)?;
        Ok(())
    }
}
