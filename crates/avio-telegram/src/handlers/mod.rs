//! Telegram update handlers.
//!
//! The operator chat gets the command surface and the broadcast dialogue;
//! every other chat goes through the registration flow.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use crate::router::AppState;

mod broadcast;
mod commands;
mod register;
mod sync_animation;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    register::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.chat.id.0 == state.cfg.operator_chat_id {
        if let Some(text) = msg.text() {
            if text.starts_with('/') {
                return commands::handle_command(msg, state).await;
            }
        }
        // Free-text and media in the operator chat belong to the dialogue.
        return broadcast::handle_dialogue_input(bot, msg, state).await;
    }

    register::handle_user_message(msg, state).await
}
