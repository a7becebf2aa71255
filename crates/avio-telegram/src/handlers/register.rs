//! User-facing registration handlers.
//!
//! `/start` opens the password gate; a correct password offers an inline
//! "synchronize" button; the callback plays the sync animation and asks for
//! the contact; the shared contact completes the record.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use avio_core::{
    audit::AuditEvent,
    domain::{ChatId, UserId},
    formatting::{code, escape_html},
    messaging::InlineKeyboard,
    registration::{RegisterReply, SharedContact},
};

use crate::router::AppState;

use super::sync_animation;

const SYNC_CALLBACK: &str = "request_sync";

pub async fn handle_user_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let user = UserId(from.id.0 as i64);
    let chat = ChatId(msg.chat.id.0);

    if let Some(contact) = msg.contact() {
        let shared = SharedContact {
            phone: contact.phone_number.clone(),
            username: from.username.clone(),
        };
        return handle_contact(&state, user, chat, shared).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.trim().starts_with("/start") {
        match state.registration.start(user, state.directory.as_ref()).await {
            Ok(RegisterReply::AlreadyRegistered { country }) => {
                let bundle = state.locales.for_country(&country).await;
                send(&state, chat, &bundle.already_registered).await;
            }
            Ok(_) => {
                let bundle = state.locales.load("en").await;
                send(&state, chat, &bundle.enter_password).await;
            }
            Err(e) => tracing::error!(user = user.0, "registration start failed: {e}"),
        }
        return Ok(());
    }

    let bundle = state.locales.load("en").await;
    match state.registration.offer_text(user, text).await {
        RegisterReply::PasswordIncorrect => send(&state, chat, &bundle.password_incorrect).await,
        RegisterReply::ContactPrompt => {
            if let Err(e) = state
                .transport
                .send_inline_keyboard(
                    chat,
                    &bundle.password_correct,
                    InlineKeyboard::single(bundle.sync.clone(), SYNC_CALLBACK),
                )
                .await
            {
                tracing::error!(user = user.0, "sync prompt failed: {e}");
            }
        }
        RegisterReply::NotStarted => send(&state, chat, "Send /start to begin.").await,
        _ => {}
    }
    Ok(())
}

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if q.data.as_deref() != Some(SYNC_CALLBACK) {
        return Ok(());
    }
    let _ = state.transport.answer_callback(&q.id, None).await;

    let Some(msg) = q.message else {
        return Ok(());
    };
    let chat = ChatId(msg.chat.id.0);

    sync_animation::play(state.transport.as_ref(), chat).await;

    if let Err(e) = state
        .transport
        .send_contact_keyboard(chat, "📲 Share your contact to finish:", "📲 Share contact")
        .await
    {
        tracing::error!("contact prompt failed: {e}");
    }
    Ok(())
}

async fn handle_contact(
    state: &AppState,
    user: UserId,
    chat: ChatId,
    shared: SharedContact,
) -> ResponseResult<()> {
    match state
        .registration
        .offer_contact(user, shared, state.directory.as_ref())
        .await
    {
        Ok(RegisterReply::Registered { record, newly }) => {
            let bundle = state.locales.for_country(&record.country).await;

            if !newly {
                // Record already existed; greet without the welcome flow.
                if let Err(e) = state
                    .transport
                    .send_text_clear_keyboard(chat, &bundle.already_registered)
                    .await
                {
                    tracing::warn!(user = user.0, "send failed: {e}");
                }
                return Ok(());
            }

            let name = record.username.clone().unwrap_or_else(|| "user".to_string());
            if let Err(e) = state
                .transport
                .send_text_clear_keyboard(chat, &bundle.final_welcome)
                .await
            {
                tracing::error!(user = user.0, "welcome failed: {e}");
            }
            send(state, chat, &bundle.welcome.replace("{username}", &name)).await;

            state
                .audit
                .record(AuditEvent::registered(record.id.0, &name, &record.country));
            let notice = format!(
                "🆕 New user registered: @{} ({}), {}",
                escape_html(&name),
                code(record.id.0),
                escape_html(&record.country)
            );
            let op = ChatId(state.cfg.operator_chat_id);
            if let Err(e) = state.transport.send_html(op, &notice).await {
                tracing::error!("operator notification failed: {e}");
            }
        }
        Ok(RegisterReply::PasswordPrompt) => {
            let bundle = state.locales.load("en").await;
            send(state, chat, &bundle.enter_password).await;
        }
        Ok(RegisterReply::NotStarted) => send(state, chat, "Send /start to begin.").await,
        Ok(_) => {}
        Err(e) => tracing::error!(user = user.0, "registration failed: {e}"),
    }
    Ok(())
}

async fn send(state: &AppState, chat: ChatId, text: &str) {
    if let Err(e) = state.transport.send_text(chat, text).await {
        tracing::warn!(chat = chat.0, "send failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use avio_core::{
        directory::{MemoryDirectory, UserDirectory},
        domain::UserRecord,
    };

    use crate::testutil::{app_state, test_config, RecordingTransport, OPERATOR};

    async fn fixture(tag: &str) -> (Arc<AppState>, Arc<RecordingTransport>, Arc<MemoryDirectory>) {
        let directory = Arc::new(MemoryDirectory::new());
        let (state, transport) = app_state(test_config(tag), directory.clone());
        (state, transport, directory)
    }

    /// Walks the flow up to the contact step for `user`.
    async fn reach_contact_step(state: &AppState, user: UserId) {
        state
            .registration
            .start(user, state.directory.as_ref())
            .await
            .unwrap();
        let reply = state.registration.offer_text(user, "s3cret").await;
        assert!(matches!(reply, RegisterReply::ContactPrompt));
    }

    #[tokio::test]
    async fn fresh_contact_is_welcomed_and_operator_notified() {
        let (state, transport, _) = fixture("fresh").await;
        let user = UserId(7);
        reach_contact_step(&state, user).await;

        handle_contact(
            &state,
            user,
            ChatId(7),
            SharedContact {
                phone: "+79161234567".to_string(),
                username: Some("newcomer".to_string()),
            },
        )
        .await
        .unwrap();

        let sent = transport.sends_to(7).await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("clear:"));
        assert!(sent[1].contains("@newcomer"));

        let notices = transport.sends_to(OPERATOR).await;
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("New user registered"));
    }

    #[tokio::test]
    async fn duplicate_contact_gets_already_registered_reply() {
        let (state, transport, directory) = fixture("dup").await;
        let user = UserId(7);
        reach_contact_step(&state, user).await;

        // The record lands in the directory before the contact arrives.
        directory
            .insert_if_absent(&UserRecord {
                id: user,
                username: Some("dup".to_string()),
                phone: "+79161234567".to_string(),
                country: "Russia".to_string(),
            })
            .await
            .unwrap();

        handle_contact(
            &state,
            user,
            ChatId(7),
            SharedContact {
                phone: "+79161234567".to_string(),
                username: Some("dup".to_string()),
            },
        )
        .await
        .unwrap();

        let sent = transport.sends_to(7).await;
        assert_eq!(sent, vec!["clear:🔍 You are already registered!".to_string()]);
        assert!(transport.sends_to(OPERATOR).await.is_empty());
    }
}
