//! Password-gated self-registration for end users.
//!
//! A user walks through `/start` → password → shared contact; the country
//! is derived from the contact's phone number and the record lands in the
//! directory exactly once. Each private chat carries at most one session.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{
    directory::UserDirectory,
    domain::{UserId, UserRecord},
    phone::country_for_phone,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthState {
    AwaitingPassword,
    AwaitingContact,
}

/// Contact payload as the transport hands it over.
#[derive(Clone, Debug)]
pub struct SharedContact {
    pub phone: String,
    pub username: Option<String>,
}

/// Typed result of one registration step; the adapter turns these into
/// localized chat messages.
#[derive(Clone, Debug)]
pub enum RegisterReply {
    /// The user's record already exists; no session is created.
    AlreadyRegistered { country: String },
    PasswordPrompt,
    PasswordIncorrect,
    ContactPrompt,
    /// Input arrived with no session in this chat.
    NotStarted,
    Registered {
        record: UserRecord,
        /// False when a concurrent registration won the insert race.
        newly: bool,
    },
}

pub struct RegistrationFlow {
    secret: String,
    sessions: Mutex<HashMap<i64, AuthState>>,
}

impl RegistrationFlow {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle `/start`: greet returning users, otherwise open a session.
    pub async fn start(
        &self,
        user: UserId,
        directory: &dyn UserDirectory,
    ) -> Result<RegisterReply> {
        if let Some(existing) = directory.get_user(user).await? {
            return Ok(RegisterReply::AlreadyRegistered {
                country: existing.country,
            });
        }
        self.sessions
            .lock()
            .await
            .insert(user.0, AuthState::AwaitingPassword);
        Ok(RegisterReply::PasswordPrompt)
    }

    /// Handle a plain text message inside the flow.
    pub async fn offer_text(&self, user: UserId, text: &str) -> RegisterReply {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&user.0) {
            None => RegisterReply::NotStarted,
            // Text while we expect a contact just re-prompts.
            Some(AuthState::AwaitingContact) => RegisterReply::ContactPrompt,
            Some(AuthState::AwaitingPassword) => {
                if text.trim() == self.secret {
                    sessions.insert(user.0, AuthState::AwaitingContact);
                    RegisterReply::ContactPrompt
                } else {
                    tracing::info!(user = user.0, "wrong password attempt");
                    RegisterReply::PasswordIncorrect
                }
            }
        }
    }

    /// Handle a shared contact: derive the country and store the record.
    pub async fn offer_contact(
        &self,
        user: UserId,
        contact: SharedContact,
        directory: &dyn UserDirectory,
    ) -> Result<RegisterReply> {
        {
            let sessions = self.sessions.lock().await;
            match sessions.get(&user.0) {
                Some(AuthState::AwaitingContact) => {}
                Some(AuthState::AwaitingPassword) => return Ok(RegisterReply::PasswordPrompt),
                None => return Ok(RegisterReply::NotStarted),
            }
        }

        let record = UserRecord {
            id: user,
            username: contact.username,
            phone: contact.phone.clone(),
            country: country_for_phone(&contact.phone),
        };
        let newly = directory.insert_if_absent(&record).await?;
        self.sessions.lock().await.remove(&user.0);

        tracing::info!(
            user = user.0,
            country = %record.country,
            newly,
            "registration completed"
        );
        Ok(RegisterReply::Registered { record, newly })
    }

    pub async fn is_active(&self, user: UserId) -> bool {
        self.sessions.lock().await.contains_key(&user.0)
    }
}
