//! Delivery primitive and single-send operation.
//!
//! One `deliver` call is one unit of content to one recipient. Transport
//! failures are normalized into [`DeliveryOutcome`] values so callers can
//! apply their own retry policy; nothing here ever aborts a caller's loop.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    directory::{resolve_recipient, Resolved, UserDirectory},
    domain::{ChatId, UserId},
    locale::LocaleStore,
    messaging::{Content, SendError, SendResult, Transport},
    Result,
};

/// Classification of one send attempt to one recipient. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The recipient blocked the bot or is otherwise unreachable. Expected
    /// and non-fatal.
    Unreachable,
    /// Still rate-limited after the built-in single retry; the carried wait
    /// is the API's latest backoff hint.
    RateLimited(Duration),
    /// Generic transport failure, already logged.
    Failed,
}

/// Result of an operator-initiated single send, after identifier resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleSend {
    Sent(UserId),
    Undelivered(UserId),
    /// Resolution failed; no send was attempted.
    NotFound,
}

pub struct DeliveryService {
    transport: Arc<dyn Transport>,
    directory: Arc<dyn UserDirectory>,
    locales: Arc<LocaleStore>,
}

impl DeliveryService {
    pub fn new(
        transport: Arc<dyn Transport>,
        directory: Arc<dyn UserDirectory>,
        locales: Arc<LocaleStore>,
    ) -> Self {
        Self {
            transport,
            directory,
            locales,
        }
    }

    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    pub fn locales(&self) -> &LocaleStore {
        self.locales.as_ref()
    }

    /// Send one content unit to one recipient.
    ///
    /// A `RetryAfter(w)` from the transport suspends for `w` and retries the
    /// same send exactly once before surfacing `RateLimited`. Everything is
    /// absorbed into an outcome; this never returns an error.
    pub async fn deliver(&self, recipient: UserId, content: &Content) -> DeliveryOutcome {
        if content.is_empty() {
            tracing::warn!(user = recipient.0, "refusing to deliver empty content");
            return DeliveryOutcome::Failed;
        }

        match self.attempt(recipient, content).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(SendError::Forbidden) => {
                tracing::info!(user = recipient.0, "recipient unreachable");
                DeliveryOutcome::Unreachable
            }
            Err(SendError::RetryAfter(wait)) => {
                tracing::warn!(user = recipient.0, ?wait, "rate limited, retrying once");
                sleep(wait).await;
                match self.attempt(recipient, content).await {
                    Ok(()) => DeliveryOutcome::Delivered,
                    Err(SendError::Forbidden) => DeliveryOutcome::Unreachable,
                    Err(SendError::RetryAfter(again)) => DeliveryOutcome::RateLimited(again),
                    Err(SendError::Other(e)) => {
                        tracing::error!(user = recipient.0, "delivery failed after retry: {e}");
                        DeliveryOutcome::Failed
                    }
                }
            }
            Err(SendError::Other(e)) => {
                tracing::error!(user = recipient.0, "delivery failed: {e}");
                DeliveryOutcome::Failed
            }
        }
    }

    /// Deliver with unbounded rate-limit retry.
    ///
    /// An operator-triggered single send has no competing demand, so we keep
    /// waiting out backoffs until the recipient either receives the content
    /// or proves unreachable. Returns true only on delivery.
    pub async fn deliver_reliable(&self, recipient: UserId, content: &Content) -> bool {
        loop {
            match self.deliver(recipient, content).await {
                DeliveryOutcome::Delivered => return true,
                DeliveryOutcome::Unreachable | DeliveryOutcome::Failed => return false,
                DeliveryOutcome::RateLimited(wait) => sleep(wait).await,
            }
        }
    }

    /// Resolve `<id>` or `@handle`, then deliver reliably.
    pub async fn send_once(&self, identifier: &str, content: &Content) -> Result<SingleSend> {
        let user = match resolve_recipient(self.directory.as_ref(), identifier).await? {
            Resolved::Found(user) => user,
            Resolved::NotFound => return Ok(SingleSend::NotFound),
        };

        Ok(if self.deliver_reliable(user.id, content).await {
            SingleSend::Sent(user.id)
        } else {
            SingleSend::Undelivered(user.id)
        })
    }

    async fn attempt(&self, recipient: UserId, content: &Content) -> SendResult<()> {
        // Direct chats share the user's numeric id.
        let chat = ChatId(recipient.0);
        match content {
            Content::Text(text) => self.transport.send_text(chat, text).await.map(|_| ()),
            Content::Media {
                media,
                caption,
                spoiler,
            } => self
                .transport
                .send_media(chat, media, caption.as_deref(), *spoiler)
                .await
                .map(|_| ()),
        }
    }
}
