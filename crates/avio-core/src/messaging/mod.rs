pub mod port;
pub mod throttled;
pub mod types;

pub use port::{SendError, SendResult, Transport};
pub use types::{Content, InlineButton, InlineKeyboard, MediaAttachment, MediaKind};
