//! Console-style animation shown while an account "synchronizes".
//!
//! Purely cosmetic: one message edited through a few frames, then removed.
//! All transport errors are swallowed.

use std::time::Duration;

use tokio::time::sleep;

use avio_core::{domain::ChatId, messaging::port::Transport};

const FRAMES: &[&str] = &[
    "> connecting to server...",
    "> connecting to server... ok\n> authorizing...",
    "> connecting to server... ok\n> authorizing... ok\n> syncing profile...",
    "> connecting to server... ok\n> authorizing... ok\n> syncing profile... ok",
];
const FRAME_DELAY: Duration = Duration::from_millis(700);

pub async fn play(transport: &dyn Transport, chat: ChatId) {
    let Ok(msg) = transport
        .send_html(chat, &format!("<pre>{}</pre>", FRAMES[0]))
        .await
    else {
        return;
    };

    for frame in &FRAMES[1..] {
        sleep(FRAME_DELAY).await;
        if transport
            .edit_html(msg, &format!("<pre>{frame}</pre>"))
            .await
            .is_err()
        {
            return;
        }
    }

    sleep(FRAME_DELAY).await;
    let _ = transport.delete_message(msg).await;
}
