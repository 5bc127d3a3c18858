//! Telegram update handlers.
//!
//! Each handler turns an update into a platform-neutral request for
//! `wtb_core::inbound`, then delivers the outcome through the messenger.
//! Delivery failures are logged, never returned: a failed send must not stop
//! the polling loop.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use wtb_core::domain::UserIdentity;

use crate::router::AppState;

mod callback;
mod message;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    message::handle_message(bot, msg, state).await
}

/// Platform-supplied identity of the sender. Bots and anonymous senders have
/// none.
fn identity_of(user: Option<&User>) -> Option<UserIdentity> {
    let user = user?;
    if user.is_bot {
        return None;
    }
    Some(identity(user.id.0, user.username.clone()))
}

fn identity(telegram_id: u64, username: Option<String>) -> UserIdentity {
    UserIdentity::new(telegram_id.to_string(), username)
}
