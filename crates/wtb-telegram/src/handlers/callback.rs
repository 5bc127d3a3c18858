use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use wtb_core::domain::{ChatId, MessageId, MessageRef};

use super::identity_of;
use crate::router::AppState;

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let messenger = state.messenger.clone();
    let data = q.data.clone().unwrap_or_default();

    // Always answer the query so the client stops its spinner.
    if data.is_empty() {
        let _ = messenger.answer_callback_query(&q.id, None).await;
        return Ok(());
    }

    let identity = identity_of(Some(&q.from));
    let outcome = state.inbound.on_callback(identity.as_ref(), &data).await;

    if let Err(e) = messenger.answer_callback_query(&q.id, outcome.notice).await {
        warn!(error = %e, "failed to answer callback query");
    }

    let (Some(reply), Some(source)) = (outcome.reply, q.message.as_ref()) else {
        return Ok(());
    };
    let chat_id = ChatId(source.chat.id.0);

    // Edit the message carrying the button in place; fall back to a fresh
    // message when the text is too long to fit one edit.
    let delivered = if reply.text.len() <= state.cfg.telegram_safe_limit {
        let target = MessageRef {
            chat_id,
            message_id: MessageId(source.id.0),
        };
        messenger
            .edit_text(target, &reply.text, reply.keyboard)
            .await
    } else {
        state.deliver(chat_id, reply).await
    };

    if let Err(e) = delivered {
        warn!(chat = chat_id.0, error = %e, "failed to update callback message");
    }
    Ok(())
}
