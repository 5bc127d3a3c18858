use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, warn};

use wtb_core::domain::ChatId;

use super::identity_of;
use crate::router::AppState;

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        debug!(chat = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let identity = identity_of(msg.from());
    let chat_id = ChatId(msg.chat.id.0);

    let Some(reply) = state.inbound.on_text(identity.as_ref(), text).await else {
        return Ok(());
    };

    if let Err(e) = state.deliver(chat_id, reply).await {
        warn!(chat = chat_id.0, error = %e, "failed to deliver reply");
    }
    Ok(())
}
