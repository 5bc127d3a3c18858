use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::Keyboard,
    Result,
};

/// Outbound side of the chat transport.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    async fn edit_text(&self, msg: MessageRef, text: &str, keyboard: Option<Keyboard>)
        -> Result<()>;

    /// Install the persistent reply-keyboard menu (one label per button).
    async fn send_menu(&self, chat_id: ChatId, text: &str, labels: &[&str]) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
