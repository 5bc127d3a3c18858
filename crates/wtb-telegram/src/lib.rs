//! Telegram adapter (teloxide).
//!
//! Implements the `wtb-core` MessagingPort over the Telegram Bot API and runs
//! the long-polling update loop.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton as ReplyButton,
        KeyboardMarkup, WebAppInfo,
    },
    ApiError, RequestError,
};

use tokio::time::sleep;
use url::Url;

pub mod handlers;
pub mod router;

use wtb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ButtonAction, Keyboard},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    /// Run a request, retrying once when Telegram asks us to slow down.
    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::debug!(wait = ?d, "telegram rate limit, retrying");
                    sleep(d).await;
                }
                other => return other,
            }
        }
    }
}

/// Map a transport-neutral keyboard onto Telegram inline markup.
pub fn inline_markup(keyboard: &Keyboard) -> Result<InlineKeyboardMarkup> {
    let rows = keyboard
        .rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            row.iter()
                .map(|b| {
                    Ok(match &b.action {
                        ButtonAction::Callback(data) => {
                            InlineKeyboardButton::callback(b.label.clone(), data.clone())
                        }
                        ButtonAction::WebApp(url) => InlineKeyboardButton::web_app(
                            b.label.clone(),
                            WebAppInfo {
                                url: parse_url(url)?,
                            },
                        ),
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(InlineKeyboardMarkup::new(rows))
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::External(format!("invalid button url {raw:?}: {e}")))
}

/// Persistent reply keyboard, two labels per row.
pub fn reply_menu(labels: &[&str]) -> KeyboardMarkup {
    let rows = labels
        .chunks(2)
        .map(|pair| pair.iter().map(|l| ReplyButton::new(*l)).collect())
        .collect::<Vec<Vec<_>>>();
    KeyboardMarkup::new(rows)
}

fn message_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
    MessageRef {
        chat_id,
        message_id: MessageId(msg.id.0),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        let markup = keyboard
            .filter(|k| !k.is_empty())
            .map(|k| inline_markup(&k))
            .transpose()?;

        let msg = self
            .with_retry(|| {
                let req = self
                    .bot
                    .send_message(Self::tg_chat(chat_id), text.to_string());
                match &markup {
                    Some(m) => req.reply_markup(m.clone()),
                    None => req,
                }
            })
            .await
            .map_err(Self::map_err)?;

        Ok(message_ref(chat_id, &msg))
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let markup = keyboard
            .filter(|k| !k.is_empty())
            .map(|k| inline_markup(&k))
            .transpose()?;

        let res = self
            .with_retry(|| {
                let req = self.bot.edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    text.to_string(),
                );
                match &markup {
                    Some(m) => req.reply_markup(m.clone()),
                    None => req,
                }
            })
            .await;

        match res {
            Ok(_) => Ok(()),
            // Re-tapping a button that renders the same view.
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn send_menu(&self, chat_id: ChatId, text: &str, labels: &[&str]) -> Result<MessageRef> {
        let markup = reply_menu(labels);
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .reply_markup(markup.clone())
            })
            .await
            .map_err(Self::map_err)?;

        Ok(message_ref(chat_id, &msg))
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;
    use wtb_core::messaging::types::KeyboardButton;

    #[test]
    fn keyboard_maps_every_button_kind() {
        let kb = Keyboard::new(vec![
            vec![
                KeyboardButton::callback("History", "wallet_history:1".to_string()),
                KeyboardButton::web_app("App", "https://app.example.com/?startapp=wallet_1"),
            ],
            vec![],
            vec![KeyboardButton::callback("Back", "wallet_menu:1".to_string())],
        ]);

        let markup = inline_markup(&kb).unwrap();
        // Empty rows are dropped.
        assert_eq!(markup.inline_keyboard.len(), 2);

        let first = &markup.inline_keyboard[0];
        assert!(matches!(
            &first[0].kind,
            InlineKeyboardButtonKind::CallbackData(d) if d == "wallet_history:1"
        ));
        assert!(matches!(&first[1].kind, InlineKeyboardButtonKind::WebApp(_)));
        assert!(matches!(
            &markup.inline_keyboard[1][0].kind,
            InlineKeyboardButtonKind::CallbackData(d) if d == "wallet_menu:1"
        ));
    }

    #[test]
    fn bad_button_url_is_an_error() {
        let kb = Keyboard::new(vec![vec![KeyboardButton::web_app("App", "not a url")]]);
        assert!(inline_markup(&kb).is_err());
    }

    #[test]
    fn reply_menu_pairs_labels() {
        let markup = reply_menu(&["a", "b", "c"]);
        assert_eq!(markup.keyboard.len(), 2);
        assert_eq!(markup.keyboard[1].len(), 1);
    }
}
