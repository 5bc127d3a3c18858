//! Inbound message and button flow, independent of the chat platform.
//!
//! text -> parse -> per-user queue -> dispatcher -> framed reply.
//! Work for one identity runs strictly in arrival order; requests without an
//! identity skip the queue (they can only produce stateless replies).

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    callback,
    commands::{self, CommandKind, ParsedCommand},
    dispatcher::{Dispatcher, ExecutionResult},
    domain::UserIdentity,
    formatting::format_batch,
    messaging::types::Keyboard,
    render,
    session_queue::SessionQueue,
    Result,
};

pub const UNSUPPORTED_ACTION: &str = "This button is no longer supported.";

/// What to send back for one inbound message or button tap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    /// Also (re)install the persistent reply-keyboard menu.
    pub show_menu: bool,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            show_menu: false,
        }
    }
}

/// Outcome of a button tap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackReply {
    /// Short notice shown by the client when the query is answered.
    pub notice: Option<&'static str>,
    /// Replacement content for the message that carried the button.
    pub reply: Option<Reply>,
}

#[derive(Clone)]
pub struct Inbound {
    dispatcher: Arc<Dispatcher>,
    queue: SessionQueue<String>,
}

impl Inbound {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            queue: SessionQueue::new(),
        }
    }

    /// Handle one text message. `None` means nothing needs to be sent.
    pub async fn on_text(&self, identity: Option<&UserIdentity>, text: &str) -> Option<Reply> {
        let commands = commands::parse(text);
        if commands.is_empty() {
            if text.trim().is_empty() {
                return None;
            }
            let hint = if commands::has_command_prefix(text) {
                render::UNRECOGNIZED
            } else {
                render::CHATTER_HINT
            };
            return Some(Reply::plain(hint));
        }

        let show_menu = commands.iter().any(|c| c.command == CommandKind::Start);
        debug!(count = commands.len(), "parsed commands");

        let results = match self.run_batch(identity, &commands).await {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, "batch aborted");
                return Some(Reply::plain(batch_error(&err)));
            }
        };

        let (text, keyboard) = format_batch(results)?;
        Some(Reply {
            text,
            keyboard,
            show_menu,
        })
    }

    /// Handle one inline-button tap carrying `data`.
    pub async fn on_callback(&self, identity: Option<&UserIdentity>, data: &str) -> CallbackReply {
        let Some(target) = callback::decode(data) else {
            debug!(data, "undecodable callback data");
            return CallbackReply {
                notice: Some(UNSUPPORTED_ACTION),
                reply: None,
            };
        };

        let outcome = match identity {
            Some(identity) => {
                self.queue
                    .enqueue(
                        identity.telegram_id.clone(),
                        self.dispatcher.run_callback(Some(identity), &target),
                    )
                    .await
            }
            None => self.dispatcher.run_callback(None, &target).await,
        };

        match outcome {
            Ok(result) => CallbackReply {
                notice: None,
                reply: Some(Reply {
                    text: result.message,
                    keyboard: result.keyboard,
                    show_menu: false,
                }),
            },
            Err(err) => {
                warn!(error = %err, action = ?target.kind(), "callback failed");
                CallbackReply {
                    notice: Some("Something went wrong"),
                    reply: Some(Reply::plain(batch_error(&err))),
                }
            }
        }
    }

    async fn run_batch(
        &self,
        identity: Option<&UserIdentity>,
        commands: &[ParsedCommand],
    ) -> Result<Vec<ExecutionResult>> {
        match identity {
            Some(identity) => {
                self.queue
                    .enqueue(
                        identity.telegram_id.clone(),
                        self.dispatcher.run(Some(identity), commands),
                    )
                    .await
            }
            None => self.dispatcher.run(None, commands).await,
        }
    }
}

fn batch_error(err: &crate::Error) -> String {
    format!("⚠️ Something went wrong: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        domain::WalletId,
        keyboards::AppLinks,
        testing::{alice, FakeTracker},
    };

    fn inbound(tracker: Arc<FakeTracker>) -> Inbound {
        Inbound::new(Arc::new(Dispatcher::new(tracker, AppLinks::default(), 5)))
    }

    #[tokio::test]
    async fn unknown_slash_command_vs_chatter() {
        let bot = inbound(Arc::new(FakeTracker::default()));
        let me = alice();

        let reply = bot.on_text(Some(&me), "/frobnicate now").await.unwrap();
        assert_eq!(reply.text, render::UNRECOGNIZED);

        let reply = bot.on_text(Some(&me), "hello there").await.unwrap();
        assert_eq!(reply.text, render::CHATTER_HINT);

        assert!(bot.on_text(Some(&me), "  \n ").await.is_none());
    }

    #[tokio::test]
    async fn multi_command_reply_is_framed() {
        let bot = inbound(Arc::new(FakeTracker::default()));
        let reply = bot
            .on_text(Some(&alice()), "/track eth 0xabc\n\n/list")
            .await
            .unwrap();

        assert!(reply.text.starts_with("2 commands processed\n\n1. Line 1:\n✅"));
        assert!(reply.text.contains("\n\n2. Line 3:\n📋 Tracked wallets (1)"));
        // Last keyboard wins: the wallet list.
        let kb = reply.keyboard.unwrap();
        assert_eq!(kb.callback_data(), vec!["wallet_menu:1"]);
        assert!(!reply.show_menu);
    }

    #[tokio::test]
    async fn start_asks_for_the_reply_menu() {
        let bot = inbound(Arc::new(FakeTracker::default()));
        let reply = bot.on_text(Some(&alice()), "/start").await.unwrap();
        assert!(reply.show_menu);
    }

    #[tokio::test]
    async fn backend_failure_stays_inside_its_own_entry() {
        let tracker = Arc::new(FakeTracker {
            broken_list: true,
            ..Default::default()
        });
        let bot = inbound(tracker.clone());
        let reply = bot
            .on_text(Some(&alice()), "/list\n/track eth 0xabc")
            .await
            .unwrap();

        assert!(reply
            .text
            .starts_with("2 commands processed\n\n1. Line 1:\n❌ Command failed:"));
        assert!(reply.text.contains("\n\n2. Line 2:\n✅ Tracking wallet #1"));
        assert_eq!(tracker.calls(), vec!["list", "track 0xabc"]);
    }

    #[tokio::test]
    async fn aborted_batch_becomes_one_error_reply() {
        let tracker = Arc::new(FakeTracker::default());
        tracker.seed_wallet(WalletId(u64::MAX));
        let bot = Inbound::new(Arc::new(Dispatcher::new(
            tracker.clone(),
            AppLinks::default(),
            u32::MAX,
        )));

        let reply = bot
            .on_text(Some(&alice()), "/history 18446744073709551615\n/list")
            .await
            .unwrap();
        assert!(reply.text.starts_with("⚠️ Something went wrong"));
        assert!(reply.keyboard.is_none());
        assert_eq!(tracker.calls().len(), 1);
    }

    #[tokio::test]
    async fn same_user_messages_run_in_arrival_order() {
        let tracker = Arc::new(FakeTracker {
            track_delay: Some(Duration::from_millis(40)),
            ..Default::default()
        });
        let bot = inbound(tracker.clone());
        let me = alice();

        let first = bot.on_text(Some(&me), "/track eth 0xabc");
        let second = bot.on_text(Some(&me), "/list");
        let (_, listed) = tokio::join!(first, second);

        // The list ran after the slow track finished.
        assert!(listed.unwrap().text.contains("Tracked wallets (1)"));
        assert_eq!(tracker.calls(), vec!["track 0xabc", "list"]);
    }

    #[tokio::test]
    async fn callback_flow() {
        let tracker = Arc::new(FakeTracker::default());
        let bot = inbound(tracker.clone());
        let me = alice();
        bot.on_text(Some(&me), "/track eth 0xabc").await.unwrap();

        let out = bot.on_callback(Some(&me), "not_a_callback").await;
        assert_eq!(out.notice, Some(UNSUPPORTED_ACTION));
        assert!(out.reply.is_none());

        let out = bot.on_callback(Some(&me), "wallet_menu:1").await;
        assert!(out.notice.is_none());
        let reply = out.reply.unwrap();
        assert!(reply.text.starts_with("👛 Wallet #1"));
        assert!(reply.keyboard.is_some());

        let out = bot.on_callback(Some(&me), "wallet_untrack:7").await;
        assert_eq!(
            out.reply.unwrap().text,
            "❌ Command failed: wallet #7 not found"
        );
    }
}
