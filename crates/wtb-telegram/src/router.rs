use std::sync::Arc;

use teloxide::{dispatching::Dispatcher as UpdateDispatcher, dptree, prelude::*};
use tracing::{info, warn};

use wtb_core::{
    config::Config,
    dispatcher::Dispatcher,
    domain::ChatId,
    formatting::split_text,
    inbound::{Inbound, Reply},
    keyboards::{self, AppLinks},
    messaging::port::MessagingPort,
    ports::TrackingService,
    Result,
};

use crate::handlers;
use crate::TelegramMessenger;

pub const MENU_PROMPT: &str = "Use the menu below for quick actions.";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub inbound: Inbound,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        tracker: Arc<dyn TrackingService>,
    ) -> Self {
        let links = AppLinks::new(cfg.mini_app_url.clone());
        let dispatcher = Dispatcher::new(tracker, links, cfg.history_page_size);
        Self {
            cfg,
            messenger,
            inbound: Inbound::new(Arc::new(dispatcher)),
        }
    }

    /// Send a reply, split to the configured limit. The keyboard goes on the
    /// last chunk so its buttons sit under the end of the text.
    pub async fn deliver(&self, chat_id: ChatId, reply: Reply) -> Result<()> {
        deliver(
            self.messenger.as_ref(),
            chat_id,
            reply,
            self.cfg.telegram_safe_limit,
        )
        .await
    }
}

pub(crate) async fn deliver(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    reply: Reply,
    limit: usize,
) -> Result<()> {
    let chunks = split_text(&reply.text, limit);
    let last = chunks.len().saturating_sub(1);
    let mut keyboard = reply.keyboard;
    for (i, chunk) in chunks.iter().enumerate() {
        let kb = if i == last { keyboard.take() } else { None };
        messenger.send_text(chat_id, chunk, kb).await?;
    }
    if reply.show_menu {
        messenger
            .send_menu(chat_id, MENU_PROMPT, &keyboards::reply_menu_labels())
            .await?;
    }
    Ok(())
}

pub async fn run_polling(cfg: Arc<Config>, tracker: Arc<dyn TrackingService>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(bot = %me.username(), "wallet tracker bot started"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        tracker = %cfg.tracker_api_url,
        mini_app = cfg.mini_app_url.is_some(),
        page_size = cfg.history_page_size,
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(cfg, messenger, tracker));

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    UpdateDispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
