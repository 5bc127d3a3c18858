//! Routes parsed commands and decoded callbacks to the tracking service.
//!
//! The dispatcher owns no business logic. It checks the identity
//! precondition, shapes arguments, calls the service and renders the outcome.
//! Any error from the service becomes a per-command failure message and the
//! batch goes on. Only a failure to build the reply itself (an oversized
//! callback payload) aborts the rest of the batch.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    callback::{CallbackTarget, IGNORE_24H_MINUTES},
    commands::{CommandKind, ParsedCommand},
    domain::{resolve_chain, HistoryDirection, HistoryKind, UserIdentity, WalletId},
    errors::Error,
    keyboards::{self, AppLinks},
    messaging::types::Keyboard,
    ports::{HistoryQuery, TrackWalletInput, TrackingService},
    render, Result,
};

pub const NOT_IDENTIFIED: &str = "⚠️ Could not identify your Telegram account.";

const DEFAULT_MUTE_MINUTES: u32 = 60;

/// Outcome of one command or one button tap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Line the command came from; 0 for callbacks.
    pub source_line: usize,
    pub message: String,
    pub keyboard: Option<Keyboard>,
}

/// Text plus optional keyboard, before it is tied to a source line.
struct Reply {
    message: String,
    keyboard: Option<Keyboard>,
}

impl Reply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(message: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            message: message.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Bad or missing arguments for a command; rendered as its usage text.
#[derive(Debug)]
struct Usage(CommandKind);

pub struct Dispatcher {
    tracker: Arc<dyn TrackingService>,
    links: AppLinks,
    page_size: u32,
}

impl Dispatcher {
    pub fn new(tracker: Arc<dyn TrackingService>, links: AppLinks, page_size: u32) -> Self {
        Self {
            tracker,
            links,
            page_size: page_size.max(1),
        }
    }

    /// Execute a batch in order, one result per command.
    pub async fn run(
        &self,
        identity: Option<&UserIdentity>,
        commands: &[ParsedCommand],
    ) -> Result<Vec<ExecutionResult>> {
        let mut out = Vec::with_capacity(commands.len());
        for cmd in commands {
            info!(
                user = identity.map(|i| i.telegram_id.as_str()).unwrap_or("-"),
                command = cmd.command.name(),
                line = cmd.source_line,
                "dispatching command"
            );
            let reply = self.run_command(identity, cmd).await;
            out.push(settle(cmd.source_line, reply)?);
        }
        Ok(out)
    }

    pub async fn run_callback(
        &self,
        identity: Option<&UserIdentity>,
        target: &CallbackTarget,
    ) -> Result<ExecutionResult> {
        info!(
            user = identity.map(|i| i.telegram_id.as_str()).unwrap_or("-"),
            action = ?target.kind(),
            "dispatching callback"
        );
        let reply = match identity {
            Some(identity) => self.callback(identity, target).await,
            None => Ok(Reply::text(NOT_IDENTIFIED)),
        };
        settle(0, reply)
    }

    async fn run_command(
        &self,
        identity: Option<&UserIdentity>,
        cmd: &ParsedCommand,
    ) -> Result<Reply> {
        let identity = match identity {
            Some(identity) => identity,
            None if needs_identity(cmd.command) => return Ok(Reply::text(NOT_IDENTIFIED)),
            None => return Ok(self.stateless(cmd.command)),
        };

        let args = &cmd.args;
        match cmd.command {
            CommandKind::Help | CommandKind::App => Ok(self.stateless(cmd.command)),
            CommandKind::Start => self.start(identity).await,
            CommandKind::Track => match track_args(args) {
                Ok(input) => self.track(identity, input).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::List => self.list(identity).await,
            CommandKind::Wallet => match wallet_id_arg(args, CommandKind::Wallet) {
                Ok(wallet) => self.wallet(identity, wallet).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::Untrack => match wallet_id_arg(args, CommandKind::Untrack) {
                Ok(wallet) => self.untrack(identity, wallet).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::Mute => match mute_args(args) {
                Ok((wallet, minutes)) => self.mute(identity, wallet, minutes).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::Unmute => match wallet_id_arg(args, CommandKind::Unmute) {
                Ok(wallet) => self.unmute(identity, wallet).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::History => match history_args(args, self.page_size) {
                Ok(query) => self.history(identity, query).await,
                Err(usage) => Ok(usage.into()),
            },
            CommandKind::Filters => {
                if args.is_empty() {
                    self.global_filter(identity).await
                } else {
                    match wallet_id_arg(args, CommandKind::Filters) {
                        Ok(wallet) => self.wallet_filters(identity, wallet).await,
                        Err(usage) => Ok(usage.into()),
                    }
                }
            }
        }
    }

    async fn callback(&self, identity: &UserIdentity, target: &CallbackTarget) -> Result<Reply> {
        let tracker = &self.tracker;
        match *target {
            CallbackTarget::Menu { wallet_id } => self.wallet(identity, wallet_id).await,
            CallbackTarget::History { wallet_id } => {
                self.history(identity, self.first_page(wallet_id)).await
            }
            CallbackTarget::Untrack { wallet_id } => self.untrack(identity, wallet_id).await,
            CallbackTarget::Mute { wallet_id, minutes } => {
                self.mute(identity, wallet_id, minutes).await
            }
            CallbackTarget::Ignore24h { wallet_id } => {
                self.mute(identity, wallet_id, IGNORE_24H_MINUTES).await
            }
            CallbackTarget::WalletFilterView { wallet_id } => {
                self.wallet_filters(identity, wallet_id).await
            }
            CallbackTarget::WalletFilterToggle {
                wallet_id,
                target,
                enabled,
            } => {
                let filters = tracker
                    .set_wallet_filter(identity, wallet_id, target, enabled)
                    .await?;
                Ok(Reply::with_keyboard(
                    render::wallet_filters(wallet_id, &filters),
                    keyboards::wallet_filters(wallet_id, &filters)?,
                ))
            }
            CallbackTarget::GlobalFilterView => self.global_filter(identity).await,
            CallbackTarget::GlobalFilterMode { mode } => {
                let filter = tracker.set_global_dex_mode(identity, mode).await?;
                global_filter_reply(&filter)
            }
            CallbackTarget::GlobalFilterToggle { mode, dex, enabled } => {
                let filter = tracker
                    .toggle_global_dex(identity, mode, dex, enabled)
                    .await?;
                global_filter_reply(&filter)
            }
            CallbackTarget::GlobalFilterReset { mode } => {
                let filter = tracker.reset_global_dex(identity, mode).await?;
                global_filter_reply(&filter)
            }
            CallbackTarget::HistoryPage {
                wallet_id,
                offset,
                limit,
                kind,
                direction,
            } => {
                let query = HistoryQuery {
                    wallet_id,
                    offset,
                    limit,
                    kind,
                    direction,
                };
                self.history(identity, query).await
            }
            CallbackTarget::HistoryRefresh {
                wallet_id,
                limit,
                kind,
                direction,
            } => {
                let query = HistoryQuery {
                    wallet_id,
                    offset: 0,
                    limit,
                    kind,
                    direction,
                };
                self.history(identity, query).await
            }
        }
    }

    fn first_page(&self, wallet_id: WalletId) -> HistoryQuery {
        HistoryQuery {
            wallet_id,
            offset: 0,
            limit: self.page_size,
            kind: HistoryKind::All,
            direction: HistoryDirection::All,
        }
    }

    /// Help and App never touch per-user state.
    fn stateless(&self, kind: CommandKind) -> Reply {
        if kind == CommandKind::Help {
            return Reply::text(render::help(self.links.mini_app_url.is_some()));
        }
        match keyboards::mini_app(&self.links) {
            Some(kb) => Reply::with_keyboard(render::APP_PROMPT, kb),
            None => Reply::text(render::APP_UNAVAILABLE),
        }
    }

    async fn start(&self, identity: &UserIdentity) -> Result<Reply> {
        let user = self.tracker.find_or_create_user(identity).await?;
        debug!(user_id = user.id, "user registered");
        let text = render::welcome(&user, self.links.mini_app_url.is_some());
        Ok(match keyboards::mini_app(&self.links) {
            Some(kb) => Reply::with_keyboard(text, kb),
            None => Reply::text(text),
        })
    }

    async fn track(&self, identity: &UserIdentity, input: TrackWalletInput) -> Result<Reply> {
        let wallet = self.tracker.track_wallet(identity, input).await?;
        Ok(Reply::with_keyboard(
            render::tracked(&wallet),
            keyboards::wallet_menu(wallet.id, false, &self.links)?,
        ))
    }

    async fn list(&self, identity: &UserIdentity) -> Result<Reply> {
        let wallets = self.tracker.list_wallets(identity).await?;
        if wallets.is_empty() {
            return Ok(Reply::text(render::NO_WALLETS));
        }
        Ok(Reply::with_keyboard(
            render::wallet_list(&wallets),
            keyboards::wallet_list(&wallets)?,
        ))
    }

    async fn wallet(&self, identity: &UserIdentity, wallet: WalletId) -> Result<Reply> {
        let detail = self.tracker.wallet_detail(identity, wallet).await?;
        let muted = detail.wallet.muted_until.is_some();
        Ok(Reply::with_keyboard(
            render::wallet_detail(&detail),
            keyboards::wallet_menu(wallet, muted, &self.links)?,
        ))
    }

    async fn untrack(&self, identity: &UserIdentity, wallet: WalletId) -> Result<Reply> {
        let removed = self.tracker.remove_wallet(identity, wallet).await?;
        Ok(Reply::text(render::untracked(&removed)))
    }

    async fn mute(&self, identity: &UserIdentity, wallet: WalletId, minutes: u32) -> Result<Reply> {
        let muted = self.tracker.mute_wallet(identity, wallet, minutes).await?;
        Ok(Reply::with_keyboard(
            render::muted(&muted, minutes),
            keyboards::wallet_menu(wallet, true, &self.links)?,
        ))
    }

    async fn unmute(&self, identity: &UserIdentity, wallet: WalletId) -> Result<Reply> {
        let unmuted = self.tracker.unmute_wallet(identity, wallet).await?;
        Ok(Reply::with_keyboard(
            render::unmuted(&unmuted),
            keyboards::wallet_menu(wallet, false, &self.links)?,
        ))
    }

    async fn history(&self, identity: &UserIdentity, query: HistoryQuery) -> Result<Reply> {
        let page = self.tracker.wallet_history(identity, query).await?;
        Ok(Reply::with_keyboard(
            render::history(&page, &query),
            keyboards::history(&query, page.has_more)?,
        ))
    }

    async fn wallet_filters(&self, identity: &UserIdentity, wallet: WalletId) -> Result<Reply> {
        let filters = self.tracker.wallet_filters(identity, wallet).await?;
        Ok(Reply::with_keyboard(
            render::wallet_filters(wallet, &filters),
            keyboards::wallet_filters(wallet, &filters)?,
        ))
    }

    async fn global_filter(&self, identity: &UserIdentity) -> Result<Reply> {
        let filter = self.tracker.global_dex_filter(identity).await?;
        global_filter_reply(&filter)
    }
}

fn global_filter_reply(filter: &crate::ports::GlobalDexFilter) -> Result<Reply> {
    Ok(Reply::with_keyboard(
        render::global_filter(filter),
        keyboards::global_filter(filter)?,
    ))
}

fn needs_identity(kind: CommandKind) -> bool {
    !matches!(kind, CommandKind::Help | CommandKind::App)
}

/// Turn a handler outcome into a result, or abort the batch.
fn settle(source_line: usize, reply: Result<Reply>) -> Result<ExecutionResult> {
    let reason = match reply {
        Ok(reply) => {
            return Ok(ExecutionResult {
                source_line,
                message: reply.message,
                keyboard: reply.keyboard,
            })
        }
        Err(err @ Error::CallbackTooLong { .. }) => return Err(err),
        Err(Error::Rejected(reason)) => {
            debug!(line = source_line, %reason, "command rejected");
            reason
        }
        Err(other) => {
            warn!(line = source_line, error = %other, "tracking service call failed");
            other.to_string()
        }
    };
    Ok(ExecutionResult {
        source_line,
        message: render::failed(&reason),
        keyboard: None,
    })
}

impl From<Usage> for Reply {
    fn from(usage: Usage) -> Self {
        Reply::text(render::usage(usage.0))
    }
}

fn parse_wallet_id(raw: &str) -> Option<WalletId> {
    let raw = raw.strip_prefix('#').unwrap_or(raw);
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().map(WalletId)
}

fn wallet_id_arg(args: &[String], kind: CommandKind) -> std::result::Result<WalletId, Usage> {
    args.first()
        .and_then(|a| parse_wallet_id(a))
        .ok_or(Usage(kind))
}

fn track_args(args: &[String]) -> std::result::Result<TrackWalletInput, Usage> {
    let usage = || Usage(CommandKind::Track);
    let chain = args.first().and_then(|a| resolve_chain(a)).ok_or_else(usage)?;
    let address = args.get(1).cloned().ok_or_else(usage)?;
    let label = args[2..].join(" ");
    Ok(TrackWalletInput {
        chain,
        address,
        label: (!label.trim().is_empty()).then(|| label.trim().to_string()),
    })
}

fn mute_args(args: &[String]) -> std::result::Result<(WalletId, u32), Usage> {
    let wallet = wallet_id_arg(args, CommandKind::Mute)?;
    let minutes = match args.get(1) {
        None => DEFAULT_MUTE_MINUTES,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .ok_or(Usage(CommandKind::Mute))?,
    };
    Ok((wallet, minutes))
}

fn history_args(args: &[String], page_size: u32) -> std::result::Result<HistoryQuery, Usage> {
    let usage = || Usage(CommandKind::History);
    let wallet_id = wallet_id_arg(args, CommandKind::History)?;
    let kind = match args.get(1) {
        Some(raw) => HistoryKind::from_token(raw).ok_or_else(usage)?,
        None => HistoryKind::All,
    };
    let direction = match args.get(2) {
        Some(raw) => HistoryDirection::from_token(raw).ok_or_else(usage)?,
        None => HistoryDirection::All,
    };
    Ok(HistoryQuery {
        wallet_id,
        offset: 0,
        limit: page_size,
        kind,
        direction,
    })
}
