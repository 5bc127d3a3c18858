//! User-facing reply texts.

use chrono::{DateTime, Utc};

use crate::{
    commands::CommandKind,
    domain::{DexFilterMode, HistoryDirection, HistoryKind, WalletFilterTarget, WalletId},
    formatting::short_address,
    ports::{
        GlobalDexFilter, HistoryEvent, HistoryPage, HistoryQuery, User, WalletDetail,
        WalletFilters, WalletSummary,
    },
};

pub const NO_WALLETS: &str =
    "You are not tracking any wallets yet.\nSend /track <chain> <address> [label] to add one.";
pub const APP_PROMPT: &str = "📱 Manage your wallets in the app:";
pub const APP_UNAVAILABLE: &str = "📱 The mini app is not available right now.";
pub const UNRECOGNIZED: &str = "🤔 Unrecognized command. Send /help to see what I understand.";
pub const CHATTER_HINT: &str = "Send /help to see what I can do.";

pub fn help(app_available: bool) -> String {
    let mut text = String::from(
        "🤖 Wallet tracker commands\n\n\
         /track <chain> <address> [label] - start tracking a wallet\n\
         /list - your tracked wallets\n\
         /wallet <id> - wallet details\n\
         /history <id> [all|transfer|swap] [all|in|out] - recent activity\n\
         /mute <id> [minutes] - pause alerts\n\
         /unmute <id> - resume alerts\n\
         /untrack <id> - stop tracking\n\
         /filters [id] - DEX filters, or alert filters for one wallet\n\
         /help - this message\n\n\
         Chains: eth, sol, tron. Several commands can be sent at once, one per line.",
    );
    if app_available {
        text.push_str("\n/app - open the mini app");
    }
    text
}

pub fn welcome(user: &User, app_available: bool) -> String {
    let name = user
        .username
        .as_deref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "there".to_string());
    format!("👋 Welcome, {name}!\n\n{}", help(app_available))
}

pub fn usage(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Track => {
            "Usage: /track <chain> <address> [label]\nChains: eth, sol, tron.\n\
             Each extra line after /track is read as another wallet."
        }
        CommandKind::Wallet => "Usage: /wallet <id>",
        CommandKind::Untrack => "Usage: /untrack <id>",
        CommandKind::Mute => "Usage: /mute <id> [minutes]",
        CommandKind::Unmute => "Usage: /unmute <id>",
        CommandKind::History => "Usage: /history <id> [all|transfer|swap] [all|in|out]",
        CommandKind::Filters => "Usage: /filters [id]",
        CommandKind::Start | CommandKind::Help | CommandKind::List | CommandKind::App => {
            "Send /help to see the available commands."
        }
    }
}

pub fn failed(reason: &str) -> String {
    format!("❌ Command failed: {reason}")
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn wallet_name(w: &WalletSummary) -> String {
    match &w.label {
        Some(label) => format!("{label} ({})", short_address(&w.address)),
        None => short_address(&w.address),
    }
}

pub fn wallet_line(w: &WalletSummary) -> String {
    let mut line = format!("#{} · {} · {}", w.id, w.chain.as_str(), wallet_name(w));
    if let Some(until) = &w.muted_until {
        line.push_str(&format!(" · 🔕 until {}", timestamp(until)));
    }
    line
}

pub fn wallet_list(wallets: &[WalletSummary]) -> String {
    let mut text = format!("📋 Tracked wallets ({})\n", wallets.len());
    for w in wallets {
        text.push('\n');
        text.push_str(&wallet_line(w));
    }
    text
}

pub fn tracked(w: &WalletSummary) -> String {
    format!(
        "✅ Tracking wallet #{} on {}\n{}",
        w.id,
        w.chain.as_str(),
        w.address
    )
}

pub fn untracked(w: &WalletSummary) -> String {
    format!("🗑 Stopped tracking #{} · {}", w.id, wallet_name(w))
}

pub fn muted(w: &WalletSummary, minutes: u32) -> String {
    let until = w
        .muted_until
        .as_ref()
        .map(|t| format!(" (until {})", timestamp(t)))
        .unwrap_or_default();
    format!(
        "🔕 Alerts for #{} muted for {}{until}",
        w.id,
        duration(minutes)
    )
}

pub fn unmuted(w: &WalletSummary) -> String {
    format!("🔔 Alerts for #{} are back on", w.id)
}

fn duration(minutes: u32) -> String {
    match minutes {
        m if m % 1440 == 0 => format!("{}d", m / 1440),
        m if m % 60 == 0 => format!("{}h", m / 60),
        m => format!("{m}m"),
    }
}

pub fn wallet_detail(d: &WalletDetail) -> String {
    let w = &d.wallet;
    let mut text = format!(
        "👛 Wallet #{}\nChain: {}\nAddress: {}",
        w.id,
        w.chain.as_str(),
        w.address
    );
    if let Some(label) = &w.label {
        text.push_str(&format!("\nLabel: {label}"));
    }
    text.push_str(&format!("\nEvents (24h): {}", d.events_last_24h));
    text.push_str(&format!("\nAlerts: {}", filter_summary(&d.filters)));
    if let Some(until) = &w.muted_until {
        text.push_str(&format!("\n🔕 Muted until {}", timestamp(until)));
    }
    text
}

fn filter_summary(filters: &WalletFilters) -> String {
    let on: Vec<&str> = WalletFilterTarget::ALL
        .iter()
        .filter(|t| filters.is_enabled(**t))
        .map(|t| t.token())
        .collect();
    if on.is_empty() {
        "none".to_string()
    } else {
        on.join(", ")
    }
}

fn event_line(e: &HistoryEvent) -> String {
    let arrow = match e.direction {
        HistoryDirection::In => "⬇️",
        HistoryDirection::Out => "⬆️",
        HistoryDirection::All => "↔️",
    };
    let mut line = format!(
        "{arrow} {} {} {} · {}",
        e.kind.token(),
        e.amount,
        e.token,
        timestamp(&e.occurred_at)
    );
    if let Some(dex) = e.dex {
        line.push_str(&format!(" · {}", dex.token()));
    }
    line.push_str(&format!("\n   {}", short_address(&e.tx_hash)));
    line
}

pub fn history(page: &HistoryPage, query: &HistoryQuery) -> String {
    let mut text = format!(
        "📜 History for #{} · {}",
        page.wallet.id,
        wallet_name(&page.wallet)
    );
    if query.kind != HistoryKind::All || query.direction != HistoryDirection::All {
        text.push_str(&format!(
            "\nFilter: {} / {}",
            query.kind.token(),
            query.direction.token()
        ));
    }
    if page.events.is_empty() {
        text.push_str(if query.offset == 0 {
            "\n\nNo activity yet."
        } else {
            "\n\nNo more activity."
        });
        return text;
    }
    for (i, e) in page.events.iter().enumerate() {
        let n = query.offset as usize + i + 1;
        text.push_str(&format!("\n\n{n}. {}", event_line(e)));
    }
    text
}

pub fn wallet_filters(wallet: WalletId, filters: &WalletFilters) -> String {
    format!(
        "🎛 Alert filters for #{wallet}\nEnabled: {}\nTap to toggle.",
        filter_summary(filters)
    )
}

pub fn global_filter(filter: &GlobalDexFilter) -> String {
    let listed = if filter.dexes.is_empty() {
        "none".to_string()
    } else {
        filter
            .dexes
            .iter()
            .map(|d| d.token())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let meaning = match filter.mode {
        DexFilterMode::Include => "Only swaps on these DEXes alert",
        DexFilterMode::Exclude => "Swaps on these DEXes are ignored",
    };
    format!(
        "⚙️ DEX filter · mode: {}\n{meaning}: {listed}",
        filter.mode.token()
    )
}
