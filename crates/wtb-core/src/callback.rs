//! Inline-keyboard callback data.
//!
//! Wire form: `<prefix>[:<field>]*`, decimal numbers, lower-case tokens.
//! Telegram caps callback data at 64 bytes, so the encoder refuses anything
//! longer. Decoding runs an ordered cascade of prefix matchers; a malformed
//! payload is "no match", never an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    domain::{
        on_off_token, parse_on_off, DexFilterMode, DexKey, HistoryDirection, HistoryKind,
        WalletFilterTarget, WalletId,
    },
    errors::Error,
    Result,
};

/// Telegram's callback_data limit, in bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Minutes applied by the "ignore for 24h" button.
pub const IGNORE_24H_MINUTES: u32 = 1440;

const MENU: &str = "wallet_menu:";
const HISTORY: &str = "wallet_history:";
const HISTORY_PAGE: &str = "wallet_history_page:";
const HISTORY_REFRESH: &str = "wallet_history_refresh:";
const UNTRACK: &str = "wallet_untrack:";
/// `wallet_mute:<id>:<minutes>`: the wallet id travels with the duration.
const MUTE: &str = "wallet_mute:";
const IGNORE_24H: &str = "wallet_ignore_24h:";
const FILTER_VIEW: &str = "wallet_filter_view:";
const FILTER_TOGGLE: &str = "wallet_filter_toggle:";
const GLOBAL_FILTER: &str = "global_filter";
const GLOBAL_MODE: &str = "global_filter_mode:";
const GLOBAL_RESET: &str = "global_filter_reset:";
const GLOBAL_TOGGLE: &str = "global_filter_toggle:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackActionKind {
    Menu,
    History,
    Untrack,
    Mute,
    Ignore24h,
    WalletFilterView,
    WalletFilterToggle,
    GlobalFilterView,
    GlobalFilterMode,
    GlobalFilterToggle,
    GlobalFilterReset,
    HistoryPage,
    HistoryRefresh,
}

/// Decoded button action. Each variant carries exactly the fields it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackTarget {
    Menu {
        wallet_id: WalletId,
    },
    History {
        wallet_id: WalletId,
    },
    Untrack {
        wallet_id: WalletId,
    },
    Mute {
        wallet_id: WalletId,
        minutes: u32,
    },
    Ignore24h {
        wallet_id: WalletId,
    },
    WalletFilterView {
        wallet_id: WalletId,
    },
    WalletFilterToggle {
        wallet_id: WalletId,
        target: WalletFilterTarget,
        enabled: bool,
    },
    GlobalFilterView,
    GlobalFilterMode {
        mode: DexFilterMode,
    },
    GlobalFilterToggle {
        mode: DexFilterMode,
        dex: DexKey,
        enabled: bool,
    },
    GlobalFilterReset {
        mode: DexFilterMode,
    },
    HistoryPage {
        wallet_id: WalletId,
        offset: u32,
        limit: u32,
        kind: HistoryKind,
        direction: HistoryDirection,
    },
    HistoryRefresh {
        wallet_id: WalletId,
        limit: u32,
        kind: HistoryKind,
        direction: HistoryDirection,
    },
}

impl CallbackTarget {
    pub fn kind(&self) -> CallbackActionKind {
        match self {
            CallbackTarget::Menu { .. } => CallbackActionKind::Menu,
            CallbackTarget::History { .. } => CallbackActionKind::History,
            CallbackTarget::Untrack { .. } => CallbackActionKind::Untrack,
            CallbackTarget::Mute { .. } => CallbackActionKind::Mute,
            CallbackTarget::Ignore24h { .. } => CallbackActionKind::Ignore24h,
            CallbackTarget::WalletFilterView { .. } => CallbackActionKind::WalletFilterView,
            CallbackTarget::WalletFilterToggle { .. } => CallbackActionKind::WalletFilterToggle,
            CallbackTarget::GlobalFilterView => CallbackActionKind::GlobalFilterView,
            CallbackTarget::GlobalFilterMode { .. } => CallbackActionKind::GlobalFilterMode,
            CallbackTarget::GlobalFilterToggle { .. } => CallbackActionKind::GlobalFilterToggle,
            CallbackTarget::GlobalFilterReset { .. } => CallbackActionKind::GlobalFilterReset,
            CallbackTarget::HistoryPage { .. } => CallbackActionKind::HistoryPage,
            CallbackTarget::HistoryRefresh { .. } => CallbackActionKind::HistoryRefresh,
        }
    }
}

/// Encode a target into callback data, enforcing the 64-byte limit.
pub fn encode(target: &CallbackTarget) -> Result<String> {
    let data = match target {
        CallbackTarget::Menu { wallet_id } => format!("{MENU}{wallet_id}"),
        CallbackTarget::History { wallet_id } => format!("{HISTORY}{wallet_id}"),
        CallbackTarget::Untrack { wallet_id } => format!("{UNTRACK}{wallet_id}"),
        CallbackTarget::Mute { wallet_id, minutes } => format!("{MUTE}{wallet_id}:{minutes}"),
        CallbackTarget::Ignore24h { wallet_id } => format!("{IGNORE_24H}{wallet_id}"),
        CallbackTarget::WalletFilterView { wallet_id } => format!("{FILTER_VIEW}{wallet_id}"),
        CallbackTarget::WalletFilterToggle {
            wallet_id,
            target,
            enabled,
        } => format!(
            "{FILTER_TOGGLE}{wallet_id}:{}:{}",
            target.token(),
            on_off_token(*enabled)
        ),
        CallbackTarget::GlobalFilterView => GLOBAL_FILTER.to_string(),
        CallbackTarget::GlobalFilterMode { mode } => format!("{GLOBAL_MODE}{}", mode.token()),
        CallbackTarget::GlobalFilterToggle { mode, dex, enabled } => format!(
            "{GLOBAL_TOGGLE}{}:{}:{}",
            mode.token(),
            dex.token(),
            on_off_token(*enabled)
        ),
        CallbackTarget::GlobalFilterReset { mode } => format!("{GLOBAL_RESET}{}", mode.token()),
        CallbackTarget::HistoryPage {
            wallet_id,
            offset,
            limit,
            kind,
            direction,
        } => format!(
            "{HISTORY_PAGE}{wallet_id}:{offset}:{limit}:{}:{}",
            kind.token(),
            direction.token()
        ),
        CallbackTarget::HistoryRefresh {
            wallet_id,
            limit,
            kind,
            direction,
        } => format!(
            "{HISTORY_REFRESH}{wallet_id}:{limit}:{}:{}",
            kind.token(),
            direction.token()
        ),
    };

    if data.len() > CALLBACK_DATA_LIMIT {
        return Err(Error::CallbackTooLong {
            len: data.len(),
            limit: CALLBACK_DATA_LIMIT,
        });
    }
    Ok(data)
}

type Matcher = fn(&str) -> Option<CallbackTarget>;

/// Checked in order; longer prefixes come before the shorter ones they extend.
const MATCHERS: &[(&str, Matcher)] = &[
    (HISTORY_REFRESH, decode_history_refresh),
    (HISTORY_PAGE, decode_history_page),
    (HISTORY, decode_history),
    (FILTER_TOGGLE, decode_filter_toggle),
    (FILTER_VIEW, decode_filter_view),
    (MENU, decode_menu),
    (UNTRACK, decode_untrack),
    (MUTE, decode_mute),
    (IGNORE_24H, decode_ignore_24h),
    (GLOBAL_TOGGLE, decode_global_toggle),
    (GLOBAL_RESET, decode_global_reset),
    (GLOBAL_MODE, decode_global_mode),
    (GLOBAL_FILTER, decode_global_view),
];

/// Decode callback data. `None` means "unsupported action".
pub fn decode(data: &str) -> Option<CallbackTarget> {
    MATCHERS.iter().find_map(|(prefix, matcher)| {
        let payload = data.strip_prefix(prefix)?;
        matcher(payload)
    })
}

fn fields(payload: &str, arity: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = payload.split(':').collect();
    (parts.len() == arity).then_some(parts)
}

fn digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").expect("valid regex"))
}

fn int<T: std::str::FromStr>(raw: &str) -> Option<T> {
    if !digits().is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

fn wallet_id(raw: &str) -> Option<WalletId> {
    int(raw).map(WalletId)
}

/// Simple wallet actions tolerate a leading `#` (as shown in wallet lists).
fn hashed_wallet_id(raw: &str) -> Option<WalletId> {
    wallet_id(raw.strip_prefix('#').unwrap_or(raw))
}

fn single_wallet(payload: &str) -> Option<WalletId> {
    let f = fields(payload, 1)?;
    hashed_wallet_id(f[0])
}

fn decode_menu(payload: &str) -> Option<CallbackTarget> {
    single_wallet(payload).map(|wallet_id| CallbackTarget::Menu { wallet_id })
}

fn decode_history(payload: &str) -> Option<CallbackTarget> {
    single_wallet(payload).map(|wallet_id| CallbackTarget::History { wallet_id })
}

fn decode_untrack(payload: &str) -> Option<CallbackTarget> {
    single_wallet(payload).map(|wallet_id| CallbackTarget::Untrack { wallet_id })
}

fn decode_mute(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 2)?;
    Some(CallbackTarget::Mute {
        wallet_id: wallet_id(f[0])?,
        minutes: int(f[1])?,
    })
}

fn decode_ignore_24h(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 1)?;
    Some(CallbackTarget::Ignore24h {
        wallet_id: wallet_id(f[0])?,
    })
}

fn decode_filter_view(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 1)?;
    Some(CallbackTarget::WalletFilterView {
        wallet_id: wallet_id(f[0])?,
    })
}

fn decode_filter_toggle(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 3)?;
    Some(CallbackTarget::WalletFilterToggle {
        wallet_id: wallet_id(f[0])?,
        target: WalletFilterTarget::from_token(f[1])?,
        enabled: parse_on_off(f[2])?,
    })
}

/// Optional trailing `kind:direction` pair; both default to `all`.
fn history_filters(rest: &[&str]) -> Option<(HistoryKind, HistoryDirection)> {
    match rest {
        [] => Some((HistoryKind::All, HistoryDirection::All)),
        [kind, direction] => Some((
            HistoryKind::from_token(kind)?,
            HistoryDirection::from_token(direction)?,
        )),
        _ => None,
    }
}

fn decode_history_page(payload: &str) -> Option<CallbackTarget> {
    let f: Vec<&str> = payload.split(':').collect();
    if f.len() != 3 && f.len() != 5 {
        return None;
    }
    let (kind, direction) = history_filters(&f[3..])?;
    Some(CallbackTarget::HistoryPage {
        wallet_id: wallet_id(f[0])?,
        offset: int(f[1])?,
        limit: int(f[2])?,
        kind,
        direction,
    })
}

fn decode_history_refresh(payload: &str) -> Option<CallbackTarget> {
    let f: Vec<&str> = payload.split(':').collect();
    if f.len() != 2 && f.len() != 4 {
        return None;
    }
    let (kind, direction) = history_filters(&f[2..])?;
    Some(CallbackTarget::HistoryRefresh {
        wallet_id: wallet_id(f[0])?,
        limit: int(f[1])?,
        kind,
        direction,
    })
}

fn decode_global_view(payload: &str) -> Option<CallbackTarget> {
    payload.is_empty().then_some(CallbackTarget::GlobalFilterView)
}

fn decode_global_mode(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 1)?;
    Some(CallbackTarget::GlobalFilterMode {
        mode: DexFilterMode::from_token(f[0])?,
    })
}

fn decode_global_reset(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 1)?;
    Some(CallbackTarget::GlobalFilterReset {
        mode: DexFilterMode::from_token(f[0])?,
    })
}

fn decode_global_toggle(payload: &str) -> Option<CallbackTarget> {
    let f = fields(payload, 3)?;
    Some(CallbackTarget::GlobalFilterToggle {
        mode: DexFilterMode::from_token(f[0])?,
        dex: DexKey::from_token(f[1])?,
        enabled: parse_on_off(f[2])?,
    })
}
