//! Inline keyboards. Every callback button is built from a [`CallbackTarget`]
//! and goes through the encoder, so the 64-byte limit is enforced here.

use url::Url;

use crate::{
    callback::{encode, CallbackTarget},
    commands::MENU_BUTTONS,
    domain::{DexFilterMode, DexKey, HistoryDirection, HistoryKind, WalletFilterTarget, WalletId},
    formatting::short_address,
    messaging::types::{Keyboard, KeyboardButton},
    ports::{GlobalDexFilter, HistoryQuery, WalletFilters, WalletSummary},
    Result,
};

const MUTE_MINUTES: u32 = 60;
const DEX_PER_ROW: usize = 2;

/// Links out of the chat (mini-app).
#[derive(Clone, Debug, Default)]
pub struct AppLinks {
    pub mini_app_url: Option<Url>,
}

impl AppLinks {
    pub fn new(mini_app_url: Option<Url>) -> Self {
        Self { mini_app_url }
    }

    /// Mini-app URL, optionally deep-linked to one wallet.
    pub fn mini_app(&self, wallet: Option<WalletId>) -> Option<String> {
        let mut url = self.mini_app_url.clone()?;
        if let Some(wallet) = wallet {
            url.query_pairs_mut()
                .append_pair("startapp", &format!("wallet_{wallet}"));
        }
        Some(url.to_string())
    }
}

fn button(label: impl Into<String>, target: CallbackTarget) -> Result<KeyboardButton> {
    Ok(KeyboardButton::callback(label, encode(&target)?))
}

pub fn reply_menu_labels() -> Vec<&'static str> {
    MENU_BUTTONS.iter().map(|(label, _)| *label).collect()
}

pub fn wallet_list(wallets: &[WalletSummary]) -> Result<Keyboard> {
    let rows = wallets
        .iter()
        .map(|w| {
            let name = w
                .label
                .clone()
                .unwrap_or_else(|| short_address(&w.address));
            let label = format!("#{} {} · {}", w.id, name, w.chain.as_str());
            Ok(vec![button(label, CallbackTarget::Menu { wallet_id: w.id })?])
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Keyboard::new(rows))
}

pub fn wallet_menu(wallet_id: WalletId, muted: bool, links: &AppLinks) -> Result<Keyboard> {
    let mut rows = vec![
        vec![
            button("📜 History", CallbackTarget::History { wallet_id })?,
            button("🎛 Filters", CallbackTarget::WalletFilterView { wallet_id })?,
        ],
        vec![
            button(
                if muted { "🔕 Mute 1h more" } else { "🔕 Mute 1h" },
                CallbackTarget::Mute {
                    wallet_id,
                    minutes: MUTE_MINUTES,
                },
            )?,
            button("😴 Ignore 24h", CallbackTarget::Ignore24h { wallet_id })?,
        ],
        vec![button("🗑 Untrack", CallbackTarget::Untrack { wallet_id })?],
    ];
    if let Some(url) = links.mini_app(Some(wallet_id)) {
        rows.push(vec![KeyboardButton::web_app("📱 Open in app", url)]);
    }
    Ok(Keyboard::new(rows))
}

pub fn history(query: &HistoryQuery, has_more: bool) -> Result<Keyboard> {
    let HistoryQuery {
        wallet_id,
        offset,
        limit,
        kind,
        direction,
    } = *query;
    let page = |offset: u32, kind: HistoryKind, direction: HistoryDirection| {
        CallbackTarget::HistoryPage {
            wallet_id,
            offset,
            limit,
            kind,
            direction,
        }
    };

    let mut rows = Vec::new();

    let mut nav = Vec::new();
    if offset > 0 {
        nav.push(button(
            "⬅️ Newer",
            page(offset.saturating_sub(limit), kind, direction),
        )?);
    }
    if has_more {
        nav.push(button(
            "Older ➡️",
            page(offset.saturating_add(limit), kind, direction),
        )?);
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(
        HistoryKind::ALL
            .iter()
            .map(|k| {
                let label = mark(*k == kind, k.token());
                button(label, page(0, *k, direction))
            })
            .collect::<Result<Vec<_>>>()?,
    );
    rows.push(
        HistoryDirection::ALL
            .iter()
            .map(|d| {
                let label = mark(*d == direction, d.token());
                button(label, page(0, kind, *d))
            })
            .collect::<Result<Vec<_>>>()?,
    );

    rows.push(vec![
        button(
            "🔄 Refresh",
            CallbackTarget::HistoryRefresh {
                wallet_id,
                limit,
                kind,
                direction,
            },
        )?,
        button("↩️ Wallet", CallbackTarget::Menu { wallet_id })?,
    ]);

    Ok(Keyboard::new(rows))
}

pub fn wallet_filters(wallet_id: WalletId, filters: &WalletFilters) -> Result<Keyboard> {
    let mut rows = WalletFilterTarget::ALL
        .iter()
        .map(|target| {
            let enabled = filters.is_enabled(*target);
            let label = format!("{} {}", check(enabled), target.token());
            Ok(vec![button(
                label,
                CallbackTarget::WalletFilterToggle {
                    wallet_id,
                    target: *target,
                    enabled: !enabled,
                },
            )?])
        })
        .collect::<Result<Vec<_>>>()?;
    rows.push(vec![button("↩️ Wallet", CallbackTarget::Menu { wallet_id })?]);
    Ok(Keyboard::new(rows))
}

pub fn global_filter(filter: &GlobalDexFilter) -> Result<Keyboard> {
    let mode = filter.mode;
    let other = match mode {
        DexFilterMode::Include => DexFilterMode::Exclude,
        DexFilterMode::Exclude => DexFilterMode::Include,
    };

    let mut rows = vec![vec![button(
        format!("Mode: {} → {}", mode.token(), other.token()),
        CallbackTarget::GlobalFilterMode { mode: other },
    )?]];

    let toggles = DexKey::ALL
        .iter()
        .map(|dex| {
            let listed = filter.contains(*dex);
            button(
                format!("{} {}", check(listed), dex.token()),
                CallbackTarget::GlobalFilterToggle {
                    mode,
                    dex: *dex,
                    enabled: !listed,
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;
    rows.extend(toggles.chunks(DEX_PER_ROW).map(|c| c.to_vec()));

    rows.push(vec![
        button("♻️ Reset", CallbackTarget::GlobalFilterReset { mode })?,
        button("🔄 Refresh", CallbackTarget::GlobalFilterView)?,
    ]);
    Ok(Keyboard::new(rows))
}

pub fn mini_app(links: &AppLinks) -> Option<Keyboard> {
    let url = links.mini_app(None)?;
    Some(Keyboard::new(vec![vec![KeyboardButton::web_app(
        "📱 Open wallet tracker",
        url,
    )]]))
}

fn check(on: bool) -> &'static str {
    if on {
        "✅"
    } else {
        "▫️"
    }
}

fn mark(selected: bool, token: &str) -> String {
    if selected {
        format!("• {token}")
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::decode;
    use crate::domain::Chain;

    fn query(offset: u32) -> HistoryQuery {
        HistoryQuery {
            wallet_id: WalletId(9),
            offset,
            limit: 5,
            kind: HistoryKind::Swap,
            direction: HistoryDirection::In,
        }
    }

    #[test]
    fn every_button_decodes() {
        let wallets = vec![WalletSummary {
            id: WalletId(9),
            chain: Chain::Solana,
            address: "So11111111111111111111111111111111111111112".to_string(),
            label: None,
            muted_until: None,
        }];
        let filter = GlobalDexFilter {
            mode: DexFilterMode::Exclude,
            dexes: vec![DexKey::Raydium],
        };
        let keyboards = vec![
            wallet_list(&wallets).unwrap(),
            wallet_menu(WalletId(9), false, &AppLinks::default()).unwrap(),
            history(&query(5), true).unwrap(),
            wallet_filters(WalletId(9), &WalletFilters::default()).unwrap(),
            global_filter(&filter).unwrap(),
        ];
        for kb in &keyboards {
            for data in kb.callback_data() {
                assert!(decode(data).is_some(), "undecodable: {data}");
            }
        }
    }

    #[test]
    fn history_paging_buttons() {
        let first = history(&query(0), true).unwrap();
        let data = first.callback_data();
        // No "newer" button on the first page.
        assert_eq!(data[0], "wallet_history_page:9:5:5:swap:in");
        assert_eq!(first.rows[0].len(), 1);

        let last = history(&query(10), false).unwrap();
        assert_eq!(last.callback_data()[0], "wallet_history_page:9:5:5:swap:in");
        assert!(last
            .callback_data()
            .contains(&"wallet_history_refresh:9:5:swap:in"));
    }

    #[test]
    fn filter_toggles_flip_current_state() {
        let kb = wallet_filters(
            WalletId(16),
            &WalletFilters {
                transfer: true,
                swap: false,
            },
        )
        .unwrap();
        let data = kb.callback_data();
        assert!(data.contains(&"wallet_filter_toggle:16:transfer:off"));
        assert!(data.contains(&"wallet_filter_toggle:16:swap:on"));
    }

    #[test]
    fn global_filter_lists_every_dex() {
        let kb = global_filter(&GlobalDexFilter {
            mode: DexFilterMode::Include,
            dexes: vec![DexKey::Uniswap],
        })
        .unwrap();
        let data = kb.callback_data();
        assert_eq!(data[0], "global_filter_mode:exclude");
        assert!(data.contains(&"global_filter_toggle:include:uniswap:off"));
        assert!(data.contains(&"global_filter_toggle:include:curve:on"));
        assert!(data.contains(&"global_filter_reset:include"));
        assert!(data.contains(&"global_filter"));
        assert_eq!(
            data.iter()
                .filter(|d| d.starts_with("global_filter_toggle:"))
                .count(),
            DexKey::ALL.len()
        );
    }

    #[test]
    fn mini_app_deep_link() {
        let links = AppLinks::new(Some(Url::parse("https://app.example.com/tg").unwrap()));
        assert_eq!(
            links.mini_app(Some(WalletId(3))).as_deref(),
            Some("https://app.example.com/tg?startapp=wallet_3")
        );
        assert!(mini_app(&AppLinks::default()).is_none());

        let kb = wallet_menu(WalletId(3), false, &links).unwrap();
        assert!(kb.rows.last().unwrap()[0].label.contains("app"));
    }
}
