//! Capabilities the bot consumes from the tracking service.
//!
//! The service owns users, wallets, alert filters and history; the bot only
//! shapes requests and renders replies. Adapters (HTTP client, test fakes)
//! implement [`TrackingService`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Chain, DexFilterMode, DexKey, HistoryDirection, HistoryKind, UserIdentity,
        WalletFilterTarget, WalletId,
    },
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub telegram_id: String,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub id: WalletId,
    pub chain: Chain,
    pub address: String,
    pub label: Option<String>,
    #[serde(default)]
    pub muted_until: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFilters {
    pub transfer: bool,
    pub swap: bool,
}

impl WalletFilters {
    pub fn is_enabled(&self, target: WalletFilterTarget) -> bool {
        match target {
            WalletFilterTarget::Transfer => self.transfer,
            WalletFilterTarget::Swap => self.swap,
        }
    }
}

impl Default for WalletFilters {
    fn default() -> Self {
        Self {
            transfer: true,
            swap: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDetail {
    pub wallet: WalletSummary,
    pub filters: WalletFilters,
    #[serde(default)]
    pub events_last_24h: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWalletInput {
    pub chain: Chain,
    pub address: String,
    pub label: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub wallet_id: WalletId,
    pub offset: u32,
    pub limit: u32,
    pub kind: HistoryKind,
    pub direction: HistoryDirection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub occurred_at: DateTime<Utc>,
    pub kind: HistoryKind,
    pub direction: HistoryDirection,
    pub amount: String,
    pub token: String,
    pub tx_hash: String,
    #[serde(default)]
    pub dex: Option<DexKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub wallet: WalletSummary,
    pub events: Vec<HistoryEvent>,
    pub has_more: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalDexFilter {
    pub mode: DexFilterMode,
    /// DEXes in the list for the current mode.
    pub dexes: Vec<DexKey>,
}

impl GlobalDexFilter {
    pub fn contains(&self, dex: DexKey) -> bool {
        self.dexes.contains(&dex)
    }
}

/// Wallet, alert and history operations, keyed by the acting user.
///
/// Typed rejections ("wallet not found", "already tracked") come back as
/// `Error::Rejected` and are shown to the user verbatim; anything else is an
/// unexpected failure.
#[async_trait]
pub trait TrackingService: Send + Sync {
    async fn find_or_create_user(&self, identity: &UserIdentity) -> Result<User>;

    async fn track_wallet(
        &self,
        identity: &UserIdentity,
        input: TrackWalletInput,
    ) -> Result<WalletSummary>;

    async fn list_wallets(&self, identity: &UserIdentity) -> Result<Vec<WalletSummary>>;

    async fn wallet_detail(&self, identity: &UserIdentity, wallet: WalletId)
        -> Result<WalletDetail>;

    async fn remove_wallet(&self, identity: &UserIdentity, wallet: WalletId)
        -> Result<WalletSummary>;

    async fn mute_wallet(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
        minutes: u32,
    ) -> Result<WalletSummary>;

    async fn unmute_wallet(&self, identity: &UserIdentity, wallet: WalletId)
        -> Result<WalletSummary>;

    async fn wallet_history(
        &self,
        identity: &UserIdentity,
        query: HistoryQuery,
    ) -> Result<HistoryPage>;

    async fn wallet_filters(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletFilters>;

    async fn set_wallet_filter(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
        target: WalletFilterTarget,
        enabled: bool,
    ) -> Result<WalletFilters>;

    async fn global_dex_filter(&self, identity: &UserIdentity) -> Result<GlobalDexFilter>;

    async fn set_global_dex_mode(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter>;

    async fn toggle_global_dex(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
        dex: DexKey,
        enabled: bool,
    ) -> Result<GlobalDexFilter>;

    async fn reset_global_dex(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter>;
}
