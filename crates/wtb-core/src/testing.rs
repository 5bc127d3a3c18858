//! Test doubles shared by unit tests.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{Chain, DexFilterMode, DexKey, UserIdentity, WalletFilterTarget, WalletId},
    errors::Error,
    ports::{
        GlobalDexFilter, HistoryPage, HistoryQuery, TrackWalletInput, TrackingService, User,
        WalletDetail, WalletFilters, WalletSummary,
    },
    Result,
};

pub fn alice() -> UserIdentity {
    UserIdentity::new("42", Some("alice".to_string()))
}

/// In-memory tracker that records every call it receives.
#[derive(Default)]
pub struct FakeTracker {
    pub wallets: Mutex<Vec<WalletSummary>>,
    pub calls: Mutex<Vec<String>>,
    /// Makes `list_wallets` fail with an unexpected error.
    pub broken_list: bool,
    /// Delay before `track_wallet` stores anything.
    pub track_delay: Option<Duration>,
}

impl FakeTracker {
    pub fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Store a wallet directly, bypassing `track_wallet`.
    pub fn seed_wallet(&self, id: WalletId) {
        self.wallets.lock().unwrap().push(WalletSummary {
            id,
            chain: Chain::Ethereum,
            address: "0xseed".to_string(),
            label: None,
            muted_until: None,
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn find(&self, id: WalletId) -> Result<WalletSummary> {
        self.wallets
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| Error::Rejected(format!("wallet #{id} not found")))
    }
}

#[async_trait]
impl TrackingService for FakeTracker {
    async fn find_or_create_user(&self, identity: &UserIdentity) -> Result<User> {
        self.log("find_or_create_user");
        Ok(User {
            id: 1,
            telegram_id: identity.telegram_id.clone(),
            username: identity.username.clone(),
        })
    }

    async fn track_wallet(
        &self,
        _identity: &UserIdentity,
        input: TrackWalletInput,
    ) -> Result<WalletSummary> {
        self.log(format!("track {}", input.address));
        if let Some(delay) = self.track_delay {
            tokio::time::sleep(delay).await;
        }
        let mut wallets = self.wallets.lock().unwrap();
        if wallets.iter().any(|w| w.address == input.address) {
            return Err(Error::Rejected("wallet is already tracked".to_string()));
        }
        let wallet = WalletSummary {
            id: WalletId(wallets.len() as u64 + 1),
            chain: input.chain,
            address: input.address,
            label: input.label,
            muted_until: None,
        };
        wallets.push(wallet.clone());
        Ok(wallet)
    }

    async fn list_wallets(&self, _identity: &UserIdentity) -> Result<Vec<WalletSummary>> {
        self.log("list");
        if self.broken_list {
            return Err(Error::External("tracker unavailable".to_string()));
        }
        Ok(self.wallets.lock().unwrap().clone())
    }

    async fn wallet_detail(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletDetail> {
        self.log(format!("detail {wallet}"));
        Ok(WalletDetail {
            wallet: self.find(wallet)?,
            filters: WalletFilters::default(),
            events_last_24h: 3,
        })
    }

    async fn remove_wallet(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletSummary> {
        self.log(format!("remove {wallet}"));
        let removed = self.find(wallet)?;
        self.wallets.lock().unwrap().retain(|w| w.id != wallet);
        Ok(removed)
    }

    async fn mute_wallet(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
        minutes: u32,
    ) -> Result<WalletSummary> {
        self.log(format!("mute {wallet} {minutes}"));
        self.find(wallet)
    }

    async fn unmute_wallet(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletSummary> {
        self.log(format!("unmute {wallet}"));
        self.find(wallet)
    }

    async fn wallet_history(
        &self,
        _identity: &UserIdentity,
        query: HistoryQuery,
    ) -> Result<HistoryPage> {
        self.log(format!(
            "history {} {} {} {} {}",
            query.wallet_id,
            query.offset,
            query.limit,
            query.kind.token(),
            query.direction.token()
        ));
        Ok(HistoryPage {
            wallet: self.find(query.wallet_id)?,
            events: Vec::new(),
            has_more: false,
        })
    }

    async fn wallet_filters(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletFilters> {
        self.log(format!("filters {wallet}"));
        Ok(WalletFilters::default())
    }

    async fn set_wallet_filter(
        &self,
        _identity: &UserIdentity,
        wallet: WalletId,
        target: WalletFilterTarget,
        enabled: bool,
    ) -> Result<WalletFilters> {
        self.log(format!("set_filter {wallet} {} {enabled}", target.token()));
        let mut filters = WalletFilters::default();
        match target {
            WalletFilterTarget::Transfer => filters.transfer = enabled,
            WalletFilterTarget::Swap => filters.swap = enabled,
        }
        Ok(filters)
    }

    async fn global_dex_filter(&self, _identity: &UserIdentity) -> Result<GlobalDexFilter> {
        self.log("global");
        Ok(GlobalDexFilter {
            mode: DexFilterMode::Exclude,
            dexes: Vec::new(),
        })
    }

    async fn set_global_dex_mode(
        &self,
        _identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter> {
        self.log(format!("global_mode {}", mode.token()));
        Ok(GlobalDexFilter {
            mode,
            dexes: Vec::new(),
        })
    }

    async fn toggle_global_dex(
        &self,
        _identity: &UserIdentity,
        mode: DexFilterMode,
        dex: DexKey,
        enabled: bool,
    ) -> Result<GlobalDexFilter> {
        self.log(format!("global_toggle {} {} {enabled}", mode.token(), dex.token()));
        Ok(GlobalDexFilter {
            mode,
            dexes: if enabled { vec![dex] } else { Vec::new() },
        })
    }

    async fn reset_global_dex(
        &self,
        _identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter> {
        self.log(format!("global_reset {}", mode.token()));
        Ok(GlobalDexFilter {
            mode,
            dexes: Vec::new(),
        })
    }
}
