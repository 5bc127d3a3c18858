//! Tracking backend adapter (REST over reqwest).
//!
//! Every call carries the acting user's Telegram identity in headers; the
//! backend owns users, wallets, filters and history.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use wtb_core::{
    domain::{DexFilterMode, DexKey, UserIdentity, WalletFilterTarget, WalletId},
    errors::Error,
    ports::{
        GlobalDexFilter, HistoryPage, HistoryQuery, TrackWalletInput, TrackingService, User,
        WalletDetail, WalletFilters, WalletSummary,
    },
    Result,
};

const HEADER_TELEGRAM_ID: &str = "x-telegram-id";
const HEADER_TELEGRAM_USERNAME: &str = "x-telegram-username";

#[derive(Clone, Debug)]
pub struct HttpTracker {
    base: Url,
    token: Option<String>,
    http: reqwest::Client,
}

/// Error body the backend sends with 4xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpTracker {
    pub fn new(base: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("tracker url {base} cannot be a base")));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("tracker client build error: {e}")))?;
        Ok(Self { base, token, http })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        identity: &UserIdentity,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.endpoint(segments);
        debug!(%method, %url, user = %identity.telegram_id, "tracker request");

        let mut req = self
            .http
            .request(method, url)
            .header(HEADER_TELEGRAM_ID, &identity.telegram_id);
        if let Some(username) = &identity.username {
            req = req.header(HEADER_TELEGRAM_USERNAME, username);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("tracker request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        resp.json()
            .await
            .map_err(|e| Error::External(format!("tracker json error: {e}")))
    }
}

/// 4xx with a readable message is a business rejection shown to the user;
/// everything else is unexpected.
fn classify(status: StatusCode, body: &str) -> Error {
    if status.is_client_error() {
        if let Ok(ErrorBody { message }) = serde_json::from_str(body) {
            if !message.trim().is_empty() {
                return Error::Rejected(message);
            }
        }
    }
    Error::External(format!(
        "tracker request failed: {status} {}",
        body.chars().take(200).collect::<String>()
    ))
}

#[async_trait]
impl TrackingService for HttpTracker {
    async fn find_or_create_user(&self, identity: &UserIdentity) -> Result<User> {
        let body = json!({
            "telegram_id": identity.telegram_id,
            "username": identity.username,
        });
        self.call(identity, Method::POST, &["users"], &[], Some(body))
            .await
    }

    async fn track_wallet(
        &self,
        identity: &UserIdentity,
        input: TrackWalletInput,
    ) -> Result<WalletSummary> {
        let body = serde_json::to_value(&input)?;
        self.call(identity, Method::POST, &["wallets"], &[], Some(body))
            .await
    }

    async fn list_wallets(&self, identity: &UserIdentity) -> Result<Vec<WalletSummary>> {
        self.call(identity, Method::GET, &["wallets"], &[], None)
            .await
    }

    async fn wallet_detail(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletDetail> {
        let id = wallet.to_string();
        self.call(identity, Method::GET, &["wallets", &id], &[], None)
            .await
    }

    async fn remove_wallet(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletSummary> {
        let id = wallet.to_string();
        self.call(identity, Method::DELETE, &["wallets", &id], &[], None)
            .await
    }

    async fn mute_wallet(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
        minutes: u32,
    ) -> Result<WalletSummary> {
        let id = wallet.to_string();
        let body = json!({ "minutes": minutes });
        self.call(identity, Method::POST, &["wallets", &id, "mute"], &[], Some(body))
            .await
    }

    async fn unmute_wallet(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletSummary> {
        let id = wallet.to_string();
        self.call(identity, Method::DELETE, &["wallets", &id, "mute"], &[], None)
            .await
    }

    async fn wallet_history(
        &self,
        identity: &UserIdentity,
        query: HistoryQuery,
    ) -> Result<HistoryPage> {
        let id = query.wallet_id.to_string();
        let params = history_params(&query);
        self.call(identity, Method::GET, &["wallets", &id, "history"], &params, None)
            .await
    }

    async fn wallet_filters(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
    ) -> Result<WalletFilters> {
        let id = wallet.to_string();
        self.call(identity, Method::GET, &["wallets", &id, "filters"], &[], None)
            .await
    }

    async fn set_wallet_filter(
        &self,
        identity: &UserIdentity,
        wallet: WalletId,
        target: WalletFilterTarget,
        enabled: bool,
    ) -> Result<WalletFilters> {
        let id = wallet.to_string();
        let body = json!({ "enabled": enabled });
        self.call(
            identity,
            Method::PUT,
            &["wallets", &id, "filters", target.token()],
            &[],
            Some(body),
        )
        .await
    }

    async fn global_dex_filter(&self, identity: &UserIdentity) -> Result<GlobalDexFilter> {
        self.call(identity, Method::GET, &["dex-filter"], &[], None)
            .await
    }

    async fn set_global_dex_mode(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter> {
        let body = json!({ "mode": mode.token() });
        self.call(identity, Method::PUT, &["dex-filter", "mode"], &[], Some(body))
            .await
    }

    async fn toggle_global_dex(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
        dex: DexKey,
        enabled: bool,
    ) -> Result<GlobalDexFilter> {
        let body = json!({ "enabled": enabled });
        self.call(
            identity,
            Method::PUT,
            &["dex-filter", mode.token(), dex.token()],
            &[],
            Some(body),
        )
        .await
    }

    async fn reset_global_dex(
        &self,
        identity: &UserIdentity,
        mode: DexFilterMode,
    ) -> Result<GlobalDexFilter> {
        self.call(identity, Method::DELETE, &["dex-filter", mode.token()], &[], None)
            .await
    }
}

fn history_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
    vec![
        ("offset", query.offset.to_string()),
        ("limit", query.limit.to_string()),
        ("kind", query.kind.token().to_string()),
        ("direction", query.direction.token().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtb_core::domain::{HistoryDirection, HistoryKind};

    fn tracker(base: &str) -> HttpTracker {
        HttpTracker::new(Url::parse(base).unwrap(), None, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoints_extend_base_path() {
        let t = tracker("https://tracker.internal/api/v1/");
        assert_eq!(
            t.endpoint(&["wallets", "12", "mute"]).as_str(),
            "https://tracker.internal/api/v1/wallets/12/mute"
        );

        let t = tracker("https://tracker.internal/api");
        assert_eq!(
            t.endpoint(&["dex-filter", "include", "uniswap"]).as_str(),
            "https://tracker.internal/api/dex-filter/include/uniswap"
        );
    }

    #[test]
    fn non_base_url_is_rejected() {
        let err = HttpTracker::new(
            Url::parse("mailto:ops@example.com").unwrap(),
            None,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn client_errors_with_message_are_rejections() {
        let err = classify(
            StatusCode::CONFLICT,
            r#"{"message":"wallet is already tracked"}"#,
        );
        assert!(matches!(err, Error::Rejected(m) if m == "wallet is already tracked"));

        let err = classify(StatusCode::NOT_FOUND, "not json");
        assert!(matches!(err, Error::External(_)));

        let err = classify(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"db down"}"#,
        );
        assert!(matches!(err, Error::External(_)));
    }

    #[test]
    fn history_query_becomes_params() {
        let params = history_params(&HistoryQuery {
            wallet_id: WalletId(3),
            offset: 10,
            limit: 5,
            kind: HistoryKind::Swap,
            direction: HistoryDirection::Out,
        });
        assert_eq!(
            params,
            vec![
                ("offset", "10".to_string()),
                ("limit", "5".to_string()),
                ("kind", "swap".to_string()),
                ("direction", "out".to_string()),
            ]
        );
    }
}
