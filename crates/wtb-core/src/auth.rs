//! Telegram login verification.
//!
//! Two independently keyed handshakes, both HMAC-SHA256:
//! - login widget: `secret = SHA256(bot_token)` over the flat field set
//! - mini-app init data: `secret = HMAC-SHA256(key = "WebAppData", data = bot_token)`
//!
//! The two key derivations are fixed by the platform and must not be mixed.
//! Both flows are pure: (input, now, token) -> identity.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::domain::UserIdentity;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of `auth_date`, in seconds (inclusive).
pub const MAX_AUTH_AGE_SECS: i64 = 300;

const WEB_APP_KEY: &[u8] = b"WebAppData";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("bot token is not configured")]
    Unconfigured,
    #[error("signature mismatch")]
    BadSignature,
    #[error("auth_date is too old")]
    Stale,
    #[error("malformed user payload")]
    MalformedUser,
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl AuthError {
    /// What the caller is allowed to see. Never reveals which check failed.
    pub fn public_message(&self) -> &'static str {
        "unauthorized"
    }
}

#[derive(Clone, Debug)]
pub struct AuthVerifier {
    bot_token: Option<String>,
}

impl AuthVerifier {
    pub fn new(bot_token: Option<String>) -> Self {
        Self {
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn token(&self) -> Result<&str, AuthError> {
        self.bot_token.as_deref().ok_or(AuthError::Unconfigured)
    }

    /// Verify a login-widget payload (flat JSON object including `hash`).
    pub fn verify_widget(
        &self,
        fields: &Map<String, Value>,
        now: i64,
    ) -> Result<UserIdentity, AuthError> {
        self.widget(fields, now)
            .inspect_err(|e| debug!(reason = %e, "login widget rejected"))
    }

    /// Verify mini-app `initData` (the raw query string handed to the web app).
    pub fn verify_mini_app(&self, init_data: &str, now: i64) -> Result<UserIdentity, AuthError> {
        self.mini_app(init_data, now)
            .inspect_err(|e| debug!(reason = %e, "mini-app init data rejected"))
    }

    fn widget(&self, fields: &Map<String, Value>, now: i64) -> Result<UserIdentity, AuthError> {
        let token = self.token()?;

        let hash = fields
            .get("hash")
            .and_then(Value::as_str)
            .ok_or(AuthError::MissingField("hash"))?;
        let id = fields
            .get("id")
            .and_then(canonical_value)
            .ok_or(AuthError::MissingField("id"))?;
        let auth_date = fields
            .get("auth_date")
            .and_then(canonical_value)
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(AuthError::MissingField("auth_date"))?;

        let mut entries = BTreeMap::new();
        for (k, v) in fields {
            if k == "hash" {
                continue;
            }
            if let Some(s) = canonical_value(v) {
                entries.insert(k.clone(), s);
            }
        }
        let check = check_string(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let secret = Sha256::digest(token.as_bytes());
        let computed = hmac_hex(&secret, check.as_bytes());
        if !constant_time_eq(computed.as_bytes(), hash.as_bytes()) {
            return Err(AuthError::BadSignature);
        }

        check_freshness(auth_date, now)?;

        let username = fields
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(UserIdentity::new(id, username))
    }

    fn mini_app(&self, init_data: &str, now: i64) -> Result<UserIdentity, AuthError> {
        let token = self.token()?;

        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(init_data.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let hash = lookup(&pairs, "hash").ok_or(AuthError::MissingField("hash"))?;
        let auth_date = lookup(&pairs, "auth_date")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or(AuthError::MissingField("auth_date"))?;
        let user = lookup(&pairs, "user").ok_or(AuthError::MissingField("user"))?;

        let mut entries: Vec<(&str, String)> = pairs
            .iter()
            .filter(|(k, _)| k != "hash")
            .map(|(k, v)| {
                // Form decoding turns `+` into a space; query_id must be hashed as sent.
                if k == "query_id" {
                    (k.as_str(), v.replace(' ', "+"))
                } else {
                    (k.as_str(), v.clone())
                }
            })
            .collect();
        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        let check = check_string(entries.iter().map(|(k, v)| (*k, v.as_str())));

        let secret = hmac_raw(WEB_APP_KEY, token.as_bytes());
        let computed = hmac_hex(&secret, check.as_bytes());
        if !constant_time_eq(computed.as_bytes(), hash.as_bytes()) {
            return Err(AuthError::BadSignature);
        }

        check_freshness(auth_date, now)?;

        parse_mini_app_user(user)
    }

    pub fn verify_widget_now(
        &self,
        fields: &Map<String, Value>,
    ) -> Result<UserIdentity, AuthError> {
        self.verify_widget(fields, chrono::Utc::now().timestamp())
    }

    pub fn verify_mini_app_now(&self, init_data: &str) -> Result<UserIdentity, AuthError> {
        self.verify_mini_app(init_data, chrono::Utc::now().timestamp())
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn check_freshness(auth_date: i64, now: i64) -> Result<(), AuthError> {
    if now.saturating_sub(auth_date) > MAX_AUTH_AGE_SECS {
        return Err(AuthError::Stale);
    }
    Ok(())
}

/// Canonical string form of a widget field. `null` counts as absent.
fn canonical_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// `key=value` lines joined with `\n`; caller supplies the sorted order.
fn check_string<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    entries
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_raw(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC takes keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_hex(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_raw(key, data))
}

fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}

fn parse_mini_app_user(raw: &str) -> Result<UserIdentity, AuthError> {
    let v: Value = serde_json::from_str(raw).map_err(|_| AuthError::MalformedUser)?;
    let obj = v.as_object().ok_or(AuthError::MalformedUser)?;

    let id = obj
        .get("id")
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or(AuthError::MalformedUser)?;

    let username = match obj.get("username") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(AuthError::MalformedUser),
    };

    Ok(UserIdentity::new(id.to_string(), username))
}
