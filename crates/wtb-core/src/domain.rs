use serde::{Deserialize, Serialize};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Verified (or platform-supplied) Telegram identity of the acting user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    pub telegram_id: String,
    pub username: Option<String>,
}

impl UserIdentity {
    pub fn new(telegram_id: impl Into<String>, username: Option<String>) -> Self {
        Self {
            telegram_id: telegram_id.into(),
            username: username.filter(|u| !u.trim().is_empty()),
        }
    }
}

/// Tracked wallet id as issued by the tracking service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub u64);

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Solana,
    Tron,
}

impl Chain {
    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Solana => "Solana",
            Chain::Tron => "Tron",
        }
    }
}

/// Case-insensitive chain alias lookup (`eth`, `sol`, `trx`, ...).
pub fn resolve_chain(token: &str) -> Option<Chain> {
    match token.trim().to_lowercase().as_str() {
        "eth" | "ethereum" => Some(Chain::Ethereum),
        "sol" | "solana" => Some(Chain::Solana),
        "tron" | "trx" => Some(Chain::Tron),
        _ => None,
    }
}

/// Lower-case wire tokens shared by callback data and the tracker API.
macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            /// Case-insensitive token lookup.
            pub fn from_token(raw: &str) -> Option<Self> {
                let lower = raw.to_ascii_lowercase();
                match lower.as_str() {
                    $($token => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

token_enum!(
    /// Alert category that can be switched per wallet.
    WalletFilterTarget {
        Transfer => "transfer",
        Swap => "swap",
    }
);

token_enum!(
    HistoryKind {
        All => "all",
        Transfer => "transfer",
        Swap => "swap",
    }
);

token_enum!(
    HistoryDirection {
        All => "all",
        In => "in",
        Out => "out",
    }
);

token_enum!(
    /// Whether the global DEX list is an allow-list or a block-list.
    DexFilterMode {
        Include => "include",
        Exclude => "exclude",
    }
);

token_enum!(
    DexKey {
        Uniswap => "uniswap",
        Sushiswap => "sushiswap",
        Pancakeswap => "pancakeswap",
        Curve => "curve",
        Balancer => "balancer",
        Raydium => "raydium",
        Orca => "orca",
        Jupiter => "jupiter",
        Pumpfun => "pumpfun",
        Sunswap => "sunswap",
    }
);

pub fn on_off_token(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub fn parse_on_off(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_aliases_are_case_insensitive() {
        assert_eq!(resolve_chain("ETH"), Some(Chain::Ethereum));
        assert_eq!(resolve_chain("Solana"), Some(Chain::Solana));
        assert_eq!(resolve_chain("trx"), Some(Chain::Tron));
        assert_eq!(resolve_chain("btc"), None);
    }

    #[test]
    fn tokens_round_trip_case_insensitively() {
        for dex in DexKey::ALL {
            assert_eq!(DexKey::from_token(&dex.token().to_uppercase()), Some(*dex));
        }
        assert_eq!(HistoryDirection::from_token("OUT"), Some(HistoryDirection::Out));
        assert_eq!(WalletFilterTarget::from_token("nft"), None);
        assert_eq!(parse_on_off("On"), Some(true));
        assert_eq!(parse_on_off("yes"), None);
    }

    #[test]
    fn blank_username_is_dropped() {
        let id = UserIdentity::new("42", Some("  ".to_string()));
        assert_eq!(id.username, None);
    }
}
