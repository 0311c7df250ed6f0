use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct Config {
    pub wallet: String,
    pub base_url: String,
    pub sqlite_path: String,
    pub coingecko_base: String,
    pub vs_currency: String,
    pub price_ttl_secs: u64,
    pub token_length: usize,
    pub export_base: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            wallet: std::env::var("WALLET")
                .unwrap_or_else(|_| "0x88ac3d64230c8a453492ff908a02daa27e9b3429".to_string()),
            base_url: std::env::var("BASE_URL").unwrap_or_else(|_| "https://droptally.local".to_string()),
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or_else(|_| "./ledger.sqlite".to_string()),
            coingecko_base: std::env::var("COINGECKO_BASE")
                .unwrap_or_else(|_| "https://api.coingecko.com".to_string()),
            vs_currency: std::env::var("VS_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            price_ttl_secs: std::env::var("PRICE_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(60),
            token_length: std::env::var("TOKEN_LENGTH").ok().and_then(|v| v.parse().ok()).unwrap_or(24),
            export_base: std::env::var("EXPORT_BASE").unwrap_or_else(|_| "airdrop-tracker".to_string()),
        }
    }
}

/// One claimed airdrop. JSON field names match the original export format
/// so files written by older versions import cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRow {
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub project: String,
    pub token: String,
    #[serde(default)]
    pub qty: f64,
    #[serde(rename = "cgId", default)]
    pub cg_id: String,
    #[serde(rename = "claimUsd", default)]
    pub claim_usd: f64,
    #[serde(rename = "priceNow", default)]
    pub price_now: f64,
    #[serde(rename = "soldUsd", default)]
    pub sold_usd: Option<f64>,
}

impl ClaimRow {
    pub fn new(date: &str) -> Self {
        Self {
            id: uid(),
            date: date.to_string(),
            project: String::new(),
            token: String::new(),
            qty: 0.0,
            cg_id: String::new(),
            claim_usd: 0.0,
            price_now: 0.0,
            sold_usd: None,
        }
    }
}

/// The read-only payload the public view renders; also the usual snapshot body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub wallet: String,
    #[serde(rename = "tvlUSD")]
    pub tvl_usd: f64,
    #[serde(rename = "realizedUSD")]
    pub realized_usd: f64,
    #[serde(rename = "airdropCount")]
    pub airdrop_count: u64,
    pub claims: Vec<SummaryClaim>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryClaim {
    pub token: String,
    pub chain: String,
    pub date: String,
    pub usd: f64,
}

/// Wallet addresses are case-insensitive; every storage key and comparison
/// goes through this first.
pub fn normalize_wallet(wallet: &str) -> String {
    wallet.trim().to_lowercase()
}

/// Opaque row id. Random alphanumeric is plenty for a single-user ledger.
pub fn uid() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("id-{}", suffix.to_lowercase())
}
