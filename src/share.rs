//! Public-link token gate.
//!
//! One token slot per wallet, stored under `share:token:{wallet}`. No stored
//! token means the public view is open; a stored token must be matched
//! exactly by the `?token=` query value. This gates casual link sharing, it
//! is not a security boundary: comparison is plain string equality and there
//! is no expiry. Revocation = `clear_token`.

use rand::Rng;
use std::sync::Arc;
use url::form_urlencoded;

use crate::kv::KvStore;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::state::normalize_wallet;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const DEFAULT_TOKEN_LENGTH: usize = 24;

fn token_key(wallet: &str) -> String {
    format!("share:token:{}", normalize_wallet(wallet))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

pub struct ShareGate {
    kv: Arc<dyn KvStore>,
}

impl ShareGate {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Stored token for this wallet, or None. Empty wallet, storage failure
    /// and an empty stored value all read as absent.
    pub fn token(&self, wallet: &str) -> Option<String> {
        if normalize_wallet(wallet).is_empty() {
            return None;
        }
        self.kv.get(&token_key(wallet)).filter(|t| !t.is_empty())
    }

    /// Store a token, replacing any previous one. Silently ignored when
    /// wallet or token is empty.
    pub fn set_token(&self, wallet: &str, token: &str) {
        let w = normalize_wallet(wallet);
        let t = token.trim();
        if w.is_empty() || t.is_empty() {
            return;
        }
        self.kv.set(&token_key(&w), t);
        log(
            Level::Info,
            Domain::Share,
            "token_set",
            obj(&[("wallet", v_str(&w)), ("token", v_str(t))]),
        );
    }

    /// Remove the token for this wallet. The only revocation mechanism.
    pub fn clear_token(&self, wallet: &str) {
        let w = normalize_wallet(wallet);
        if w.is_empty() {
            return;
        }
        self.kv.del(&token_key(&w));
        log(Level::Info, Domain::Share, "token_cleared", obj(&[("wallet", v_str(&w))]));
    }

    /// Grant unless a stored token exists and the supplied one is not an
    /// exact (case-sensitive) match.
    pub fn check_access(&self, wallet: &str, supplied: Option<&str>) -> Access {
        let decision = match self.token(wallet) {
            None => Access::Granted,
            Some(stored) if supplied == Some(stored.as_str()) => Access::Granted,
            Some(_) => Access::Denied,
        };
        log(
            Level::Debug,
            Domain::Share,
            "access_decision",
            obj(&[
                ("wallet", v_str(&normalize_wallet(wallet))),
                ("granted", serde_json::Value::Bool(decision == Access::Granted)),
            ]),
        );
        decision
    }
}

/// Short, readable token: uniform draws from lowercase alphanumerics.
/// thread_rng is a CSPRNG, so collisions between calls are implausible.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let i = rng.gen_range(0..TOKEN_ALPHABET.len());
            TOKEN_ALPHABET[i] as char
        })
        .collect()
}

/// `{base}/public/{wallet}` plus `?token=...` when a token is given.
/// Pure string composition, nothing else is added or removed.
pub fn build_share_url(base: &str, wallet: &str, token: Option<&str>) -> String {
    let w = normalize_wallet(wallet);
    let mut url = format!("{}/public/{}", base.trim_end_matches('/'), w);
    if let Some(t) = token.filter(|t| !t.is_empty()) {
        let encoded: String = form_urlencoded::byte_serialize(t.as_bytes()).collect();
        url.push_str("?token=");
        url.push_str(&encoded);
    }
    url
}
