//! Self-contained shareable snapshots.
//!
//! A snapshot is any JSON-serializable value, serialized and mapped into the
//! URL-safe base64 alphabet (no `+`, `/` or padding) so it can ride inside a
//! URL fragment: `{base}/public/{wallet}#s={encoded}`. The codec is
//! content-agnostic; whoever embedded the payload decides its schema.
//! Decoding never mutates anything and never errors: foreign input is None.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::state::normalize_wallet;

/// Fragment parameter carrying the snapshot.
pub const SNAPSHOT_PARAM: &str = "s";

pub fn encode<T: Serialize>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
        Err(_) => String::new(),
    }
}

pub fn decode(text: &str) -> Option<Value> {
    let bytes = URL_SAFE_NO_PAD.decode(text.trim()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Like `build_share_url`, but the link carries the data itself instead of
/// pointing at shared storage.
pub fn build_snapshot_link<T: Serialize>(base: &str, wallet: &str, value: &T) -> String {
    format!(
        "{}/public/{}#{}={}",
        base.trim_end_matches('/'),
        normalize_wallet(wallet),
        SNAPSHOT_PARAM,
        encode(value)
    )
}

/// Find `s=...` inside a fragment or query string (leading `#` optional,
/// `&`-separated) and decode it.
pub fn extract_snapshot(fragment_or_query: &str) -> Option<Value> {
    let trimmed = fragment_or_query.trim_start_matches('#');
    for pair in trimmed.split('&') {
        if let Some((key, raw)) = pair.split_once('=') {
            if key == SNAPSHOT_PARAM {
                if raw.is_empty() {
                    return None;
                }
                return decode(raw);
            }
        }
    }
    None
}
