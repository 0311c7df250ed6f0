//! Public-view resolution: turn a visited URL into something renderable.
//!
//! Two link shapes are accepted, matching the variants the app shipped with:
//! path-router (`https://host/public/{wallet}?token=…#s=…`) and hash-router
//! (`https://host/app/#/public/{wallet}?token=…`). An embedded snapshot wins
//! over the token gate: the link already carries its data. Denied is a
//! normal terminal state, not an error.

use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::share::{Access, ShareGate};
use crate::snapshot::extract_snapshot;
use crate::state::{normalize_wallet, DashboardSummary};
use crate::store::{demo_summary, LedgerStore};

#[derive(Debug, Clone, PartialEq)]
pub struct PublicRoute {
    pub wallet: String,
    pub token: Option<String>,
    /// Raw fragment, kept for snapshot extraction.
    pub fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublicView {
    /// Link carried its own data; no gate consulted.
    Snapshot { wallet: String, data: Value },
    Granted { wallet: String, data: DashboardSummary },
    Denied { wallet: String },
    /// URL does not name a public route at all.
    NotPublic,
}

fn first_token(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
}

/// Parse a visited URL into a public route, hash-router form first
/// (mirrors the original router's precedence). None when the URL does not
/// point at `/public/{wallet}`.
pub fn parse_public_url(raw: &str) -> Option<PublicRoute> {
    let url = Url::parse(raw).ok()?;
    let fragment = url.fragment().map(str::to_string);

    // hash-router: everything lives inside the fragment
    if let Some(rest) = fragment.as_deref().and_then(|f| f.strip_prefix("/public/")) {
        let (wallet_part, query) = match rest.split_once('?') {
            Some((w, q)) => (w, Some(q)),
            None => (rest, None),
        };
        let wallet = normalize_wallet(wallet_part.split('/').next().unwrap_or(""));
        if wallet.is_empty() {
            return None;
        }
        let token = query.and_then(first_token).or_else(|| url.query().and_then(first_token));
        return Some(PublicRoute { wallet, token, fragment: None });
    }

    // path-router
    let mut segments = url.path_segments()?;
    loop {
        match segments.next() {
            Some("public") => break,
            Some(_) => continue,
            None => return None,
        }
    }
    let wallet = normalize_wallet(segments.next()?);
    if wallet.is_empty() {
        return None;
    }
    let token = url.query().and_then(first_token);
    Some(PublicRoute { wallet, token, fragment })
}

pub fn resolve_public_url(raw: &str, gate: &ShareGate, store: &LedgerStore) -> PublicView {
    let Some(route) = parse_public_url(raw) else {
        return PublicView::NotPublic;
    };
    if let Some(data) = route.fragment.as_deref().and_then(extract_snapshot) {
        return PublicView::Snapshot { wallet: route.wallet, data };
    }
    match gate.check_access(&route.wallet, route.token.as_deref()) {
        Access::Denied => PublicView::Denied { wallet: route.wallet },
        Access::Granted => {
            let data = store.load_summary().unwrap_or_else(demo_summary);
            PublicView::Granted { wallet: route.wallet, data }
        }
    }
}

/// `0x88ac3d…3429` — abbreviation used everywhere a wallet is displayed.
pub fn mask_wallet(wallet: &str) -> String {
    let w = normalize_wallet(wallet);
    if w.len() > 12 && w.starts_with("0x") && w.is_ascii() {
        format!("{}…{}", &w[..8], &w[w.len() - 4..])
    } else {
        w
    }
}

/// Group an amount with thousands separators, two decimals: `12,456.72`.
fn group_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let s = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((&s, "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, dec_part)
}

/// Link-preview title: `Airdrop Tracker — 0x88ac3d…3429`.
pub fn page_title(wallet: &str) -> String {
    format!("Airdrop Tracker — {}", mask_wallet(wallet))
}

/// Link-preview description: `TVL : $12,456.72 | PnL : $3,821.14`.
pub fn page_description(summary: &DashboardSummary) -> String {
    format!("TVL : ${} | PnL : ${}", group_usd(summary.tvl_usd), group_usd(summary.realized_usd))
}
