//! Current-price refresh against the CoinGecko simple/price endpoint.
//!
//! Fetches go through a `PriceSource` trait so tests and offline runs can
//! swap in a stub. Results are cached per id with a TTL, and failing ids
//! back off exponentially. A failed fetch leaves rows untouched: prices
//! simply stay stale.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::state::{ClaimRow, Config};

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Unit prices for the given ids. Ids missing from the map were
    /// unavailable; that is not an error.
    async fn fetch_prices(&self, ids: &[&str]) -> Result<HashMap<String, f64>>;
}

pub struct CoinGecko {
    client: Client,
    base: String,
    vs_currency: String,
}

impl CoinGecko {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base: cfg.coingecko_base.clone(),
            vs_currency: cfg.vs_currency.clone(),
        }
    }
}

/// `{base}/api/v3/simple/price?ids=a,b&vs_currencies=usd`, with the query
/// values percent-encoded by the URL layer.
fn simple_price_url(base: &str, vs_currency: &str, ids: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)?.join("/api/v3/simple/price")?;
    url.query_pairs_mut()
        .append_pair("ids", &ids.join(","))
        .append_pair("vs_currencies", vs_currency);
    Ok(url)
}

#[async_trait]
impl PriceSource for CoinGecko {
    async fn fetch_prices(&self, ids: &[&str]) -> Result<HashMap<String, f64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = simple_price_url(&self.base, &self.vs_currency, ids)?;
        let resp: HashMap<String, HashMap<String, f64>> =
            self.client.get(url).send().await?.error_for_status()?.json().await?;
        let mut out = HashMap::new();
        for (id, quotes) in resp {
            if let Some(price) = quotes.get(&self.vs_currency) {
                out.insert(id, *price);
            }
        }
        Ok(out)
    }
}

/// Stub source for offline runs: every id is unavailable.
pub struct NullSource;

#[async_trait]
impl PriceSource for NullSource {
    async fn fetch_prices(&self, _ids: &[&str]) -> Result<HashMap<String, f64>> {
        Ok(HashMap::new())
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: f64,
    fetched_at: Instant,
    fetch_failures: u32,
    last_failure: Option<Instant>,
}

impl CachedPrice {
    fn fresh(price: f64) -> Self {
        Self { price, fetched_at: Instant::now(), fetch_failures: 0, last_failure: None }
    }

    fn is_fresh(&self, ttl_secs: u64) -> bool {
        self.fetch_failures == 0 && self.fetched_at.elapsed() < Duration::from_secs(ttl_secs)
    }

    fn backoff_secs(&self) -> u64 {
        // 2^failures seconds, capped at 300s
        2u64.saturating_pow(self.fetch_failures.min(8)).min(300)
    }

    fn can_retry(&self) -> bool {
        match self.last_failure {
            None => true,
            Some(last) => last.elapsed() >= Duration::from_secs(self.backoff_secs()),
        }
    }
}

pub struct PriceFetcher {
    source: Box<dyn PriceSource>,
    cache: Mutex<HashMap<String, CachedPrice>>,
    ttl_secs: u64,
}

impl PriceFetcher {
    pub fn new(source: Box<dyn PriceSource>, ttl_secs: u64) -> Self {
        Self { source, cache: Mutex::new(HashMap::new()), ttl_secs }
    }

    /// Resolve prices for a set of ids, serving fresh cache entries without
    /// a network round trip and skipping ids still in backoff.
    pub async fn prices(&self, ids: &[&str]) -> HashMap<String, f64> {
        let mut out = HashMap::new();
        let mut to_fetch: Vec<&str> = Vec::new();
        if let Ok(cache) = self.cache.lock() {
            for id in ids {
                match cache.get(*id) {
                    Some(entry) if entry.is_fresh(self.ttl_secs) => {
                        out.insert((*id).to_string(), entry.price);
                    }
                    Some(entry) if !entry.can_retry() => {}
                    _ => to_fetch.push(id),
                }
            }
        } else {
            to_fetch.extend_from_slice(ids);
        }
        if to_fetch.is_empty() {
            return out;
        }

        match self.source.fetch_prices(&to_fetch).await {
            Ok(fetched) => {
                if let Ok(mut cache) = self.cache.lock() {
                    for id in &to_fetch {
                        match fetched.get(*id) {
                            Some(price) => {
                                cache.insert((*id).to_string(), CachedPrice::fresh(*price));
                            }
                            None => record_failure(&mut cache, id),
                        }
                    }
                }
                for id in &to_fetch {
                    if let Some(price) = fetched.get(*id) {
                        out.insert((*id).to_string(), *price);
                    }
                }
            }
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Price,
                    "fetch_failed",
                    obj(&[
                        ("ids", v_str(&to_fetch.join(","))),
                        ("error", v_str(&err.to_string())),
                    ]),
                );
                if let Ok(mut cache) = self.cache.lock() {
                    for id in &to_fetch {
                        record_failure(&mut cache, id);
                    }
                }
            }
        }
        out
    }

    /// Update price_now on every row whose id resolved. Rows with blank ids
    /// or unavailable prices are left as they were.
    pub async fn refresh(&self, rows: &mut [ClaimRow]) -> usize {
        let ids: Vec<String> = rows
            .iter()
            .map(|r| r.cg_id.clone())
            .filter(|id| !id.is_empty())
            .collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let prices = self.prices(&id_refs).await;
        let mut updated = 0;
        for row in rows.iter_mut() {
            if let Some(price) = prices.get(&row.cg_id) {
                row.price_now = *price;
                updated += 1;
            }
        }
        log(
            Level::Info,
            Domain::Price,
            "refresh_done",
            obj(&[("rows", v_num(rows.len() as f64)), ("updated", v_num(updated as f64))]),
        );
        updated
    }
}

fn record_failure(cache: &mut HashMap<String, CachedPrice>, id: &str) {
    let stale = Instant::now()
        .checked_sub(Duration::from_secs(3600))
        .unwrap_or_else(Instant::now);
    let entry = cache.entry(id.to_string()).or_insert(CachedPrice {
        price: 0.0,
        fetched_at: stale,
        fetch_failures: 0,
        last_failure: None,
    });
    entry.fetch_failures = entry.fetch_failures.saturating_add(1);
    entry.last_failure = Some(Instant::now());
}
