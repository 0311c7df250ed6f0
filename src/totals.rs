//! Pure reductions over claim rows.

use crate::state::{normalize_wallet, ClaimRow, DashboardSummary, SummaryClaim};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowValue {
    pub value_now_usd: f64,
    pub pnl_usd: f64,
    /// None when claim_usd is zero (no basis to compute against).
    pub pnl_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub claim: f64,
    pub current: f64,
    pub pnl: f64,
}

/// Non-finite inputs count as zero, same as the original's toNum().
fn num(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

pub fn calc_row(row: &ClaimRow) -> RowValue {
    let value_now = num(row.qty) * num(row.price_now);
    let claim = num(row.claim_usd);
    let pnl = value_now - claim;
    let pnl_pct = if claim != 0.0 { Some(pnl / claim) } else { None };
    RowValue { value_now_usd: value_now, pnl_usd: pnl, pnl_pct }
}

pub fn calc_totals(rows: &[ClaimRow]) -> Totals {
    rows.iter().fold(Totals::default(), |mut acc, r| {
        let rv = calc_row(r);
        acc.claim += num(r.claim_usd);
        acc.current += rv.value_now_usd;
        acc.pnl += rv.pnl_usd;
        acc
    })
}

/// Build the public-view payload from the owner's rows.
pub fn summarize(wallet: &str, rows: &[ClaimRow]) -> DashboardSummary {
    let totals = calc_totals(rows);
    let realized: f64 = rows.iter().filter_map(|r| r.sold_usd).map(num).sum();
    DashboardSummary {
        wallet: normalize_wallet(wallet),
        tvl_usd: totals.current,
        realized_usd: realized,
        airdrop_count: rows.len() as u64,
        claims: rows
            .iter()
            .map(|r| SummaryClaim {
                token: r.token.clone(),
                chain: r.project.clone(),
                date: r.date.clone(),
                usd: num(r.claim_usd),
            })
            .collect(),
    }
}
