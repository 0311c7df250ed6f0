//! CSV/JSON import-export for the row list.
//!
//! The CSV column order and quoting rules match the original app's export
//! files, derived columns included, so old exports re-import cleanly.

use anyhow::{anyhow, bail, Result};
use sha2::{Digest, Sha256};

use crate::state::ClaimRow;
use crate::totals::calc_row;

pub const CSV_HEADERS: [&str; 11] = [
    "date", "project", "token", "qty", "cgId", "claimUsd", "priceNow", "valueNowUsd", "pnlUsd",
    "soldUsd", "id",
];

/// Quote a field only when it contains a quote, comma or newline; embedded
/// quotes double up.
fn esc(field: &str) -> String {
    let needs_wrap = field.contains('"') || field.contains(',') || field.contains('\n');
    let safe = field.replace('"', "\"\"");
    if needs_wrap {
        format!("\"{}\"", safe)
    } else {
        safe
    }
}

fn fmt_num(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else {
        format!("{}", v)
    }
}

pub fn to_csv(rows: &[ClaimRow]) -> String {
    let mut lines = vec![CSV_HEADERS.join(",")];
    for row in rows {
        let rv = calc_row(row);
        let fields = [
            esc(&row.date),
            esc(&row.project),
            esc(&row.token),
            fmt_num(row.qty),
            esc(&row.cg_id),
            fmt_num(row.claim_usd),
            fmt_num(row.price_now),
            fmt_num(rv.value_now_usd),
            fmt_num(rv.pnl_usd),
            row.sold_usd.map(fmt_num).unwrap_or_default(),
            esc(&row.id),
        ];
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// Split one CSV line honoring quoted fields and doubled quotes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cur.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut cur));
            }
            _ => cur.push(c),
        }
    }
    fields.push(cur);
    fields
}

pub fn parse_csv_line(line: &str) -> Result<ClaimRow> {
    let parts = split_csv_line(line);
    if parts.len() < 11 {
        bail!("expected 11 columns, got {}", parts.len());
    }
    let num = |i: usize, name: &str| -> Result<f64> {
        let s = parts[i].trim();
        if s.is_empty() {
            return Ok(0.0);
        }
        s.parse().map_err(|_| anyhow!("bad {} value: {:?}", name, s))
    };
    let sold = parts[9].trim();
    Ok(ClaimRow {
        date: parts[0].trim().to_string(),
        project: parts[1].trim().to_string(),
        token: parts[2].trim().to_string(),
        qty: num(3, "qty")?,
        cg_id: parts[4].trim().to_string(),
        claim_usd: num(5, "claimUsd")?,
        price_now: num(6, "priceNow")?,
        // valueNowUsd and pnlUsd are derived; recomputed on load
        sold_usd: if sold.is_empty() {
            None
        } else {
            Some(sold.parse().map_err(|_| anyhow!("bad soldUsd value: {:?}", sold))?)
        },
        id: parts[10].trim().to_string(),
    })
}

/// Parse a full CSV export. Blank lines and the header line are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<ClaimRow>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.to_lowercase().starts_with("date,") {
            continue;
        }
        rows.push(parse_csv_line(trimmed)?);
    }
    Ok(rows)
}

pub fn to_json(rows: &[ClaimRow]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}

/// Import rule from the original app: the file must be a JSON array of rows.
pub fn from_json(text: &str) -> Result<Vec<ClaimRow>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_array() {
        bail!("JSON import must be an array of rows");
    }
    Ok(serde_json::from_value(value)?)
}

pub fn export_filename(base: &str, ext: &str, date: &str) -> String {
    format!("{}-{}.{}", base, date, ext)
}

/// Hex sha256 of an export's content, for a manifest line alongside the file.
pub fn content_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
