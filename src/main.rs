use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use droptally::export;
use droptally::kv::SqliteKv;
use droptally::logging::{obj, log, v_num, v_str, Domain, Level};
use droptally::prices::{CoinGecko, NullSource, PriceFetcher, PriceSource};
use droptally::share::{build_share_url, generate_token, ShareGate};
use droptally::snapshot::build_snapshot_link;
use droptally::state::{ClaimRow, Config};
use droptally::store::LedgerStore;
use droptally::totals::{calc_row, calc_totals, summarize};
use droptally::view::{mask_wallet, page_description, page_title, resolve_public_url, PublicView};

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn usd(v: f64) -> String {
    format!("${:.2}", v)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = args.first().map(String::as_str).unwrap_or("list");

    log(
        Level::Debug,
        Domain::System,
        "startup",
        obj(&[("cmd", v_str(cmd)), ("wallet", v_str(&cfg.wallet))]),
    );

    let kv = Arc::new(
        SqliteKv::open(&cfg.sqlite_path)
            .with_context(|| format!("cannot open ledger store at {}", cfg.sqlite_path))?,
    );
    let store = LedgerStore::new(kv.clone());
    let gate = ShareGate::new(kv);

    match cmd {
        "list" => list(&cfg, &store),
        "add" => add(&cfg, &store, &args[1..]),
        "rm" => rm(&cfg, &store, &args[1..]),
        "sell" => sell(&cfg, &store, &args[1..]),
        "totals" => totals_cmd(&store),
        "refresh" => refresh(&cfg, &store, &args[1..]).await,
        "share-on" => share_on(&cfg, &gate),
        "share-off" => share_off(&cfg, &gate),
        "share-url" => share_url(&cfg, &gate),
        "snapshot-url" => snapshot_url(&cfg, &store),
        "open" => open(&gate, &store, &args[1..]),
        "export-csv" => export_csv(&cfg, &store, &args[1..]),
        "export-json" => export_json(&cfg, &store, &args[1..]),
        "import-json" => import_json(&cfg, &store, &args[1..]),
        "demo" => demo(&cfg, &store),
        other => bail!(
            "unknown command {:?} (try: list add rm sell totals refresh share-on share-off \
             share-url snapshot-url open export-csv export-json import-json demo)",
            other
        ),
    }
}

fn list(cfg: &Config, store: &LedgerStore) -> Result<()> {
    let rows = store.load_rows();
    println!("{}", page_title(&cfg.wallet));
    if rows.is_empty() {
        println!("(no rows — `add <project> <token> <qty> <cgId> <claimUsd>` to start)");
        return Ok(());
    }
    println!(
        "{:<12} {:<16} {:<8} {:>12} {:>12} {:>12} {:>10} {}",
        "date", "project", "token", "qty", "claim", "now", "pnl", "id"
    );
    for row in &rows {
        let rv = calc_row(row);
        let status = match row.sold_usd {
            Some(sold) => format!("SOLD {}", usd(sold)),
            None => String::new(),
        };
        println!(
            "{:<12} {:<16} {:<8} {:>12} {:>12} {:>12} {:>10} {} {}",
            row.date,
            row.project,
            row.token,
            row.qty,
            usd(row.claim_usd),
            usd(rv.value_now_usd),
            usd(rv.pnl_usd),
            row.id,
            status
        );
    }
    let totals = calc_totals(&rows);
    println!(
        "claim total {} | current total {} | PNL {}",
        usd(totals.claim),
        usd(totals.current),
        usd(totals.pnl)
    );
    Ok(())
}

fn add(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let mut row = ClaimRow::new(&today());
    row.project = args.first().cloned().unwrap_or_default();
    row.token = args.get(1).cloned().unwrap_or_default();
    row.qty = args.get(2).map(|v| v.parse()).transpose().context("bad qty")?.unwrap_or(0.0);
    row.cg_id = args.get(3).cloned().unwrap_or_default();
    row.claim_usd =
        args.get(4).map(|v| v.parse()).transpose().context("bad claimUsd")?.unwrap_or(0.0);

    let mut rows = store.load_rows();
    rows.push(row.clone());
    store.commit_rows(&cfg.wallet, &rows);
    println!("added {} ({})", row.token, row.id);
    Ok(())
}

fn rm(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let id = args.first().ok_or_else(|| anyhow!("rm needs a row id"))?;
    let mut rows = store.load_rows();
    let before = rows.len();
    rows.retain(|r| &r.id != id);
    if rows.len() == before {
        println!("no row with id {}", id);
        return Ok(());
    }
    store.commit_rows(&cfg.wallet, &rows);
    println!("removed {}", id);
    Ok(())
}

fn sell(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let id = args.first().ok_or_else(|| anyhow!("sell needs a row id"))?;
    let amount: f64 = args
        .get(1)
        .ok_or_else(|| anyhow!("sell needs a USD amount"))?
        .parse()
        .context("bad USD amount")?;
    if !(amount > 0.0) {
        bail!("sell amount must be positive");
    }
    let mut rows = store.load_rows();
    let Some(row) = rows.iter_mut().find(|r| &r.id == id) else {
        println!("no row with id {}", id);
        return Ok(());
    };
    row.sold_usd = Some(amount);
    let token = row.token.clone();
    store.commit_rows(&cfg.wallet, &rows);
    println!("marked {} sold for {}", token, usd(amount));
    Ok(())
}

fn totals_cmd(store: &LedgerStore) -> Result<()> {
    let totals = calc_totals(&store.load_rows());
    println!("claim total   {}", usd(totals.claim));
    println!("current total {}", usd(totals.current));
    println!("total PNL     {}", usd(totals.pnl));
    Ok(())
}

async fn refresh(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let source: Box<dyn PriceSource> = if std::env::var("OFFLINE").is_ok() {
        Box::new(NullSource)
    } else {
        Box::new(CoinGecko::new(cfg))
    };
    let fetcher = PriceFetcher::new(source, cfg.price_ttl_secs);

    let mut rows = store.load_rows();
    let updated = match args.first() {
        Some(id) => {
            let Some(pos) = rows.iter().position(|r| &r.id == id) else {
                println!("no row with id {}", id);
                return Ok(());
            };
            fetcher.refresh(&mut rows[pos..=pos]).await
        }
        None => fetcher.refresh(&mut rows).await,
    };
    store.commit_rows(&cfg.wallet, &rows);
    println!("updated {} of {} rows", updated, rows.len());
    Ok(())
}

fn share_on(cfg: &Config, gate: &ShareGate) -> Result<()> {
    let token = generate_token(cfg.token_length);
    gate.set_token(&cfg.wallet, &token);
    println!("{}", build_share_url(&cfg.base_url, &cfg.wallet, Some(&token)));
    Ok(())
}

fn share_off(cfg: &Config, gate: &ShareGate) -> Result<()> {
    gate.clear_token(&cfg.wallet);
    println!("public link disabled for {}", mask_wallet(&cfg.wallet));
    Ok(())
}

fn share_url(cfg: &Config, gate: &ShareGate) -> Result<()> {
    let token = gate.token(&cfg.wallet);
    println!("{}", build_share_url(&cfg.base_url, &cfg.wallet, token.as_deref()));
    Ok(())
}

fn snapshot_url(cfg: &Config, store: &LedgerStore) -> Result<()> {
    let rows = store.load_rows();
    let summary = summarize(&cfg.wallet, &rows);
    println!("{}", build_snapshot_link(&cfg.base_url, &cfg.wallet, &summary));
    Ok(())
}

/// Render the public view for a visited URL: granted, denied, snapshot or
/// invalid, always as plain text.
fn open(gate: &ShareGate, store: &LedgerStore, args: &[String]) -> Result<()> {
    let url = args.first().ok_or_else(|| anyhow!("open needs a URL"))?;
    match resolve_public_url(url, gate, store) {
        PublicView::NotPublic => println!("invalid link"),
        PublicView::Denied { wallet } => {
            println!("access denied — this dashboard for {} requires ?token=…", mask_wallet(&wallet));
        }
        PublicView::Snapshot { wallet, data } => {
            println!("{} (snapshot)", page_title(&wallet));
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        PublicView::Granted { wallet, data } => {
            println!("{}", page_title(&wallet));
            println!("{}", page_description(&data));
            println!("# airdrops: {}", data.airdrop_count);
            for claim in &data.claims {
                println!("  {:<8} {:<12} {:<12} {}", claim.token, claim.chain, claim.date, usd(claim.usd));
            }
        }
    }
    Ok(())
}

fn export_csv(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let csv = export::to_csv(&store.load_rows());
    write_export(cfg, "csv", &csv, args)
}

fn export_json(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let json = export::to_json(&store.load_rows());
    write_export(cfg, "json", &json, args)
}

fn write_export(cfg: &Config, ext: &str, content: &str, args: &[String]) -> Result<()> {
    let path = match args.first() {
        Some(p) => p.clone(),
        None => export::export_filename(&cfg.export_base, ext, &today()),
    };
    std::fs::write(&path, content).with_context(|| format!("cannot write {}", path))?;
    log(
        Level::Info,
        Domain::Export,
        "export_written",
        obj(&[
            ("path", v_str(&path)),
            ("bytes", v_num(content.len() as f64)),
            ("sha256", v_str(&export::content_sha256(content))),
        ]),
    );
    println!("wrote {}", path);
    Ok(())
}

fn import_json(cfg: &Config, store: &LedgerStore, args: &[String]) -> Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("import-json needs a file path"))?;
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path))?;
    let rows = export::from_json(&text)?;
    store.commit_rows(&cfg.wallet, &rows);
    println!("imported {} rows", rows.len());
    Ok(())
}

fn demo(cfg: &Config, store: &LedgerStore) -> Result<()> {
    let summary = droptally::store::demo_summary();
    store.save_summary(&summary);
    println!("demo summary stored; try: open {}", build_share_url(&cfg.base_url, &summary.wallet, None));
    Ok(())
}
