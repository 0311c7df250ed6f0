//! Smoke tests: end-to-end validation of the sharing and snapshot paths.
//!
//! These exercise whole flows against real stores (in-memory and sqlite)
//! rather than single functions. They are the gate between "code compiles"
//! and "links actually work."

use std::sync::Arc;

use serde_json::json;

use droptally::export::{from_json, parse_csv, to_csv, to_json};
use droptally::kv::{KvStore, MemoryKv, SqliteKv};
use droptally::share::{build_share_url, generate_token, Access, ShareGate};
use droptally::snapshot::{build_snapshot_link, decode, encode, extract_snapshot};
use droptally::state::ClaimRow;
use droptally::store::LedgerStore;
use droptally::totals::summarize;
use droptally::view::{resolve_public_url, PublicView};

const WALLET: &str = "0xABCDEF1234567890000000000000000000000042";

fn sample_rows() -> Vec<ClaimRow> {
    let mut arb = ClaimRow::new("2025-10-11");
    arb.project = "Arbitrum".to_string();
    arb.token = "ARB".to_string();
    arb.qty = 100.0;
    arb.cg_id = "arbitrum".to_string();
    arb.claim_usd = 210.44;
    arb.price_now = 2.5;

    let mut strk = ClaimRow::new("2025-10-05");
    strk.project = "Starknet".to_string();
    strk.token = "STRK".to_string();
    strk.qty = 500.0;
    strk.cg_id = "starknet".to_string();
    strk.claim_usd = 98.12;
    strk.sold_usd = Some(120.0);

    vec![arb, strk]
}

// ---------------------------------------------------------------------------
// Share flow: enable link, visit with wrong/right token
// ---------------------------------------------------------------------------
#[test]
fn share_flow_end_to_end() {
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let gate = ShareGate::new(kv.clone());
    let store = LedgerStore::new(kv);

    // owner enables sharing with a fixed token
    gate.set_token(WALLET, "abc123xyz456");
    let url = build_share_url("https://droptally.local", WALLET, Some("abc123xyz456"));
    assert!(url.ends_with("/public/0xabcdef1234567890000000000000000000000042?token=abc123xyz456"));

    // visitor with a wrong token is denied, with the right one granted
    let wrong = url.replace("abc123xyz456", "wrong");
    assert!(matches!(resolve_public_url(&wrong, &gate, &store), PublicView::Denied { .. }));
    assert!(matches!(resolve_public_url(&url, &gate, &store), PublicView::Granted { .. }));

    // owner revokes: the link opens for everyone again
    gate.clear_token(WALLET);
    assert!(matches!(resolve_public_url(&wrong, &gate, &store), PublicView::Granted { .. }));
}

// ---------------------------------------------------------------------------
// Identity normalization holds across every gate operation
// ---------------------------------------------------------------------------
#[test]
fn share_gate_is_case_insensitive_end_to_end() {
    let gate = ShareGate::new(Arc::new(MemoryKv::new()));
    gate.set_token(&WALLET.to_uppercase(), "tok");
    assert_eq!(gate.token(&WALLET.to_lowercase()).as_deref(), Some("tok"));
    assert_eq!(gate.check_access(WALLET, Some("tok")), Access::Granted);
    gate.clear_token(&WALLET.to_lowercase());
    assert_eq!(gate.token(WALLET), None);
}

// ---------------------------------------------------------------------------
// Token generation: 10k draws, zero collisions
// ---------------------------------------------------------------------------
#[test]
fn generated_tokens_do_not_collide() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10_000 {
        let t = generate_token(24);
        assert_eq!(t.len(), 24);
        assert!(seen.insert(t), "token collision at draw {}", seen.len());
    }
}

// ---------------------------------------------------------------------------
// Snapshot flow: encode a summary, ship it in a link, resolve it elsewhere
// ---------------------------------------------------------------------------
#[test]
fn snapshot_flow_end_to_end() {
    let rows = sample_rows();
    let summary = summarize(WALLET, &rows);
    let link = build_snapshot_link("https://droptally.local", WALLET, &summary);

    // resolver on a machine with NO shared storage and a token set: the
    // snapshot is self-contained, so the gate never applies
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let gate = ShareGate::new(kv.clone());
    gate.set_token(WALLET, "unrelated");
    let store = LedgerStore::new(kv);

    match resolve_public_url(&link, &gate, &store) {
        PublicView::Snapshot { wallet, data } => {
            assert_eq!(wallet, WALLET.to_lowercase());
            assert_eq!(data, serde_json::to_value(&summary).unwrap());
            assert_eq!(data["claims"][0]["usd"].as_f64().unwrap(), 210.44);
        }
        other => panic!("expected snapshot view, got {:?}", other),
    }
}

#[test]
fn snapshot_codec_round_trip_law() {
    let value = json!({"claims": [{"token": "ARB", "usd": 210.44}]});
    let encoded = encode(&value);
    assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    assert_eq!(decode(&encoded), Some(value));
    assert_eq!(decode("not-valid-base64!!"), None);
    assert_eq!(extract_snapshot(&format!("#s={}", encoded)).unwrap()["claims"][0]["token"], "ARB");
}

// ---------------------------------------------------------------------------
// Durable store: rows, summary and token survive a process restart
// ---------------------------------------------------------------------------
#[test]
fn sqlite_backed_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite");
    let path = path.to_str().unwrap();
    let rows = sample_rows();

    {
        let kv = Arc::new(SqliteKv::open(path).unwrap());
        let store = LedgerStore::new(kv.clone());
        let gate = ShareGate::new(kv);
        store.save_rows(&rows);
        store.save_summary(&summarize(WALLET, &rows));
        gate.set_token(WALLET, "persisted");
    }

    let kv = Arc::new(SqliteKv::open(path).unwrap());
    let store = LedgerStore::new(kv.clone());
    let gate = ShareGate::new(kv);
    let back = store.load_rows();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].token, "ARB");
    assert_eq!(store.load_summary().unwrap().airdrop_count, 2);
    assert_eq!(gate.token(WALLET).as_deref(), Some("persisted"));

    // visiting the share URL against the reopened store
    let url = build_share_url("https://droptally.local", WALLET, Some("persisted"));
    match resolve_public_url(&url, &gate, &store) {
        PublicView::Granted { data, .. } => assert_eq!(data.claims.len(), 2),
        other => panic!("expected granted, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Row mutations keep the public view current
// ---------------------------------------------------------------------------
#[test]
fn public_view_tracks_row_removal() {
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    let gate = ShareGate::new(kv.clone());
    let store = LedgerStore::new(kv);
    let url = build_share_url("https://droptally.local", WALLET, None);

    let rows = sample_rows();
    store.commit_rows(WALLET, &rows);
    match resolve_public_url(&url, &gate, &store) {
        PublicView::Granted { data, .. } => {
            assert_eq!(data.airdrop_count, 2);
            assert!(data.claims.iter().any(|c| c.token == "ARB"));
        }
        other => panic!("expected granted, got {:?}", other),
    }

    // owner deletes the ARB row; a visitor must no longer see it
    let remaining: Vec<ClaimRow> = rows.into_iter().filter(|r| r.token != "ARB").collect();
    store.commit_rows(WALLET, &remaining);
    match resolve_public_url(&url, &gate, &store) {
        PublicView::Granted { data, .. } => {
            assert_eq!(data.airdrop_count, 1);
            assert!(data.claims.iter().all(|c| c.token != "ARB"));
        }
        other => panic!("expected granted, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Import/export: CSV and JSON round-trip through real text
// ---------------------------------------------------------------------------
#[test]
fn export_import_round_trip() {
    let rows = sample_rows();

    let csv = to_csv(&rows);
    let from_csv = parse_csv(&csv).unwrap();
    assert_eq!(from_csv.len(), rows.len());
    assert_eq!(from_csv[0].claim_usd, 210.44);
    assert_eq!(from_csv[1].sold_usd, Some(120.0));

    let json = to_json(&rows);
    let from_json_rows = from_json(&json).unwrap();
    assert_eq!(from_json_rows[0].id, rows[0].id);
    assert_eq!(from_json_rows[1].cg_id, "starknet");
}

// ---------------------------------------------------------------------------
// Malformed storage degrades, never crashes the public view
// ---------------------------------------------------------------------------
#[test]
fn malformed_storage_degrades_to_fallbacks() {
    let kv: Arc<MemoryKv> = Arc::new(MemoryKv::new());
    kv.set("airdrop_tracker_rows_v1", "{broken");
    kv.set("airdrop-tracker", "[not, a, summary");
    let gate = ShareGate::new(kv.clone());
    let store = LedgerStore::new(kv);

    assert!(store.load_rows().is_empty());
    assert!(store.load_summary().is_none());
    // open-by-default: nothing stored under the token key
    match resolve_public_url("https://droptally.local/public/0xabc", &gate, &store) {
        PublicView::Granted { data, .. } => assert_eq!(data.airdrop_count, 27), // demo fallback
        other => panic!("expected granted demo view, got {:?}", other),
    }
}
