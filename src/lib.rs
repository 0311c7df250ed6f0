pub mod export;
pub mod kv;
pub mod logging;
pub mod prices;
pub mod share;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod totals;
pub mod view;
