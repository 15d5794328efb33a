// ── Response parsing ──
//
// Turns raw response bodies into typed records. Nothing here touches the
// cache or the network.

pub mod baseline;
pub mod classify;
pub mod factory;
pub mod history;
mod wire;

pub use baseline::{BASELINE_KEYS, BaselineInfo, BaselineOutcome, parse_baseline};
pub use classify::{Classification, classify};
pub use factory::{ParseOutcome, parse_records, parse_records_in, parse_value, parse_value_in};
pub use history::collect_changes;
