// ── Record storage ──
//
// Process-lifetime, in-memory only.

mod cache;

pub use cache::RecordCache;
