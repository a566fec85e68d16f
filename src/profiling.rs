//! Simple profiling counters for understanding hot paths.

use std::sync::atomic::{AtomicU64, Ordering};

pub static MEMO_HITS: AtomicU64 = AtomicU64::new(0);
pub static MEMO_MISSES: AtomicU64 = AtomicU64::new(0);
pub static SPLIT_COUNT: AtomicU64 = AtomicU64::new(0);
pub static MERGE_COUNT: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn memo_hit() {
    MEMO_HITS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn memo_miss() {
    MEMO_MISSES.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn split() {
    SPLIT_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn merge() {
    MERGE_COUNT.fetch_add(1, Ordering::Relaxed);
}

pub fn reset() {
    MEMO_HITS.store(0, Ordering::Relaxed);
    MEMO_MISSES.store(0, Ordering::Relaxed);
    SPLIT_COUNT.store(0, Ordering::Relaxed);
    MERGE_COUNT.store(0, Ordering::Relaxed);
}

pub fn report() -> String {
    let hits = MEMO_HITS.load(Ordering::Relaxed);
    let misses = MEMO_MISSES.load(Ordering::Relaxed);
    let total = hits + misses;
    let hit_rate = if total > 0 { hits as f64 / total as f64 * 100.0 } else { 0.0 };

    let splits = SPLIT_COUNT.load(Ordering::Relaxed);
    let merges = MERGE_COUNT.load(Ordering::Relaxed);

    format!(
        "Memo: {}/{} ({:.1}% hit), Splits: {}, Merges: {}",
        hits, total, hit_rate, splits, merges
    )
}
