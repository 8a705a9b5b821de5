use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::production::ProductionManager;

/// Process-wide counters, mutated only from the batching controller's
/// flush path. `ingredient_tally` uses a mutex rather than discrete
/// atomics per token because the token set is data-driven rather than
/// fixed at compile time.
#[derive(Clone, Default)]
pub struct Stats {
    pub accepted_orders: Arc<AtomicU64>,
    pub refused_orders: Arc<AtomicU64>,
    ingredient_tally: Arc<Mutex<HashMap<char, u64>>>,
}

impl Stats {
    pub fn record_accepted(&self, tally_delta: &HashMap<char, u64>) {
        self.accepted_orders.fetch_add(1, Ordering::Relaxed);
        let mut tally = self.ingredient_tally.lock();
        for (k, v) in tally_delta {
            *tally.entry(*k).or_insert(0) += v;
        }
    }

    pub fn record_refused(&self) {
        self.refused_orders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted_orders.load(Ordering::Relaxed),
            refused: self.refused_orders.load(Ordering::Relaxed),
            ingredient_tally: self.ingredient_tally.lock().clone(),
        }
    }
}

/// Point-in-time copy of [`Stats`], safe to serialize without holding
/// any lock.
#[derive(Clone, Debug, Default)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub refused: u64,
    pub ingredient_tally: HashMap<char, u64>,
}

/// The only mutable shared state in the process: `(Catalog, Production
/// Manager, Stats)`, bundled for the order agent and the dashboard agent
/// to each hold a clone of.
#[derive(Clone)]
pub struct SharedContext {
    pub catalog: Arc<Catalog>,
    pub production: Arc<ProductionManager>,
    pub stats: Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepted_bumps_counter_and_tally() {
        let stats = Stats::default();
        let mut delta = HashMap::new();
        delta.insert('R', 3);
        stats.record_accepted(&delta);
        let snap = stats.snapshot();
        assert_eq!(snap.accepted, 1);
        assert_eq!(snap.ingredient_tally.get(&'R'), Some(&3));
    }

    #[test]
    fn record_refused_bumps_only_refused_counter() {
        let stats = Stats::default();
        stats.record_refused();
        let snap = stats.snapshot();
        assert_eq!(snap.refused, 1);
        assert_eq!(snap.accepted, 0);
    }

    #[test]
    fn tally_accumulates_across_multiple_accepts() {
        let stats = Stats::default();
        let mut first = HashMap::new();
        first.insert('R', 2);
        let mut second = HashMap::new();
        second.insert('R', 5);
        stats.record_accepted(&first);
        stats.record_accepted(&second);
        assert_eq!(stats.snapshot().ingredient_tally.get(&'R'), Some(&7));
    }
}
