use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::task::{self, JoinError};
use tracing::{trace, warn};

use super::curve::LevelCurve;

/// Extensions of the cache longer than this are logged as suspicious.
const LARGE_EXTENSION: i64 = 100_000;

/// Converts a `(level, xp in level)` pair into the total xp earned by a user.
///
/// Keeps a cache of the xp needed to reach the start of each level, so that
/// the sum over all previous levels is only computed once per process.
/// The cache is append-only: entries are never removed or overwritten, and
/// levels are always filled in order from the highest cached one, so every
/// entry holds the same value whichever call computed it.
#[derive(Debug)]
pub struct XpCalculator {
    curve: LevelCurve,
    cache: Mutex<BTreeMap<i64, f64>>,
}

impl Default for XpCalculator {
    fn default() -> Self {
        Self::new(LevelCurve::default())
    }
}

impl XpCalculator {
    pub fn new(curve: LevelCurve) -> Self {
        Self {
            curve,
            cache: Mutex::new(BTreeMap::from([(0, 0.0)])),
        }
    }

    pub const fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    /// Total xp needed to reach the start of `level`.
    pub fn total_xp_for_level(&self, level: i64) -> f64 {
        if level <= 0 {
            return 0.0;
        }

        // Only values computed from the curve are ever inserted, so the map is
        // still valid if another thread panicked while holding the lock
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(total) = cache.get(&level) {
            return *total;
        }

        // Level 0 is always cached
        let (from, mut total) = cache
            .range(..level)
            .next_back()
            .map_or((0, 0.0), |(lvl, xp)| (*lvl, *xp));

        if level - from > LARGE_EXTENSION {
            warn!("Stored level {level} is implausibly high, caching {} levels", level - from);
        } else {
            trace!("Extending xp cache from level {from} to {level}");
        }
        for lvl in from..level {
            total += self.curve.xp_to_complete(lvl);
            cache.insert(lvl + 1, total);
        }

        total
    }

    /// Total xp earned by a user at `level` with `current_xp` earned since the start of it.
    ///
    /// `current_xp` is not checked against the xp needed to complete `level`.
    pub fn cumulative_xp(&self, level: i64, current_xp: f64) -> f64 {
        if level <= 0 {
            return current_xp.max(0.0);
        }

        self.total_xp_for_level(level) + current_xp
    }

    /// Run `f` on the blocking thread pool.
    ///
    /// Extending the cache to a high level holds the lock for as long as the
    /// sum takes, which must not stall the async workers.
    pub async fn blocking<F, T>(self: &Arc<Self>, f: F) -> Result<T, JoinError>
    where
        F: FnOnce(&Self) -> T + Send + 'static,
        T: Send + 'static,
    {
        let xp = Arc::clone(self);
        task::spawn_blocking(move || f(&xp)).await
    }

    /// Number of levels currently cached, level 0 included.
    pub fn cached_levels(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
