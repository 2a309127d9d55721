//! A mapping from key to last-accept time with a fixed interval (§4.F). `register` always
//! extends the window on access, accepted or not: this follows the source's behavior (design
//! note 1) rather than silently changing it to only extend on acceptance.

use dashmap::{mapref::entry::Entry, DashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct RateLimiter<K> {
    interval: Duration,
    last_seen: DashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_seen: DashMap::new(),
        }
    }

    /// Returns true iff `key` was last seen within `interval` of now. Records `now` as the new
    /// last-seen time regardless of the outcome.
    pub fn register(&self, key: K) -> bool {
        let now = Instant::now();
        match self.last_seen.entry(key) {
            Entry::Occupied(mut e) => {
                let limited = now.duration_since(*e.get()) < self.interval;
                e.insert(now);
                limited
            }
            Entry::Vacant(e) => {
                e.insert(now);
                false
            }
        }
    }

    /// Evicts entries untouched for longer than `interval + grace`. Driven by a supervised
    /// periodic consumer (§10.E), not by request traffic.
    pub fn sweep(&self, grace: Duration) {
        let cutoff = self.interval + grace;
        let now = Instant::now();
        self.last_seen.retain(|_, last| now.duration_since(*last) < cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_access_is_never_limited() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(!limiter.register("u1"));
    }

    #[test]
    fn repeat_access_within_window_is_limited() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        assert!(!limiter.register("u1"));
        assert!(limiter.register("u1"));
    }

    #[test]
    fn denied_access_still_extends_the_window() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        assert!(!limiter.register("u1"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(limiter.register("u1"));
        std::thread::sleep(Duration::from_millis(10));
        // still within 20ms of the second (extended) access
        assert!(limiter.register("u1"));
    }

    #[test]
    fn sweep_evicts_stale_entries() {
        let limiter = RateLimiter::new(Duration::from_millis(1));
        limiter.register("u1");
        std::thread::sleep(Duration::from_millis(20));
        limiter.sweep(Duration::from_millis(1));
        assert!(limiter.last_seen.is_empty());
    }
}
