use crate::record::Level;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Volume control applied per process, keyed by level and message.
///
/// Within each `tick` the first `initial` records of a key are kept, then
/// only every `thereafter`-th one. A `thereafter` of zero drops everything
/// past `initial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub initial: u64,
    pub thereafter: u64,
    pub tick: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            initial: 100,
            thereafter: 100,
            tick: Duration::from_secs(1),
        }
    }
}

/// Counter slots per level. Messages hash into a slot, so memory stays fixed
/// no matter how many distinct messages pass through; colliding messages
/// share a budget.
const SLOTS_PER_LEVEL: usize = 4096;

const LEVELS: usize = 4;

#[derive(Default)]
struct Counter {
    /// Nanoseconds since the sampler's epoch at which this window ends.
    reset_at: AtomicU64,
    seen: AtomicU64,
}

impl Counter {
    fn incr(&self, now: u64, tick: u64) -> u64 {
        let reset_at = self.reset_at.load(Ordering::Acquire);
        if reset_at > now {
            return self.seen.fetch_add(1, Ordering::AcqRel) + 1;
        }

        self.seen.store(1, Ordering::Release);
        match self.reset_at.compare_exchange(
            reset_at,
            now.saturating_add(tick),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => 1,
            // another caller opened the window first
            Err(_) => self.seen.fetch_add(1, Ordering::AcqRel) + 1,
        }
    }
}

pub struct Sampler {
    config: SamplingConfig,
    epoch: Instant,
    counters: Box<[Counter]>,
}

impl Sampler {
    pub fn new(config: SamplingConfig) -> Self {
        let tick = config.tick.max(Duration::from_millis(1));
        Sampler {
            config: SamplingConfig { tick, ..config },
            epoch: Instant::now(),
            counters: (0..LEVELS * SLOTS_PER_LEVEL)
                .map(|_| Counter::default())
                .collect(),
        }
    }

    /// Whether a record with this level and message should be emitted.
    pub fn admit(&self, level: Level, message: &str) -> bool {
        self.admit_at(level, message, Instant::now())
    }

    fn admit_at(&self, level: Level, message: &str, now: Instant) -> bool {
        let now = nanos(now.saturating_duration_since(self.epoch));
        let tick = nanos(self.config.tick);
        let seen = self.counters[slot(level, message)].incr(now, tick);

        if seen <= self.config.initial {
            return true;
        }
        let past = seen - self.config.initial;
        self.config.thereafter > 0 && past % self.config.thereafter == 0
    }
}

fn slot(level: Level, message: &str) -> usize {
    let row = match level {
        Level::Debug => 0,
        Level::Info => 1,
        Level::Warning => 2,
        Level::Error => 3,
    };
    let mut hasher = DefaultHasher::new();
    message.hash(&mut hasher);
    row * SLOTS_PER_LEVEL + (hasher.finish() as usize % SLOTS_PER_LEVEL)
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_admitted(sampler: &Sampler, n: u64, now: Instant) -> u64 {
        (0..n)
            .filter(|_| sampler.admit_at(Level::Info, "hot", now))
            .count() as u64
    }

    #[test]
    fn keeps_initial_then_every_nth() {
        let sampler = Sampler::new(SamplingConfig {
            initial: 3,
            thereafter: 5,
            tick: Duration::from_secs(60),
        });
        let now = Instant::now();
        // 3 initial + records 8, 13, 18 of 20
        assert_eq!(count_admitted(&sampler, 20, now), 6);
        // other keys have their own window
        assert!(sampler.admit_at(Level::Error, "hot", now));
    }

    #[test]
    fn window_resets_after_tick() {
        let sampler = Sampler::new(SamplingConfig {
            initial: 1,
            thereafter: 0,
            tick: Duration::from_millis(10),
        });
        let start = Instant::now();
        assert!(sampler.admit_at(Level::Info, "m", start));
        assert!(!sampler.admit_at(Level::Info, "m", start));
        assert!(sampler.admit_at(Level::Info, "m", start + Duration::from_millis(20)));
    }

    #[test]
    fn distinct_messages_do_not_grow_memory() {
        let sampler = Sampler::new(SamplingConfig {
            initial: 1,
            thereafter: 0,
            tick: Duration::from_millis(1),
        });
        let start = Instant::now();
        for i in 0..100_000 {
            sampler.admit_at(Level::Error, &format!("connection {} refused", i), start);
        }
        assert_eq!(sampler.counters.len(), LEVELS * SLOTS_PER_LEVEL);

        // expired windows are reused
        let later = start + Duration::from_millis(20);
        assert!(sampler.admit_at(Level::Error, "connection 7 refused", later));
        assert_eq!(sampler.counters.len(), LEVELS * SLOTS_PER_LEVEL);
    }
}
