//! Per-domain request pacing
//!
//! Each domain owns its own mutex around the instant of its last request. The
//! whole read-decide-sleep-record sequence runs under that mutex, so workers
//! targeting the same domain queue up behind each other instead of all
//! observing the same stale timestamp. Workers on different domains never
//! contend, and the map of domains is only touched long enough to clone the
//! domain's slot.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

type Slot = Arc<Mutex<Option<Instant>>>;

/// Enforces a minimum gap between requests to the same domain
#[derive(Debug)]
pub struct DomainThrottle {
    delay: Duration,
    domains: DashMap<String, Slot>,
}

impl DomainThrottle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            domains: DashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn slot(&self, domain: &str) -> Slot {
        if let Some(slot) = self.domains.get(domain) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.domains
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        )
    }

    /// Blocks until `delay` has passed since the domain's last request, then
    /// records now as its last request
    ///
    /// The first request to an unseen domain proceeds immediately.
    ///
    /// # Returns
    ///
    /// How long the caller was made to sleep.
    pub fn wait(&self, domain: &str) -> Duration {
        let slot = self.slot(domain);
        let mut last = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                waited = self.delay - elapsed;
                tracing::trace!("Throttling {} for {:?}", domain, waited);
                thread::sleep(waited);
            }
        }

        *last = Some(Instant::now());
        waited
    }

    /// Records now as the domain's last request without waiting
    ///
    /// Called once a fetch has finished, successful or not, so the gap is
    /// measured from the end of the previous request.
    pub fn record(&self, domain: &str) {
        let slot = self.slot(domain);
        let mut last = slot.lock().unwrap_or_else(PoisonError::into_inner);
        *last = Some(Instant::now());
    }

    /// Instant of the last request recorded for `domain`
    pub fn last_request(&self, domain: &str) -> Option<Instant> {
        let slot = self.domains.get(domain).map(|s| Arc::clone(s.value()))?;
        let last = slot.lock().unwrap_or_else(PoisonError::into_inner);
        *last
    }

    /// Number of domains seen so far
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_first_request_is_immediate() {
        let throttle = DomainThrottle::new(Duration::from_secs(10));

        let start = Instant::now();
        let waited = throttle.wait("example.com");
        assert_eq!(waited, Duration::ZERO);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(throttle.last_request("example.com").is_some());
    }

    #[test]
    fn test_second_request_waits_for_delay() {
        let delay = Duration::from_millis(50);
        let throttle = DomainThrottle::new(delay);

        throttle.wait("example.com");
        let first = throttle.last_request("example.com").unwrap();
        throttle.wait("example.com");
        let second = throttle.last_request("example.com").unwrap();

        assert!(second.duration_since(first) >= delay);
    }

    #[test]
    fn test_domains_are_independent() {
        let throttle = DomainThrottle::new(Duration::from_secs(10));

        throttle.wait("a.example");
        let start = Instant::now();
        let waited = throttle.wait("b.example");
        assert_eq!(waited, Duration::ZERO);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(throttle.domain_count(), 2);
    }

    #[test]
    fn test_record_pushes_next_request_back() {
        let delay = Duration::from_millis(40);
        let throttle = DomainThrottle::new(delay);

        throttle.record("example.com");
        let recorded = throttle.last_request("example.com").unwrap();
        throttle.wait("example.com");
        let next = throttle.last_request("example.com").unwrap();

        assert!(next.duration_since(recorded) >= delay);
    }

    #[test]
    fn test_unseen_domain_has_no_last_request() {
        let throttle = DomainThrottle::new(Duration::from_millis(10));
        assert!(throttle.last_request("example.com").is_none());
    }

    #[test]
    fn test_concurrent_waiters_are_paced() {
        let delay = Duration::from_millis(30);
        let throttle = Arc::new(DomainThrottle::new(delay));
        let barrier = Arc::new(Barrier::new(4));
        let starts = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                let barrier = Arc::clone(&barrier);
                let starts = Arc::clone(&starts);
                thread::spawn(move || {
                    barrier.wait();
                    throttle.wait("example.com");
                    starts.lock().unwrap().push(Instant::now());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        let total = starts[3].duration_since(starts[0]);
        // Four requests need three full gaps; allow one gap of scheduling jitter
        assert!(total >= delay * 2);
    }
}
