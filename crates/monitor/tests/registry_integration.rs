//! Integration tests for the dynamic registry
//!
//! Exercises counter and timer creation by name and tags, idle expiry and
//! concurrent updates through the public facade.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use dynmon::cache::{ExpiringCache, ExpiringCacheConfig};
use dynmon::clock::MockClock;
use dynmon::monitor::{CompositeMonitor, Monitor, TimeUnit};
use dynmon::registry::{DynamicRegistry, RegistryConfig};
use dynmon::tag::{TagList, TYPE_TAG};
use dynmon::{ErrorClassification, ErrorSeverity, MonitorError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Registry over caches with a 1000ms idle expiry and 100ms sweep interval
fn mock_registry() -> (DynamicRegistry<MockClock>, MockClock) {
    let clock = MockClock::new();
    let cache = ExpiringCacheConfig::builder()
        .idle_expiry(Duration::from_millis(1000))
        .max_entries(1000)
        .sweep_interval(Duration::from_millis(100))
        .build()
        .unwrap();
    let registry = DynamicRegistry::with_caches(
        ExpiringCache::with_clock(cache, clock.clone()).unwrap(),
        ExpiringCache::with_clock(cache, clock.clone()).unwrap(),
    );
    (registry, clock)
}

#[test]
fn test_counter_has_rate_tag() {
    let (registry, _) = mock_registry();
    registry.increment("test", &TagList::new()).unwrap();

    let counter = registry.find_counter("test", &TagList::new()).unwrap();
    assert_eq!(counter.config().tags().get(TYPE_TAG), Some("RATE"));
}

#[test]
fn test_get_value() {
    let (registry, _) = mock_registry();
    let tags = TagList::new().with("host", "a");

    registry.increment("test", &tags).unwrap();
    assert_eq!(registry.counter("test", &tags).unwrap().value(), 1.0);

    registry.increment_by("test", 13, &tags).unwrap();
    assert_eq!(registry.counter("test", &tags).unwrap().value(), 14.0);
}

/// Verifies idle expiry through the registry's amortized sweeps.
///
/// # Test Steps
/// 1. Increment test1 and test2 at t=0
/// 2. Increment test1 again at t=500 and t=1000
/// 3. At t=1200 make a call that triggers a sweep
/// 4. Verify test1 has count 3 and test2 is gone
#[test]
fn test_expiration() {
    init_tracing();
    let (registry, clock) = mock_registry();
    let none = TagList::new();

    registry.increment("test1", &none).unwrap();
    registry.increment("test2", &none).unwrap();
    clock.advance_millis(500);
    registry.increment("test1", &none).unwrap();
    clock.advance_millis(500);
    registry.increment("test1", &none).unwrap();
    clock.advance_millis(200);

    // Any counter call past the sweep interval sweeps the counter cache.
    registry.increment("other", &none).unwrap();

    assert_eq!(registry.find_counter("test1", &none).unwrap().count(), 3);
    assert!(registry.find_counter("test2", &none).is_none());
    assert_eq!(registry.stats().counters.expirations, 1);

    // Recreated from zero on next use.
    registry.increment("test2", &none).unwrap();
    assert_eq!(registry.find_counter("test2", &none).unwrap().count(), 1);
}

#[test]
fn test_timer_expiration_keeps_touched_timer() {
    let (registry, clock) = mock_registry();
    let none = TagList::new();

    registry.record("a", &none, 5.0, TimeUnit::Milliseconds).unwrap();
    registry.record("b", &none, 5.0, TimeUnit::Milliseconds).unwrap();
    clock.advance_millis(900);
    registry.record("b", &none, 7.0, TimeUnit::Milliseconds).unwrap();
    clock.advance_millis(300);

    let report = registry.sweep();
    assert_eq!(report.expired, 1);

    let b = registry.find_timer("b", &none, TimeUnit::Milliseconds).unwrap();
    assert_eq!(b.count(), 2);
    assert_eq!(b.max(), 7.0);
    assert!(registry.find_timer("a", &none, TimeUnit::Milliseconds).is_none());
}

#[test]
fn test_by_strings() {
    let (registry, _) = mock_registry();

    registry.increment_pairs("test", &["a", "1", "b", "2"]).unwrap();
    registry.increment_by_pairs("test", 4, &["b", "2", "a", "1"]).unwrap();

    let tags = TagList::from_pairs(&["a", "1", "b", "2"]).unwrap();
    assert_eq!(registry.find_counter("test", &tags).unwrap().count(), 5);
    assert_eq!(registry.counters().len(), 1);

    registry.record_pairs("latency", &["op", "get"], 3.0, TimeUnit::Milliseconds).unwrap();
    let timer = registry
        .find_timer("latency", &TagList::new().with("op", "get"), TimeUnit::Milliseconds)
        .unwrap();
    assert_eq!(timer.total_time(), 3.0);
}

/// Validates that malformed flattened tags are rejected cleanly.
///
/// # Test Steps
/// 1. Call each pairs-based operation with an odd-length list
/// 2. Verify `OddTagPairs` with Warning severity
/// 3. Verify no monitor was created
/// 4. Verify `["", ""]` is accepted
#[test]
fn test_odd_pairs_rejected() {
    init_tracing();
    let (registry, _) = mock_registry();

    let err = registry.increment_pairs("test", &["a"]).unwrap_err();
    assert!(matches!(err, MonitorError::OddTagPairs { len: 1, .. }));
    assert_eq!(err.severity(), ErrorSeverity::Warning);
    assert!(!err.is_retryable());

    assert!(registry.increment_by_pairs("test", 2, &["a", "b", "c"]).is_err());
    assert!(registry.record_pairs("test", &["a"], 1.0, TimeUnit::Seconds).is_err());
    assert!(registry.monitors().is_empty());

    registry.increment_pairs("test", &["", ""]).unwrap();
    assert_eq!(registry.counters().len(), 1);
}

#[test]
fn test_monitors_expose_composite_timers() {
    let (registry, _) = mock_registry();
    registry.record("db", &TagList::new(), 4.0, TimeUnit::Milliseconds).unwrap();
    registry.record("db", &TagList::new(), 8.0, TimeUnit::Milliseconds).unwrap();

    let monitors = registry.monitors();
    assert_eq!(monitors.len(), 1);
    assert_eq!(monitors[0].value(), 6.0);

    let timers = registry.timers();
    let timer = &timers[0];
    assert_eq!(timer.monitors()[0].get_and_reset(), 2.0);
    assert_eq!(timer.count(), 0);
    assert_eq!(timer.max(), 8.0);
}

/// Validates concurrent increments from many threads on shared and distinct
/// keys land on single instances.
#[test]
fn test_concurrent_increments() {
    let (registry, _) = mock_registry();
    let registry = Arc::new(registry);
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let own = TagList::new().with("thread", t.to_string());
                barrier.wait();
                for _ in 0..100 {
                    registry.increment("shared", &TagList::new()).unwrap();
                    registry.increment("own", &own).unwrap();
                    registry.record("latency", &TagList::new(), 1.0, TimeUnit::Milliseconds).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.find_counter("shared", &TagList::new()).unwrap().count(), 1600);
    assert_eq!(registry.counters().len(), 1 + threads);
    let timer = registry.find_timer("latency", &TagList::new(), TimeUnit::Milliseconds).unwrap();
    assert_eq!(timer.count(), 1600);
    assert_eq!(timer.total_time(), 1600.0);
}

#[test]
fn test_registry_from_toml() {
    let config = RegistryConfig::from_toml_str(
        r#"
        default_unit = "SECONDS"

        [timers]
        idle_expiry_ms = 1000
        max_entries = 2
        "#,
    )
    .unwrap();
    let registry = DynamicRegistry::with_clock(config, MockClock::new()).unwrap();

    for name in ["a", "b", "c"] {
        registry.record_duration(name, &TagList::new(), Duration::from_secs(1)).unwrap();
    }
    assert_eq!(registry.sweep().evicted, 1);
    assert_eq!(registry.timers().len(), 2);
    assert!(registry.timers().iter().all(|t| t.unit() == TimeUnit::Seconds));
}

#[test]
fn test_stats_serialize() {
    let (registry, _) = mock_registry();
    registry.increment("a", &TagList::new()).unwrap();

    let json = serde_json::to_value(registry.stats()).unwrap();
    assert_eq!(json["counters"]["size"], 1);
    assert_eq!(json["timers"]["size"], 0);
}
