use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use vigil::{OneShotTimer, PeriodicTimer, Timer};

fn counting() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
    let count = Rc::new(Cell::new(0));
    let handle = count.clone();
    (count, move || handle.set(handle.get() + 1))
}

/// A timer relying on the provided trait methods only.
struct Never(Instant);

impl Timer for Never {
    fn next_activation(&self) -> Option<Instant> {
        Some(self.0)
    }
}

#[test]
fn test_periodic_catch_up_fires_once() {
    let t0 = Instant::now();
    let period = Duration::from_millis(40);
    let (count, handler) = counting();
    let mut timer = PeriodicTimer::starting_at(t0, period, handler);

    // polled 3.5 periods after the first deadline
    let changed = timer.poll(t0 + period * 7 / 2);

    assert!(changed);
    assert_eq!(count.get(), 1, "a late periodic timer fires once, not per missed period");
    assert_eq!(timer.next_activation(), Some(t0 + period * 4));
}

#[test]
fn test_periodic_does_not_fire_early() {
    let t0 = Instant::now();
    let (count, handler) = counting();
    let mut timer =
        PeriodicTimer::starting_at(t0 + Duration::from_secs(1), Duration::from_secs(1), handler);

    assert!(!timer.poll(t0));
    assert!(!timer.poll(t0 + Duration::from_millis(999)));
    assert_eq!(count.get(), 0);
    assert_eq!(timer.period(), Duration::from_secs(1));
}

#[test]
fn test_one_shot_is_never_activated_twice() {
    let t0 = Instant::now();
    let (count, handler) = counting();
    let mut timer = OneShotTimer::at(t0, handler);

    assert!(timer.poll(t0 + Duration::from_millis(1)));
    for later in 2..10 {
        assert!(!timer.poll(t0 + Duration::from_secs(later)));
    }

    assert_eq!(count.get(), 1);
    assert_eq!(timer.next_activation(), None);
}

#[test]
fn test_base_timer_is_a_noop() {
    let at = Instant::now();
    let mut timer = Never(at);

    assert!(!timer.poll(at + Duration::from_secs(60)));
    assert_eq!(timer.next_activation(), Some(at));
}
