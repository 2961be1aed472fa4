use crate::sim::TimerTable;

#[test]
fn fire_claims_an_armed_timer_exactly_once() {
    let mut timers = TimerTable::default();
    let id = timers.arm(7);
    assert_eq!(timers.active(), 1);

    assert_eq!(timers.fire(id), Some(7));
    assert_eq!(timers.fire(id), None);
    assert_eq!(timers.active(), 0);
}

#[test]
fn cancelled_timer_never_fires_and_cancel_is_idempotent() {
    let mut timers = TimerTable::default();
    let id = timers.arm(1);

    assert!(timers.cancel(id));
    assert!(!timers.cancel(id));
    assert_eq!(timers.fire(id), None);
}

#[test]
fn cancel_after_fire_reports_nothing_to_cancel() {
    let mut timers = TimerTable::default();
    let id = timers.arm(1);

    assert_eq!(timers.fire(id), Some(1));
    assert!(!timers.cancel(id));
}

#[test]
fn independent_timers_do_not_interfere() {
    let mut timers = TimerTable::default();
    let a = timers.arm(0);
    let b = timers.arm(1);
    let c = timers.arm(2);
    assert_ne!(a, b);
    assert_eq!(timers.active(), 3);

    timers.cancel(b);
    assert_eq!(timers.active(), 2);
    assert_eq!(timers.fire(c), Some(2));
    assert_eq!(timers.fire(b), None);
    assert_eq!(timers.fire(a), Some(0));
    assert_eq!(timers.active(), 0);
}

#[test]
fn timer_ids_are_not_reused() {
    let mut timers = TimerTable::default();
    let a = timers.arm(0);
    timers.cancel(a);
    let b = timers.arm(0);
    assert_ne!(a, b);
    assert_eq!(timers.fire(a), None);
    assert_eq!(timers.fire(b), Some(0));
}
