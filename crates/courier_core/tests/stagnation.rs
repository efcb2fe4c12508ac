use courier_core::{StagnationTracker, Step};

#[test]
fn settles_after_threshold_flat_observations() {
    let mut tracker = StagnationTracker::new(3, 100, 10);
    assert_eq!(tracker.observe(10), Step::Continue);
    assert_eq!(tracker.observe(10), Step::Continue);
    assert_eq!(tracker.observe(10), Step::Settled);
    assert_eq!(tracker.iterations(), 3);
}

#[test]
fn growth_resets_the_window() {
    let mut tracker = StagnationTracker::new(2, 100, 0);
    assert_eq!(tracker.observe(0), Step::Continue);
    assert_eq!(tracker.observe(5), Step::Continue);
    assert_eq!(tracker.observe(5), Step::Continue);
    assert_eq!(tracker.observe(5), Step::Settled);
    assert_eq!(tracker.last_count(), 5);
}

#[test]
fn cap_stops_a_listing_that_never_settles() {
    let mut tracker = StagnationTracker::new(5, 4, 0);
    let mut steps = Vec::new();
    for count in 1..=4 {
        steps.push(tracker.observe(count));
    }
    assert_eq!(
        steps,
        vec![Step::Continue, Step::Continue, Step::Continue, Step::CapReached]
    );
    assert!(!tracker.can_disclose());
}

#[test]
fn shrinking_count_counts_as_no_growth() {
    let mut tracker = StagnationTracker::new(1, 10, 8);
    assert_eq!(tracker.observe(6), Step::Settled);
    assert_eq!(tracker.last_count(), 8);
}
