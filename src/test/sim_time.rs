use crate::flow::NodeId;
use crate::sim::{ScheduledUpdate, SimTime};
use std::collections::BinaryHeap;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_millis(1), SimTime(1));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000));
    assert_eq!(SimTime::from_secs(3).as_millis(), 3_000);
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime::INFINITY);
    assert_eq!(SimTime(u64::MAX - 1).saturating_add(SimTime(10)), SimTime::INFINITY);
    assert_eq!(SimTime(5).saturating_sub(SimTime(10)), SimTime::ZERO);
}

#[test]
fn infinity_is_the_only_infinite_time() {
    assert!(SimTime::INFINITY.is_infinite());
    assert!(!SimTime(u64::MAX - 1).is_infinite());
    assert!(SimTime::ZERO < SimTime::INFINITY);
}

#[test]
fn scheduled_updates_pop_earliest_first_then_in_registration_order() {
    let mut heap = BinaryHeap::new();
    heap.push(ScheduledUpdate::new(SimTime(20), 0, NodeId(0)));
    heap.push(ScheduledUpdate::new(SimTime(10), 2, NodeId(1)));
    heap.push(ScheduledUpdate::new(SimTime(10), 1, NodeId(2)));

    let order: Vec<(SimTime, u64)> = std::iter::from_fn(|| heap.pop())
        .map(|t| (t.at(), t.seq()))
        .collect();
    assert_eq!(order, vec![(SimTime(10), 1), (SimTime(10), 2), (SimTime(20), 0)]);
}
