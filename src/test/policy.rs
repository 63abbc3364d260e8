use crate::flow::{
    DistributionPolicy, DistributionPolicyKind, MaxMinFairnessPolicy, ProportionalSharePolicy,
};

#[test]
fn max_min_gives_everyone_their_demand_when_supply_suffices() {
    let supplies = MaxMinFairnessPolicy.distribute_supply(&[1.0, 2.0, 3.0], 10.0);
    assert_eq!(supplies, vec![1.0, 2.0, 3.0]);
}

#[test]
fn max_min_water_fills_from_the_smallest_demand() {
    let supplies = MaxMinFairnessPolicy.distribute_supply(&[9.0, 3.0], 10.0);
    assert_eq!(supplies, vec![7.0, 3.0]);

    let supplies = MaxMinFairnessPolicy.distribute_supply(&[8.0, 1.0, 8.0], 9.0);
    assert_eq!(supplies, vec![4.0, 1.0, 4.0]);
}

#[test]
fn max_min_handles_empty_and_zero_supply() {
    assert!(MaxMinFairnessPolicy.distribute_supply(&[], 5.0).is_empty());
    assert_eq!(MaxMinFairnessPolicy.distribute_supply(&[2.0, 3.0], 0.0), vec![0.0, 0.0]);
}

#[test]
fn proportional_share_scales_every_demand_by_the_same_factor() {
    let supplies = ProportionalSharePolicy.distribute_supply(&[3.0, 9.0], 10.0);
    assert_eq!(supplies, vec![2.5, 7.5]);
}

#[test]
fn proportional_share_passes_demands_through_when_supply_suffices() {
    let supplies = ProportionalSharePolicy.distribute_supply(&[3.0, 0.0, 4.0], 10.0);
    assert_eq!(supplies, vec![3.0, 0.0, 4.0]);
    assert!(ProportionalSharePolicy.distribute_supply(&[], 5.0).is_empty());
}

#[test]
fn policy_kind_parses_snake_case() {
    let kind: DistributionPolicyKind =
        serde_json::from_str("\"proportional_share\"").expect("parse");
    assert_eq!(kind, DistributionPolicyKind::ProportionalShare);
    assert_eq!(DistributionPolicyKind::default(), DistributionPolicyKind::MaxMinFairness);
    let supplies = kind.build().distribute_supply(&[3.0, 9.0], 10.0);
    assert_eq!(supplies, vec![2.5, 7.5]);
}
