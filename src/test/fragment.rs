use crate::error::FlowError;
use crate::flow::ResourceType;
use crate::sim::SimTime;
use crate::workload::TraceFragment;
use std::collections::BTreeMap;

#[test]
fn fixed_fragment_reports_cpu_and_gpu() {
    let f = TraceFragment::new(SimTime(100), 2.5, 1.0, 4096);
    assert_eq!(f.duration(), SimTime(100));
    assert_eq!(f.resource_usage(ResourceType::Cpu), Ok(2.5));
    assert_eq!(f.resource_usage(ResourceType::Gpu), Ok(1.0));
    assert_eq!(f.gpu_memory_usage(), 4096);
}

#[test]
fn fixed_fragment_rejects_unrecorded_resource() {
    let f = TraceFragment::cpu_only(SimTime(100), 2.5);
    assert_eq!(
        f.resource_usage(ResourceType::Memory),
        Err(FlowError::UnsupportedResource(ResourceType::Memory))
    );
}

#[test]
fn mapped_fragment_only_knows_its_keys() {
    let usage = BTreeMap::from([(ResourceType::Gpu, 3.0), (ResourceType::Memory, 8.0)]);
    let f = TraceFragment::from_usage(SimTime(10), usage);
    assert_eq!(f.resource_usage(ResourceType::Memory), Ok(8.0));
    assert_eq!(
        f.resource_usage(ResourceType::Cpu),
        Err(FlowError::UnsupportedResource(ResourceType::Cpu))
    );
    assert_eq!(f.cpu_usage(), 0.0);
    assert_eq!(f.gpu_usage(), 3.0);
    assert_eq!(f.gpu_memory_usage(), 0);
}

#[test]
fn with_duration_keeps_usage() {
    let f = TraceFragment::new(SimTime(100), 2.5, 1.0, 7);
    let g = f.with_duration(SimTime(40));
    assert_eq!(g.duration(), SimTime(40));
    assert_eq!(g.cpu_usage(), 2.5);
    assert_eq!(g.gpu_memory_usage(), 7);
    assert_eq!(f.duration(), SimTime(100));
}
