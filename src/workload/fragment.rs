//! 轨迹片段
//!
//! 一段不可变的时间切片：持续时间加上各资源的用量。

use std::collections::BTreeMap;

use crate::error::FlowError;
use crate::flow::ResourceType;
use crate::sim::SimTime;

#[derive(Debug, Clone, PartialEq)]
enum FragmentUsage {
    /// 固定的 (cpu, gpu, gpu 显存) 三元组
    Fixed { cpu: f64, gpu: f64, gpu_memory: u64 },
    /// 按资源类型记录的用量
    Mapped(BTreeMap<ResourceType, f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceFragment {
    duration: SimTime,
    usage: FragmentUsage,
}

impl TraceFragment {
    pub fn new(duration: SimTime, cpu_usage: f64, gpu_usage: f64, gpu_memory_usage: u64) -> Self {
        Self {
            duration,
            usage: FragmentUsage::Fixed {
                cpu: cpu_usage,
                gpu: gpu_usage,
                gpu_memory: gpu_memory_usage,
            },
        }
    }

    pub fn cpu_only(duration: SimTime, cpu_usage: f64) -> Self {
        Self::new(duration, cpu_usage, 0.0, 0)
    }

    pub fn from_usage(duration: SimTime, usage: BTreeMap<ResourceType, f64>) -> Self {
        Self {
            duration,
            usage: FragmentUsage::Mapped(usage),
        }
    }

    pub fn duration(&self) -> SimTime {
        self.duration
    }

    /// 未记录 CPU 的按类型片段返回 0
    pub fn cpu_usage(&self) -> f64 {
        self.resource_usage(ResourceType::Cpu).unwrap_or(0.0)
    }

    pub fn gpu_usage(&self) -> f64 {
        self.resource_usage(ResourceType::Gpu).unwrap_or(0.0)
    }

    pub fn gpu_memory_usage(&self) -> u64 {
        match self.usage {
            FragmentUsage::Fixed { gpu_memory, .. } => gpu_memory,
            FragmentUsage::Mapped(_) => 0,
        }
    }

    /// 查询某类资源的用量；片段没有记录该资源时报错。
    pub fn resource_usage(&self, resource: ResourceType) -> Result<f64, FlowError> {
        match &self.usage {
            FragmentUsage::Fixed { cpu, gpu, .. } => match resource {
                ResourceType::Cpu => Ok(*cpu),
                ResourceType::Gpu => Ok(*gpu),
                ResourceType::Memory => Err(FlowError::UnsupportedResource(resource)),
            },
            FragmentUsage::Mapped(map) => map
                .get(&resource)
                .copied()
                .ok_or(FlowError::UnsupportedResource(resource)),
        }
    }

    /// 用量相同、时长不同的新片段
    pub fn with_duration(&self, duration: SimTime) -> Self {
        Self {
            duration,
            usage: self.usage.clone(),
        }
    }
}
