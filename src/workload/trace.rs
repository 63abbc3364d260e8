//! 轨迹负载
//!
//! 一个任务的有序片段序列及其检查点元数据。片段列表是唯一的权威表示；
//! 游标 `fragment_index` 直接指向该列表。

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use super::fragment::TraceFragment;
use super::scaling::{NoDelayScaling, ScalingPolicy};
use super::sim_trace::SimTraceWorkload;
use super::{CompletionCallback, Workload};
use crate::error::FlowError;
use crate::flow::{NodeId, ResourceType};
use crate::sim::{FlowEngine, SimTime};
use crate::util::ResizeableDoubleArray;
use tracing::{debug, info};

/// 检查点元数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointConfig {
    /// 两次检查点之间的间隔；为 0 表示不做周期检查点
    pub interval: SimTime,
    /// 一次检查点的耗时
    pub duration: SimTime,
    /// 每次检查点后间隔乘以该系数
    pub interval_scaling: f64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: SimTime::ZERO,
            duration: SimTime::ZERO,
            interval_scaling: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceWorkload {
    task_id: u64,
    checkpoint: CheckpointConfig,
    scaling_policy: Arc<dyn ScalingPolicy>,
    resource_types: BTreeSet<ResourceType>,
    fragments: VecDeque<TraceFragment>,
    fragment_index: usize,
    max_demand: BTreeMap<ResourceType, f64>,
    max_gpu_memory_demand: u64,
}

impl TraceWorkload {
    /// 直接由片段构造；出现过严格正用量的资源类型被视为“存在”。
    pub fn new(
        task_id: u64,
        fragments: Vec<TraceFragment>,
        checkpoint: CheckpointConfig,
        scaling_policy: Arc<dyn ScalingPolicy>,
    ) -> Self {
        let resource_types = ResourceType::ALL
            .into_iter()
            .filter(|&r| {
                fragments
                    .iter()
                    .any(|f| f.resource_usage(r).is_ok_and(|u| u > 0.0))
            })
            .collect();
        Self::with_resource_types(task_id, fragments, checkpoint, scaling_policy, resource_types)
    }

    fn with_resource_types(
        task_id: u64,
        fragments: Vec<TraceFragment>,
        checkpoint: CheckpointConfig,
        scaling_policy: Arc<dyn ScalingPolicy>,
        resource_types: BTreeSet<ResourceType>,
    ) -> Self {
        let max_demand = ResourceType::ALL
            .into_iter()
            .map(|r| {
                let max = fragments
                    .iter()
                    .filter_map(|f| f.resource_usage(r).ok())
                    .fold(0.0_f64, f64::max);
                (r, max)
            })
            .collect();
        let max_gpu_memory_demand = fragments
            .iter()
            .map(TraceFragment::gpu_memory_usage)
            .max()
            .unwrap_or(0);

        Self {
            task_id,
            checkpoint,
            scaling_policy,
            resource_types,
            fragments: fragments.into(),
            fragment_index: 0,
            max_demand,
            max_gpu_memory_demand,
        }
    }

    pub fn builder(
        task_id: u64,
        checkpoint: CheckpointConfig,
        scaling_policy: Arc<dyn ScalingPolicy>,
    ) -> TraceWorkloadBuilder {
        TraceWorkloadBuilder::new(task_id, checkpoint, scaling_policy)
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn checkpoint(&self) -> CheckpointConfig {
        self.checkpoint
    }

    pub fn scaling_policy(&self) -> Arc<dyn ScalingPolicy> {
        Arc::clone(&self.scaling_policy)
    }

    pub fn resource_types(&self) -> &BTreeSet<ResourceType> {
        &self.resource_types
    }

    pub fn fragments(&self) -> &VecDeque<TraceFragment> {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn total_duration(&self) -> SimTime {
        self.fragments
            .iter()
            .fold(SimTime::ZERO, |acc, f| acc.saturating_add(f.duration()))
    }

    /// 各资源在构造时的最大需求
    pub fn max_demand(&self, resource: ResourceType) -> f64 {
        self.max_demand.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn max_gpu_memory_demand(&self) -> u64 {
        self.max_gpu_memory_demand
    }

    pub fn fragment_index(&self) -> usize {
        self.fragment_index
    }

    pub fn is_completed(&self) -> bool {
        self.fragment_index >= self.fragments.len()
    }

    /// 返回游标处的片段并前移游标；游标越界时报错。
    pub fn get_next_fragment(&mut self) -> Result<TraceFragment, FlowError> {
        let fragment = self
            .fragments
            .get(self.fragment_index)
            .cloned()
            .ok_or(FlowError::TraceExhausted {
                len: self.fragments.len(),
            })?;
        self.fragment_index += 1;
        Ok(fragment)
    }

    /// 丢弃前 `n` 个片段；`n == 0` 时什么也不做。游标随之前移，保持指向同一个片段。
    pub fn remove_fragments(&mut self, n: usize) -> Result<(), FlowError> {
        if n == 0 {
            return Ok(());
        }
        if n > self.fragments.len() {
            return Err(FlowError::IndexOutOfRange {
                index: n,
                len: self.fragments.len(),
            });
        }
        self.fragments.drain(..n);
        self.fragment_index = self.fragment_index.saturating_sub(n);
        debug!(task_id = self.task_id, removed = n, remaining = self.fragments.len(), "裁剪轨迹前缀");
        Ok(())
    }

    /// 在最前面插入片段。尚未消费任何片段时，新片段就是下一个片段。
    pub fn add_first(&mut self, fragment: TraceFragment) {
        self.fragments.push_front(fragment);
        if self.fragment_index > 0 {
            self.fragment_index += 1;
        }
    }

    /// 在 `suppliers` 里挑选第一个提供本轨迹所需资源的供给方
    fn choose_supplier(
        &self,
        engine: &mut FlowEngine,
        suppliers: &[NodeId],
    ) -> Result<NodeId, FlowError> {
        if self.resource_types.is_empty() {
            return suppliers.first().copied().ok_or(FlowError::NoMatchingSupplier);
        }
        for &s in suppliers {
            if self.resource_types.contains(&engine.supplier_resource(s)?) {
                return Ok(s);
            }
        }
        Err(FlowError::NoMatchingSupplier)
    }

    fn launch(
        &self,
        engine: &mut FlowEngine,
        supplier: NodeId,
        completion: Option<CompletionCallback>,
    ) -> Result<NodeId, FlowError> {
        let resource = engine.supplier_resource(supplier)?;
        for f in &self.fragments {
            f.resource_usage(resource)?;
        }

        let now = engine.now();
        let id = engine.add_node(|id| SimTraceWorkload::new(id, self, resource, completion, now));
        if let Err(e) = engine.connect(id, supplier) {
            engine.close_node(id);
            return Err(e);
        }
        engine.with_node(id, |w: &mut SimTraceWorkload, eng| w.start(eng))?;
        info!(task_id = self.task_id, node = ?id, ?supplier, %resource, "🚀 启动轨迹负载");
        Ok(id)
    }
}

impl Workload for TraceWorkload {
    fn checkpoint_interval(&self) -> SimTime {
        self.checkpoint.interval
    }

    fn checkpoint_duration(&self) -> SimTime {
        self.checkpoint.duration
    }

    fn checkpoint_interval_scaling(&self) -> f64 {
        self.checkpoint.interval_scaling
    }

    fn start_workload(&self, engine: &mut FlowEngine, supplier: NodeId) -> Result<NodeId, FlowError> {
        self.launch(engine, supplier, None)
    }

    fn start_workload_with(
        &self,
        engine: &mut FlowEngine,
        suppliers: &[NodeId],
        completion: CompletionCallback,
    ) -> Result<NodeId, FlowError> {
        let supplier = self.choose_supplier(engine, suppliers)?;
        self.launch(engine, supplier, Some(completion))
    }
}

/// 轨迹构造器：按列收集采样，`build` 时物化为片段列表。
#[derive(Debug)]
pub struct TraceWorkloadBuilder {
    task_id: u64,
    checkpoint: CheckpointConfig,
    scaling_policy: Arc<dyn ScalingPolicy>,
    durations: Vec<SimTime>,
    cpu_usages: ResizeableDoubleArray,
    gpu_usages: ResizeableDoubleArray,
    gpu_memory_usages: Vec<u64>,
    resource_types: BTreeSet<ResourceType>,
}

impl TraceWorkloadBuilder {
    fn new(task_id: u64, checkpoint: CheckpointConfig, scaling_policy: Arc<dyn ScalingPolicy>) -> Self {
        Self {
            task_id,
            checkpoint,
            scaling_policy,
            durations: Vec::new(),
            cpu_usages: ResizeableDoubleArray::new(),
            gpu_usages: ResizeableDoubleArray::new(),
            gpu_memory_usages: Vec::new(),
            resource_types: BTreeSet::new(),
        }
    }

    /// 追加一个片段的采样
    pub fn add(&mut self, duration: SimTime, cpu_usage: f64, gpu_usage: f64, gpu_memory_usage: u64) {
        if cpu_usage > 0.0 {
            self.resource_types.insert(ResourceType::Cpu);
        }
        if gpu_usage > 0.0 {
            self.resource_types.insert(ResourceType::Gpu);
        }
        self.durations.push(duration);
        self.cpu_usages.add(cpu_usage);
        self.gpu_usages.add(gpu_usage);
        self.gpu_memory_usages.push(gpu_memory_usage);
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn build(self) -> TraceWorkload {
        let fragments = self
            .durations
            .iter()
            .zip(self.cpu_usages.iter())
            .zip(self.gpu_usages.iter())
            .zip(&self.gpu_memory_usages)
            .map(|(((&d, cpu), gpu), &mem)| TraceFragment::new(d, cpu, gpu, mem))
            .collect();
        TraceWorkload::with_resource_types(
            self.task_id,
            fragments,
            self.checkpoint,
            self.scaling_policy,
            self.resource_types,
        )
    }
}

impl Default for TraceWorkloadBuilder {
    fn default() -> Self {
        Self::new(0, CheckpointConfig::default(), Arc::new(NoDelayScaling))
    }
}
