//! 轨迹回放节点
//!
//! 运行时消费方：逐个取出片段，把片段的资源用量作为需求推给上游，
//! 按收到的供给推进剩余工作量，并据此计算下一个截止时间。
//! 支持在片段中途做检查点快照，随后无缝恢复。

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use super::CompletionCallback;
use super::fragment::TraceFragment;
use super::scaling::ScalingPolicy;
use super::trace::TraceWorkload;
use crate::error::FlowError;
use crate::flow::{EdgeId, FlowConsumer, FlowNode, NodeId, ResourceType};
use crate::sim::{FlowEngine, SimTime};
use tracing::{debug, info, trace};

/// 剩余工作量不超过该值即视为片段完成
const WORK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    Running,
    /// 终态：片段与边均已释放
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentOrigin {
    Trace,
    /// 快照时插入的检查点片段，不对应轨迹中的任何片段
    Checkpoint,
}

pub struct SimTraceWorkload {
    id: NodeId,
    name: String,
    task_id: u64,
    resource: ResourceType,
    state: WorkloadState,

    remaining_fragments: VecDeque<(TraceFragment, FragmentOrigin)>,
    current_fragment: Option<(TraceFragment, FragmentOrigin)>,
    /// 已开始的轨迹片段数（含当前片段，不含检查点片段）
    fragment_index: usize,
    start_of_fragment: SimTime,

    supplier_edge: Option<EdgeId>,
    demand: f64,
    supply: f64,
    /// 当前片段在需求速率下剩余的工作量
    remaining_work: f64,

    checkpoint_duration: SimTime,
    scaling: Arc<dyn ScalingPolicy>,
    completion: Option<CompletionCallback>,

    started_at: SimTime,
    finished_at: Option<SimTime>,
    checkpoints: u32,
}

impl SimTraceWorkload {
    pub(crate) fn new(
        id: NodeId,
        trace: &TraceWorkload,
        resource: ResourceType,
        completion: Option<CompletionCallback>,
        now: SimTime,
    ) -> Self {
        Self {
            id,
            name: format!("trace-{}", trace.task_id()),
            task_id: trace.task_id(),
            resource,
            state: WorkloadState::Running,
            remaining_fragments: trace
                .fragments()
                .iter()
                .map(|f| (f.clone(), FragmentOrigin::Trace))
                .collect(),
            current_fragment: None,
            fragment_index: 0,
            start_of_fragment: now,
            supplier_edge: None,
            demand: 0.0,
            supply: 0.0,
            remaining_work: 0.0,
            checkpoint_duration: trace.checkpoint().duration,
            scaling: trace.scaling_policy(),
            completion,
            started_at: now,
            finished_at: None,
            checkpoints: 0,
        }
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn state(&self) -> WorkloadState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == WorkloadState::Running
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn supply(&self) -> f64 {
        self.supply
    }

    pub fn remaining_work(&self) -> f64 {
        self.remaining_work
    }

    pub fn fragment_index(&self) -> usize {
        self.fragment_index
    }

    pub fn start_of_fragment(&self) -> SimTime {
        self.start_of_fragment
    }

    pub fn supplier_edge(&self) -> Option<EdgeId> {
        self.supplier_edge
    }

    pub fn current_fragment(&self) -> Option<&TraceFragment> {
        self.current_fragment.as_ref().map(|(f, _)| f)
    }

    pub fn remaining_fragments(&self) -> impl Iterator<Item = &TraceFragment> {
        self.remaining_fragments.iter().map(|(f, _)| f)
    }

    /// 当前片段是否为检查点片段
    pub fn is_checkpointing(&self) -> bool {
        matches!(self.current_fragment, Some((_, FragmentOrigin::Checkpoint)))
    }

    pub fn started_at(&self) -> SimTime {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<SimTime> {
        self.finished_at
    }

    pub fn checkpoints(&self) -> u32 {
        self.checkpoints
    }

    /// 启动：取出第一个片段并推送其需求
    pub(crate) fn start(&mut self, engine: &mut FlowEngine) {
        let now = engine.now();
        if self.start_next_fragment(engine) {
            self.start_of_fragment = now;
            engine.invalidate(self.id);
        }
    }

    /// 片段在本负载资源上的需求；启动时已校验所有片段都记录了该资源
    fn demand_of(&self, fragment: &TraceFragment) -> f64 {
        fragment.resource_usage(self.resource).unwrap_or(0.0)
    }

    fn start_next_fragment(&mut self, engine: &mut FlowEngine) -> bool {
        let Some((fragment, origin)) = self.remaining_fragments.pop_front() else {
            self.stop(engine, None);
            return false;
        };
        if origin == FragmentOrigin::Trace {
            self.fragment_index += 1;
        }

        let demand = self.demand_of(&fragment);
        self.remaining_work = self.scaling.remaining_work(demand, fragment.duration());
        trace!(
            node = %self.name,
            fragment_index = self.fragment_index,
            duration = ?fragment.duration(),
            demand,
            "▶️  开始新片段"
        );
        self.current_fragment = Some((fragment, origin));
        self.push_demand(demand, engine);
        true
    }

    /// 更新本地需求并推送到上游边；取值未变化时什么也不做
    fn push_demand(&mut self, demand: f64, engine: &mut FlowEngine) {
        if demand == self.demand {
            return;
        }
        self.demand = demand;
        if let Some(edge) = self.supplier_edge {
            engine.push_demand(edge, demand);
        }
    }

    /// 按上次更新以来的 (需求, 供给) 结算已完成的工作量
    fn advance_progress(&mut self, now: SimTime) {
        let passed = now.saturating_sub(self.start_of_fragment);
        self.start_of_fragment = now;
        let finished = self.scaling.finished_work(self.demand, self.supply, passed);
        self.remaining_work -= finished;
    }

    /// 主动结束负载（正常停止，回调不带错误）
    pub fn stop_workload(&mut self, engine: &mut FlowEngine) {
        self.stop(engine, None);
    }

    fn stop(&mut self, engine: &mut FlowEngine, error: Option<FlowError>) {
        if self.state == WorkloadState::Stopped {
            return;
        }
        let now = engine.now();
        self.state = WorkloadState::Stopped;
        self.finished_at = Some(now);
        self.supplier_edge = None;
        self.remaining_fragments.clear();
        self.current_fragment = None;
        self.remaining_work = 0.0;

        match &error {
            None => info!(node = %self.name, ?now, "🏁 轨迹负载完成"),
            Some(e) => info!(node = %self.name, ?now, error = %e, "轨迹负载中断"),
        }

        engine.close_node(self.id);
        if let Some(completion) = self.completion.take() {
            completion(now, error, engine);
        }
    }

    /// 在片段中途做检查点快照。
    ///
    /// 当前片段被切成“剩余部分”，`trace` 丢弃已开始的片段并以剩余部分开头；
    /// 运行队列前面依次插入检查点片段与剩余部分，随后立即开始检查点片段。
    /// 剩余部分的时长按剩余工作量在满供给下折算，欠供给时比 `duration - elapsed` 更长。
    /// 当前片段的工作已经做完时返回 [`FlowError::SnapshotAtFragmentEnd`]。
    pub fn make_snapshot(
        &mut self,
        now: SimTime,
        trace: &mut TraceWorkload,
        engine: &mut FlowEngine,
    ) -> Result<(), FlowError> {
        let Some((current, origin)) = self.current_fragment.clone() else {
            return Err(FlowError::WorkloadStopped(self.id));
        };
        if origin == FragmentOrigin::Checkpoint {
            return Err(FlowError::SnapshotDuringCheckpoint(self.id));
        }

        self.advance_progress(now);
        // 片段恰好在此刻做完：没有可切分的剩余部分，交给 on_update 进入下一片段
        if self.remaining_work <= WORK_EPSILON {
            engine.invalidate(self.id);
            return Err(FlowError::SnapshotAtFragmentEnd(self.id));
        }
        let remaining_time =
            self.scaling
                .remaining_duration(self.demand, self.demand, self.remaining_work);
        let remainder = current.with_duration(remaining_time);

        trace.remove_fragments(self.fragment_index)?;
        trace.add_first(remainder.clone());

        let checkpoint = current.with_duration(self.checkpoint_duration);
        self.remaining_fragments
            .push_front((remainder, FragmentOrigin::Trace));
        self.remaining_fragments
            .push_front((checkpoint, FragmentOrigin::Checkpoint));
        self.fragment_index = 0;
        self.checkpoints += 1;

        debug!(
            node = %self.name,
            ?now,
            ?remaining_time,
            checkpoint_duration = ?self.checkpoint_duration,
            "📸 创建快照"
        );

        self.start_next_fragment(engine);
        self.start_of_fragment = now;
        engine.invalidate(self.id);
        Ok(())
    }
}

impl FlowNode for SimTraceWorkload {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&mut self, now: SimTime, engine: &mut FlowEngine) -> SimTime {
        if self.state == WorkloadState::Stopped {
            return SimTime::INFINITY;
        }

        self.advance_progress(now);

        if self.remaining_work <= WORK_EPSILON && !self.start_next_fragment(engine) {
            return SimTime::INFINITY;
        }

        // 停滞：直到供给恢复之前没有截止时间
        if self.supply <= 0.0 && self.demand > 0.0 {
            return SimTime::INFINITY;
        }

        let remaining = self.scaling.remaining_duration(
            self.demand,
            self.supply,
            self.remaining_work.max(0.0),
        );
        now.saturating_add(remaining)
    }

    fn as_consumer(&mut self) -> Option<&mut dyn FlowConsumer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl FlowConsumer for SimTraceWorkload {
    fn consumer_resource_type(&self) -> ResourceType {
        self.resource
    }

    fn can_accept_supplier(&self) -> bool {
        self.supplier_edge.is_none() && self.state == WorkloadState::Running
    }

    fn add_supplier_edge(&mut self, edge: EdgeId, _engine: &mut FlowEngine) {
        self.supplier_edge = Some(edge);
    }

    fn remove_supplier_edge(&mut self, _edge: EdgeId, engine: &mut FlowEngine) {
        if self.supplier_edge.is_none() {
            return;
        }
        let error = self
            .current_fragment
            .is_some()
            .then_some(FlowError::WorkloadInterrupted(self.id));
        self.stop(engine, error);
    }

    /// 供给变化：先按旧供给结算进度，再记录新供给并请求重新调度
    fn handle_incoming_supply(&mut self, _edge: EdgeId, supply: f64, engine: &mut FlowEngine) {
        if supply == self.supply {
            return;
        }
        self.advance_progress(engine.now());
        self.supply = supply;
        engine.invalidate(self.id);
    }
}
