//! 负载模块
//!
//! 轨迹片段、轨迹负载、伸缩策略，以及在流图上回放轨迹的运行时消费方节点。

mod fragment;
mod scaling;
mod sim_trace;
mod task;
mod trace;

pub use fragment::TraceFragment;
pub use scaling::{NoDelayScaling, PerfectScaling, ScalingPolicy, ScalingPolicyKind};
pub use sim_trace::{SimTraceWorkload, WorkloadState};
pub use task::{TaskDriver, TaskOutcome};
pub use trace::{CheckpointConfig, TraceWorkload, TraceWorkloadBuilder};

use crate::error::FlowError;
use crate::flow::NodeId;
use crate::sim::{FlowEngine, SimTime};

/// 负载结束（完成或失败）时的回调：结束时间、错误（正常完成为 None）、引擎。
pub type CompletionCallback = Box<dyn FnOnce(SimTime, Option<FlowError>, &mut FlowEngine) + Send>;

/// 负载工厂契约：由外部调度器/任务运行时调用。
pub trait Workload {
    fn checkpoint_interval(&self) -> SimTime;

    fn checkpoint_duration(&self) -> SimTime;

    fn checkpoint_interval_scaling(&self) -> f64;

    /// 在 `supplier` 上启动负载，返回运行时消费方节点
    fn start_workload(&self, engine: &mut FlowEngine, supplier: NodeId) -> Result<NodeId, FlowError>;

    /// 从多个候选供给方中挑选一个启动，结束时调用 `completion`
    fn start_workload_with(
        &self,
        engine: &mut FlowEngine,
        suppliers: &[NodeId],
        completion: CompletionCallback,
    ) -> Result<NodeId, FlowError>;
}
