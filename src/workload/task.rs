//! 任务驱动节点
//!
//! 持有一个任务的 [`TraceWorkload`]：在提交时刻启动回放，并按检查点间隔周期性地做快照。
//! 每次检查点后间隔乘以 `interval_scaling`。

use std::any::Any;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::sim_trace::SimTraceWorkload;
use super::trace::TraceWorkload;
use super::{CompletionCallback, Workload};
use crate::error::FlowError;
use crate::flow::{FlowNode, NodeId};
use crate::sim::{FlowEngine, SimTime};
use tracing::{debug, warn};

/// 一个任务的运行结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: u64,
    pub started_ms: Option<u64>,
    pub finished_ms: Option<u64>,
    pub checkpoints: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct TaskDriver {
    id: NodeId,
    name: String,
    trace: TraceWorkload,
    suppliers: Vec<NodeId>,
    submit_at: SimTime,
    workload: Option<NodeId>,
    checkpoint_interval: SimTime,
    next_checkpoint: SimTime,
    outcome: Arc<Mutex<TaskOutcome>>,
    done: bool,
}

impl TaskDriver {
    pub fn new(
        id: NodeId,
        trace: TraceWorkload,
        suppliers: Vec<NodeId>,
        submit_at: SimTime,
        outcome: Arc<Mutex<TaskOutcome>>,
    ) -> Self {
        Self {
            id,
            name: format!("task-{}", trace.task_id()),
            checkpoint_interval: trace.checkpoint_interval(),
            trace,
            suppliers,
            submit_at,
            workload: None,
            next_checkpoint: SimTime::INFINITY,
            outcome,
            done: false,
        }
    }

    pub fn trace(&self) -> &TraceWorkload {
        &self.trace
    }

    pub fn workload(&self) -> Option<NodeId> {
        self.workload
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn record(&self, f: impl FnOnce(&mut TaskOutcome)) {
        let mut outcome = self.outcome.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut outcome);
    }

    fn schedule_checkpoint(&mut self, now: SimTime) {
        self.next_checkpoint = if self.checkpoint_interval == SimTime::ZERO {
            SimTime::INFINITY
        } else {
            now.saturating_add(self.checkpoint_interval)
        };
    }

    fn launch(&mut self, now: SimTime, engine: &mut FlowEngine) {
        let outcome = Arc::clone(&self.outcome);
        let driver = self.id;
        let completion: CompletionCallback = Box::new(
            move |at: SimTime, error: Option<FlowError>, eng: &mut FlowEngine| {
                let mut o = outcome.lock().unwrap_or_else(|p| p.into_inner());
                o.finished_ms = Some(at.as_millis());
                o.error = error.map(|e| e.to_string());
                eng.invalidate(driver);
            },
        );

        match self.trace.start_workload_with(engine, &self.suppliers, completion) {
            Ok(workload) => {
                self.workload = Some(workload);
                self.record(|o| o.started_ms = Some(now.as_millis()));
                self.schedule_checkpoint(now);
            }
            Err(e) => {
                warn!(task = %self.name, error = %e, "任务启动失败");
                self.record(|o| o.error = Some(e.to_string()));
                self.done = true;
            }
        }
    }

    fn checkpoint(&mut self, now: SimTime, workload: NodeId, engine: &mut FlowEngine) {
        let trace = &mut self.trace;
        let result = engine
            .with_node(workload, |w: &mut SimTraceWorkload, eng| {
                w.make_snapshot(now, trace, eng)
            })
            .and_then(|r| r);
        match result {
            Ok(()) => self.record(|o| o.checkpoints += 1),
            Err(e) => debug!(task = %self.name, error = %e, "跳过本次检查点"),
        }

        let scaling = self.trace.checkpoint_interval_scaling();
        if scaling.is_finite() && scaling > 0.0 {
            let scaled = (self.checkpoint_interval.0 as f64 * scaling).round().max(1.0);
            self.checkpoint_interval = SimTime(scaled.min(u64::MAX as f64) as u64);
        }
        self.schedule_checkpoint(now);
    }
}

impl FlowNode for TaskDriver {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&mut self, now: SimTime, engine: &mut FlowEngine) -> SimTime {
        if self.done {
            return SimTime::INFINITY;
        }

        let Some(workload) = self.workload else {
            if now < self.submit_at {
                return self.submit_at;
            }
            self.launch(now, engine);
            return if self.done {
                SimTime::INFINITY
            } else {
                self.next_checkpoint
            };
        };

        if engine.is_closed(workload) {
            debug!(task = %self.name, ?now, "任务结束");
            self.done = true;
            // 结果已经写进 outcome，回放节点不再需要
            if let Err(e) = engine.release_node(workload) {
                warn!(task = %self.name, error = %e, "释放回放节点失败");
            }
            return SimTime::INFINITY;
        }

        if now >= self.next_checkpoint {
            self.checkpoint(now, workload, engine);
        }
        self.next_checkpoint
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
