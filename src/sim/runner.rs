//! 场景运行器
//!
//! 按场景描述搭建流图：每个主机一个资源源头 + 一个分发器，每个任务一个任务驱动节点，
//! 然后运行引擎并汇总结果。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::scenario::{ScenarioError, ScenarioSpec};
use super::{FlowEngine, FlowStats, SimTime};
use crate::flow::{FlowDistributor, FlowSource, NodeId};
use crate::workload::{TaskDriver, TaskOutcome};
use tracing::info;

/// 场景运行结果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub final_time_ms: u64,
    pub tasks: Vec<TaskOutcome>,
    pub stats: FlowStats,
}

impl ScenarioReport {
    pub fn task(&self, task_id: u64) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }
}

/// 运行场景；`until` 为 None 时一直运行到没有待办工作。
#[tracing::instrument(skip(spec), fields(hosts = spec.hosts.len(), tasks = spec.tasks.len()))]
pub fn run_scenario(spec: &ScenarioSpec, until: Option<SimTime>) -> Result<ScenarioReport, ScenarioError> {
    spec.validate()?;
    let mut engine = FlowEngine::new();

    let mut hosts: HashMap<usize, NodeId> = HashMap::new();
    for h in &spec.hosts {
        let name = h.display_name();
        let source = engine.add_node(|id| FlowSource::new(id, format!("{name}/source"), h.resource, h.capacity));
        let policy = h.policy.unwrap_or_default();
        let mux = engine.add_node(|id| {
            FlowDistributor::with_policy(id, format!("{name}/mux"), h.resource, policy.build())
        });
        engine.connect(mux, source)?;
        hosts.insert(h.id, mux);
    }

    let mut outcomes = Vec::with_capacity(spec.tasks.len());
    for t in &spec.tasks {
        let supplier = *hosts.get(&t.host).ok_or(ScenarioError::UnknownHost {
            task: t.id,
            host: t.host,
        })?;
        let outcome = Arc::new(Mutex::new(TaskOutcome {
            task_id: t.id,
            ..TaskOutcome::default()
        }));
        let trace = t.to_trace();
        let submit_at = t.submit_at();
        let shared = Arc::clone(&outcome);
        let driver = engine.add_node(|id| TaskDriver::new(id, trace, vec![supplier], submit_at, shared));
        engine.invalidate(driver);
        outcomes.push(outcome);
    }

    match until {
        Some(t) => engine.run_until(t),
        None => engine.run(),
    }

    let tasks = outcomes
        .iter()
        .map(|o| o.lock().unwrap_or_else(|p| p.into_inner()).clone())
        .collect();
    let report = ScenarioReport {
        final_time_ms: engine.now().as_millis(),
        tasks,
        stats: engine.stats.clone(),
    };
    info!(final_time_ms = report.final_time_ms, "场景运行结束");
    Ok(report)
}
