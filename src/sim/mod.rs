//! 仿真核心模块
//!
//! 此模块包含流图仿真的核心组件，如仿真时间、引擎、统计以及场景运行器。

// 子模块声明
mod engine;
mod runner;
mod scenario;
mod scheduled_event;
mod stats;
mod time;

// 重新导出公共接口
pub use engine::FlowEngine;
pub use runner::{ScenarioReport, run_scenario};
pub use scenario::{
    CheckpointSpec, FragmentSpec, HostSpec, SCENARIO_SCHEMA_VERSION, ScenarioError, ScenarioMeta,
    ScenarioSpec, TaskSpec,
};
pub use scheduled_event::ScheduledUpdate;
pub use stats::FlowStats;
pub use time::SimTime;
