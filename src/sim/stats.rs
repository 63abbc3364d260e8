//! 统计信息
//!
//! 定义流图引擎的运行统计。

use serde::Serialize;

/// 引擎统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct FlowStats {
    /// `on_update` 调用次数
    pub updates: u64,
    pub demand_pushes: u64,
    pub supply_pushes: u64,
    /// 因取值未变化而被抑制的推送
    pub suppressed_pushes: u64,
    /// 来自未注册边的需求推送（被记录并忽略）
    pub ignored_demand_pushes: u64,
}
