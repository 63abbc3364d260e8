//! 调度的节点更新
//!
//! 定义节点截止时间条目及其优先级比较。

use super::time::SimTime;
use crate::flow::NodeId;
use std::cmp::Reverse;

/// 一条定时更新：在 `at` 时刻重新激活 `node`。
///
/// `BinaryHeap` 是 max-heap，排序键取 `Reverse((at, seq))`：时间早的先出，
/// 同一时刻按登记顺序出队。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduledUpdate {
    key: Reverse<(SimTime, u64)>,
    pub(crate) node: NodeId,
}

impl ScheduledUpdate {
    pub(crate) fn new(at: SimTime, seq: u64, node: NodeId) -> Self {
        Self {
            key: Reverse((at, seq)),
            node,
        }
    }

    pub fn at(&self) -> SimTime {
        self.key.0.0
    }

    pub fn seq(&self) -> u64 {
        self.key.0.1
    }
}
