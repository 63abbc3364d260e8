//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换。一个 tick 即一个仿真毫秒。

use serde::{Deserialize, Serialize};

/// 仿真时间（毫秒 tick）。既表示时刻，也表示时长。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    /// “没有待办工作”的截止时间
    pub const INFINITY: SimTime = SimTime(u64::MAX);

    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms)
    }

    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000))
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self == SimTime::INFINITY
    }

    pub fn saturating_add(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(other.0))
    }
}
