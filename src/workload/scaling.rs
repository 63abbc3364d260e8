//! 伸缩策略（Scaling policies）
//!
//! 描述供给不足如何影响负载进度：把 (需求, 供给, 经过时间) 换算成完成的工作量与剩余时长。

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use crate::sim::SimTime;

pub trait ScalingPolicy: Debug + Send + Sync {
    /// 以需求速率运行 `duration` 所需的工作量
    fn remaining_work(&self, demand: f64, duration: SimTime) -> f64;

    /// 在 `elapsed` 时间内以 `supply` 完成的工作量
    fn finished_work(&self, demand: f64, supply: f64, elapsed: SimTime) -> f64;

    /// 以 `supply` 完成 `remaining_work` 还需要的时长；供给为 0 时返回无穷
    fn remaining_duration(&self, demand: f64, supply: f64, remaining_work: f64) -> SimTime;
}

fn ceil_ticks(x: f64) -> SimTime {
    if !x.is_finite() || x >= u64::MAX as f64 {
        return SimTime::INFINITY;
    }
    SimTime(x.max(0.0).ceil() as u64)
}

/// 需求与供给按速率互换：工作量以名义 tick 计，满供给时正好按名义时长完成，
/// 欠供给时按 需求/供给 比例拉长。需求为 0 的片段按名义速度推进。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelayScaling;

impl ScalingPolicy for NoDelayScaling {
    fn remaining_work(&self, _demand: f64, duration: SimTime) -> f64 {
        duration.0 as f64
    }

    fn finished_work(&self, demand: f64, supply: f64, elapsed: SimTime) -> f64 {
        let elapsed = elapsed.0 as f64;
        if demand <= 0.0 {
            return elapsed;
        }
        // 先乘后除，整除场景下没有舍入误差
        elapsed * supply.clamp(0.0, demand) / demand
    }

    fn remaining_duration(&self, demand: f64, supply: f64, remaining_work: f64) -> SimTime {
        if remaining_work <= 0.0 {
            return SimTime::ZERO;
        }
        if demand <= 0.0 {
            return ceil_ticks(remaining_work);
        }
        if supply <= 0.0 {
            return SimTime::INFINITY;
        }
        ceil_ticks(remaining_work * demand / supply.min(demand))
    }
}

/// 工作量 = 需求 × 时长，进度 = 供给 × 经过时间。
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfectScaling;

impl ScalingPolicy for PerfectScaling {
    fn remaining_work(&self, demand: f64, duration: SimTime) -> f64 {
        demand.max(0.0) * duration.0 as f64
    }

    fn finished_work(&self, demand: f64, supply: f64, elapsed: SimTime) -> f64 {
        supply.clamp(0.0, demand.max(0.0)) * elapsed.0 as f64
    }

    fn remaining_duration(&self, demand: f64, supply: f64, remaining_work: f64) -> SimTime {
        if remaining_work <= 0.0 {
            return SimTime::ZERO;
        }
        let rate = supply.min(demand);
        if rate <= 0.0 {
            return SimTime::INFINITY;
        }
        ceil_ticks(remaining_work / rate)
    }
}

/// 可配置的伸缩策略种类
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicyKind {
    #[default]
    NoDelay,
    Perfect,
}

impl ScalingPolicyKind {
    pub fn build(self) -> Arc<dyn ScalingPolicy> {
        match self {
            ScalingPolicyKind::NoDelay => Arc::new(NoDelayScaling),
            ScalingPolicyKind::Perfect => Arc::new(PerfectScaling),
        }
    }
}
