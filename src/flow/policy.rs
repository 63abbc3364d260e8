//! 分配策略（Distribution policies）
//!
//! 在供给不足时把可用供给分摊给各个消费方。策略是纯函数：相同输入总是得到相同输出，
//! 且 `supplies[i]` 对应 `demands[i]`。

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// 分配策略抽象
pub trait DistributionPolicy: Debug + Send {
    /// 返回与 `demands` 等长的非负供给序列，总和不超过 `available`。
    fn distribute_supply(&self, demands: &[f64], available: f64) -> Vec<f64>;
}

/// 最大-最小公平（注水法）
///
/// 按需求升序处理：需求不超过“剩余供给 / 尚未满足的消费方数量”的消费方得到全部需求，
/// 其余消费方平分剩下的供给。
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMinFairnessPolicy;

impl DistributionPolicy for MaxMinFairnessPolicy {
    fn distribute_supply(&self, demands: &[f64], available: f64) -> Vec<f64> {
        let n = demands.len();
        let mut supplies = vec![0.0; n];
        if n == 0 {
            return supplies;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| demands[a].total_cmp(&demands[b]).then(a.cmp(&b)));

        let mut remaining = available.max(0.0);
        for (k, &idx) in order.iter().enumerate() {
            let fair_share = remaining / (n - k) as f64;
            let given = demands[idx].max(0.0).min(fair_share);
            supplies[idx] = given;
            remaining = (remaining - given).max(0.0);
        }
        supplies
    }
}

/// 按需求比例切分：过载时每个消费方得到 `demand * available / total_demand`，
/// 可用供给全部分完。
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalSharePolicy;

impl DistributionPolicy for ProportionalSharePolicy {
    fn distribute_supply(&self, demands: &[f64], available: f64) -> Vec<f64> {
        let available = available.max(0.0);
        let total: f64 = demands.iter().map(|d| d.max(0.0)).sum();
        if total <= available {
            return demands.iter().map(|d| d.max(0.0)).collect();
        }
        demands
            .iter()
            .map(|d| d.max(0.0) * available / total)
            .collect()
    }
}

/// 可配置的策略种类
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPolicyKind {
    #[default]
    MaxMinFairness,
    ProportionalShare,
}

impl DistributionPolicyKind {
    pub fn build(self) -> Box<dyn DistributionPolicy> {
        match self {
            DistributionPolicyKind::MaxMinFairness => Box::new(MaxMinFairnessPolicy),
            DistributionPolicyKind::ProportionalShare => Box::new(ProportionalSharePolicy),
        }
    }
}
