//! 流边
//!
//! 一条有向、带类型的通道：恰好一个供给方、一个消费方，承载需求值和供给值。
//! 边由引擎持有，两端只持有 [`EdgeId`]；字段只能经由引擎的推送接口修改。

use super::id::{EdgeId, NodeId};
use super::resource::ResourceType;

#[derive(Debug, Clone)]
pub struct FlowEdge {
    id: EdgeId,
    supplier: NodeId,
    consumer: NodeId,
    /// 在供给方（分发器）并行数组中的位置；未注册时为 None
    consumer_index: Option<usize>,
    resource: ResourceType,
    capacity: f64,
    demand: f64,
    supply: f64,
    pub(crate) detaching: bool,
}

impl FlowEdge {
    pub(crate) fn new(
        id: EdgeId,
        consumer: NodeId,
        supplier: NodeId,
        resource: ResourceType,
        capacity: f64,
    ) -> Self {
        Self {
            id,
            supplier,
            consumer,
            consumer_index: None,
            resource,
            capacity,
            demand: 0.0,
            supply: 0.0,
            detaching: false,
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn supplier(&self) -> NodeId {
        self.supplier
    }

    pub fn consumer(&self) -> NodeId {
        self.consumer
    }

    pub fn consumer_index(&self) -> Option<usize> {
        self.consumer_index
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn supply(&self) -> f64 {
        self.supply
    }

    pub(crate) fn set_consumer_index(&mut self, idx: Option<usize>) {
        self.consumer_index = idx;
    }

    /// 写入新需求；返回值表示是否真的发生了变化。
    pub(crate) fn store_demand(&mut self, demand: f64) -> bool {
        if self.demand == demand {
            return false;
        }
        self.demand = demand;
        true
    }

    /// 写入新供给；返回值表示是否真的发生了变化。
    pub(crate) fn store_supply(&mut self, supply: f64) -> bool {
        if self.supply == supply {
            return false;
        }
        self.supply = supply;
        true
    }
}
