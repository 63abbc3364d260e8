//! 流分发器
//!
//! 把 N 条消费方边的需求汇总成一条上游需求，再按分配策略把上游供给分回给各消费方。
//! 分发器同时实现 [`FlowSupplier`]（面向下游）与 [`FlowConsumer`]（面向上游），
//! 两侧的状态分开存放。

use std::any::Any;
use std::collections::BTreeSet;

use super::id::{EdgeId, NodeId};
use super::node::{FlowConsumer, FlowNode, FlowSupplier};
use super::policy::{DistributionPolicy, MaxMinFairnessPolicy};
use super::resource::ResourceType;
use crate::sim::{FlowEngine, SimTime};
use crate::util::ResizeableDoubleArray;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct FlowDistributor {
    id: NodeId,
    name: String,
    resource: ResourceType,
    policy: Box<dyn DistributionPolicy>,

    // 下游：消费方边与按 consumer index 对齐的并行数组
    consumer_edges: Vec<EdgeId>,
    incoming_demands: ResizeableDoubleArray,
    outgoing_supplies: ResizeableDoubleArray,
    /// 始终等于 Σ incoming_demands，增量维护
    total_incoming_demand: f64,
    /// 本周期内需求发生变化的消费方下标
    updated_demands: BTreeSet<usize>,
    overloaded: bool,

    // 上游：唯一的供给方边
    supplier_edge: Option<EdgeId>,
    capacity: f64,
    current_incoming_supply: f64,
    outgoing_demand_update_needed: bool,
}

impl FlowDistributor {
    /// 创建使用最大-最小公平策略的分发器
    pub fn new(id: NodeId, name: impl Into<String>, resource: ResourceType) -> Self {
        Self::with_policy(id, name, resource, Box::new(MaxMinFairnessPolicy))
    }

    pub fn with_policy(
        id: NodeId,
        name: impl Into<String>,
        resource: ResourceType,
        policy: Box<dyn DistributionPolicy>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            resource,
            policy,
            consumer_edges: Vec::new(),
            incoming_demands: ResizeableDoubleArray::new(),
            outgoing_supplies: ResizeableDoubleArray::new(),
            total_incoming_demand: 0.0,
            updated_demands: BTreeSet::new(),
            overloaded: false,
            supplier_edge: None,
            capacity: 0.0,
            current_incoming_supply: 0.0,
            outgoing_demand_update_needed: false,
        }
    }

    pub fn total_incoming_demand(&self) -> f64 {
        self.total_incoming_demand
    }

    pub fn current_incoming_supply(&self) -> f64 {
        self.current_incoming_supply
    }

    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    pub fn consumer_edges(&self) -> &[EdgeId] {
        &self.consumer_edges
    }

    pub fn supplier_edge(&self) -> Option<EdgeId> {
        self.supplier_edge
    }

    pub fn incoming_demands(&self) -> &[f64] {
        self.incoming_demands.as_slice()
    }

    pub fn outgoing_supplies(&self) -> &[f64] {
        self.outgoing_supplies.as_slice()
    }

    fn update_outgoing_demand(&mut self, engine: &mut FlowEngine) {
        if let Some(edge) = self.supplier_edge {
            engine.push_demand(edge, self.total_incoming_demand);
        }
        self.outgoing_demand_update_needed = false;
        // 下一轮更新进入供给阶段
        engine.invalidate(self.id);
    }

    fn update_outgoing_supplies(&mut self, engine: &mut FlowEngine) {
        if self.total_incoming_demand > self.current_incoming_supply {
            self.overloaded = true;
            let supplies = self
                .policy
                .distribute_supply(self.incoming_demands.as_slice(), self.current_incoming_supply);
            debug!(
                total_demand = self.total_incoming_demand,
                supply = self.current_incoming_supply,
                "⚖️  过载，按策略分配供给"
            );
            for (idx, supply) in supplies.into_iter().enumerate() {
                self.push_outgoing_supply(idx, supply, engine);
            }
        } else if self.overloaded {
            // 脱离过载：所有消费方重新同步为各自的需求
            for idx in 0..self.consumer_edges.len() {
                let demand = self.incoming_demands.as_slice()[idx];
                self.push_outgoing_supply(idx, demand, engine);
            }
            self.overloaded = false;
            debug!("脱离过载状态");
        } else {
            let updated = std::mem::take(&mut self.updated_demands);
            for idx in updated {
                if let Ok(demand) = self.incoming_demands.get(idx) {
                    self.push_outgoing_supply(idx, demand, engine);
                }
            }
        }

        self.updated_demands.clear();
    }

    fn push_outgoing_supply(&mut self, idx: usize, supply: f64, engine: &mut FlowEngine) {
        let Ok(current) = self.outgoing_supplies.get(idx) else {
            warn!(idx, "向未知消费方推送供给");
            return;
        };
        if current == supply {
            return;
        }
        let _ = self.outgoing_supplies.set(idx, supply);
        engine.push_supply(self.consumer_edges[idx], supply);
    }
}

impl FlowNode for FlowDistributor {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, engine), fields(node = %self.name))]
    fn on_update(&mut self, _now: SimTime, engine: &mut FlowEngine) -> SimTime {
        // 需求阶段与供给阶段不在同一次更新里混合
        if self.outgoing_demand_update_needed {
            self.update_outgoing_demand(engine);
            return SimTime::INFINITY;
        }

        if !self.consumer_edges.is_empty() {
            self.update_outgoing_supplies(engine);
        }

        SimTime::INFINITY
    }

    fn as_supplier(&mut self) -> Option<&mut dyn FlowSupplier> {
        Some(self)
    }

    fn as_consumer(&mut self) -> Option<&mut dyn FlowConsumer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl FlowSupplier for FlowDistributor {
    fn supplier_resource_type(&self) -> ResourceType {
        self.resource
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    /// 新消费方：需求与供给都从 0 开始
    fn add_consumer_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine) {
        let idx = self.consumer_edges.len();
        if let Some(e) = engine.edge_mut(edge) {
            e.set_consumer_index(Some(idx));
        }
        self.consumer_edges.push(edge);
        self.incoming_demands.add(0.0);
        self.outgoing_supplies.add(0.0);
        trace!(?edge, idx, "注册消费方边");
    }

    fn remove_consumer_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine) {
        let Some(idx) = engine.edge(edge).and_then(|e| e.consumer_index()) else {
            return;
        };
        if self.consumer_edges.get(idx) != Some(&edge) {
            warn!(?edge, idx, "消费方下标与分发器不一致，忽略移除");
            return;
        }

        if let Ok(demand) = self.incoming_demands.remove(idx) {
            self.total_incoming_demand -= demand;
        }
        let _ = self.outgoing_supplies.remove(idx);
        self.consumer_edges.remove(idx);
        if self.consumer_edges.is_empty() {
            self.total_incoming_demand = 0.0;
        }
        if let Some(e) = engine.edge_mut(edge) {
            e.set_consumer_index(None);
        }

        // 更高下标的边整体前移一位
        for (i, &other) in self.consumer_edges.iter().enumerate().skip(idx) {
            if let Some(e) = engine.edge_mut(other) {
                e.set_consumer_index(Some(i));
            }
        }

        self.updated_demands = self
            .updated_demands
            .iter()
            .filter(|&&i| i != idx)
            .map(|&i| if i > idx { i - 1 } else { i })
            .collect();

        debug!(?edge, idx, remaining = self.consumer_edges.len(), "移除消费方边");
        self.outgoing_demand_update_needed = true;
        engine.invalidate(self.id);
    }

    fn handle_incoming_demand(&mut self, edge: EdgeId, demand: f64, engine: &mut FlowEngine) {
        let idx = engine.edge(edge).and_then(|e| e.consumer_index());
        let Some((idx, prev)) = idx.and_then(|i| self.incoming_demands.get(i).ok().map(|p| (i, p)))
        else {
            warn!(?edge, node = %self.name, "未知消费方推送了需求，忽略");
            engine.stats.ignored_demand_pushes += 1;
            return;
        };

        let _ = self.incoming_demands.set(idx, demand);
        self.total_incoming_demand += demand - prev;
        self.updated_demands.insert(idx);

        self.outgoing_demand_update_needed = true;
        engine.invalidate(self.id);
    }
}

impl FlowConsumer for FlowDistributor {
    fn consumer_resource_type(&self) -> ResourceType {
        self.resource
    }

    fn can_accept_supplier(&self) -> bool {
        self.supplier_edge.is_none()
    }

    fn add_supplier_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine) {
        self.supplier_edge = Some(edge);
        self.capacity = engine.edge(edge).map_or(0.0, |e| e.capacity());
        self.current_incoming_supply = 0.0;
        // 已有消费方时需要把汇总需求告知新的上游
        if self.total_incoming_demand > 0.0 {
            self.outgoing_demand_update_needed = true;
            engine.invalidate(self.id);
        }
    }

    fn remove_supplier_edge(&mut self, _edge: EdgeId, engine: &mut FlowEngine) {
        self.supplier_edge = None;
        self.capacity = 0.0;
        self.current_incoming_supply = 0.0;
        self.updated_demands.clear();
        engine.close_node(self.id);
    }

    fn handle_incoming_supply(&mut self, _edge: EdgeId, supply: f64, engine: &mut FlowEngine) {
        self.current_incoming_supply = supply;
        engine.invalidate(self.id);
    }
}
