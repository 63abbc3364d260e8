//! 固定容量的资源源头
//!
//! 代表主机侧的 CPU/GPU：只接受一条消费方边，供给 `min(需求, 容量)`。

use std::any::Any;

use super::id::{EdgeId, NodeId};
use super::node::{FlowNode, FlowSupplier};
use super::resource::ResourceType;
use crate::sim::{FlowEngine, SimTime};
use tracing::debug;

#[derive(Debug)]
pub struct FlowSource {
    id: NodeId,
    name: String,
    resource: ResourceType,
    capacity: f64,
    consumer_edge: Option<EdgeId>,
    current_demand: f64,
    current_supply: f64,
}

impl FlowSource {
    pub fn new(id: NodeId, name: impl Into<String>, resource: ResourceType, capacity: f64) -> Self {
        Self {
            id,
            name: name.into(),
            resource,
            capacity: capacity.max(0.0),
            consumer_edge: None,
            current_demand: 0.0,
            current_supply: 0.0,
        }
    }

    pub fn current_demand(&self) -> f64 {
        self.current_demand
    }

    pub fn current_supply(&self) -> f64 {
        self.current_supply
    }

    /// 调整容量（例如主机降频），下一次派发时重新计算供给
    pub fn set_capacity(&mut self, capacity: f64, engine: &mut FlowEngine) {
        self.capacity = capacity.max(0.0);
        engine.invalidate(self.id);
    }
}

impl FlowNode for FlowSource {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&mut self, _now: SimTime, engine: &mut FlowEngine) -> SimTime {
        let supply = self.current_demand.min(self.capacity);
        if supply != self.current_supply {
            debug!(node = %self.name, demand = self.current_demand, supply, "🔋 更新供给");
        }
        self.current_supply = supply;
        if let Some(edge) = self.consumer_edge {
            engine.push_supply(edge, supply);
        }
        SimTime::INFINITY
    }

    fn as_supplier(&mut self) -> Option<&mut dyn FlowSupplier> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl FlowSupplier for FlowSource {
    fn supplier_resource_type(&self) -> ResourceType {
        self.resource
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn can_accept_consumer(&self) -> bool {
        self.consumer_edge.is_none()
    }

    fn add_consumer_edge(&mut self, edge: EdgeId, _engine: &mut FlowEngine) {
        self.consumer_edge = Some(edge);
        self.current_demand = 0.0;
        self.current_supply = 0.0;
    }

    fn remove_consumer_edge(&mut self, _edge: EdgeId, _engine: &mut FlowEngine) {
        self.consumer_edge = None;
        self.current_demand = 0.0;
        self.current_supply = 0.0;
    }

    fn handle_incoming_demand(&mut self, _edge: EdgeId, demand: f64, engine: &mut FlowEngine) {
        self.current_demand = demand;
        engine.invalidate(self.id);
    }
}
