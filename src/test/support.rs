use crate::flow::{EdgeId, FlowConsumer, FlowNode, NodeId, ResourceType};
use crate::sim::{FlowEngine, SimTime};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// 最简单的消费方：只记录收到的供给，需求由测试直接经由引擎推送
pub struct Probe {
    pub id: NodeId,
    pub resource: ResourceType,
    pub edge: Option<EdgeId>,
    pub supply: f64,
    pub supply_updates: u32,
}

impl Probe {
    pub fn new(id: NodeId) -> Self {
        Self::with_resource(id, ResourceType::Cpu)
    }

    pub fn with_resource(id: NodeId, resource: ResourceType) -> Self {
        Self {
            id,
            resource,
            edge: None,
            supply: 0.0,
            supply_updates: 0,
        }
    }
}

impl FlowNode for Probe {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        "probe"
    }

    fn on_update(&mut self, _now: SimTime, _engine: &mut FlowEngine) -> SimTime {
        SimTime::INFINITY
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

impl FlowConsumer for Probe {
    fn consumer_resource_type(&self) -> ResourceType {
        self.resource
    }

    fn can_accept_supplier(&self) -> bool {
        self.edge.is_none()
    }

    fn add_supplier_edge(&mut self, edge: EdgeId, _engine: &mut FlowEngine) {
        self.edge = Some(edge);
    }

    fn remove_supplier_edge(&mut self, _edge: EdgeId, _engine: &mut FlowEngine) {
        self.edge = None;
    }

    fn handle_incoming_supply(&mut self, _edge: EdgeId, supply: f64, _engine: &mut FlowEngine) {
        self.supply = supply;
        self.supply_updates += 1;
    }
}

/// 按给定的截止时间序列依次醒来，并记录每次被更新的时刻
pub struct Ticker {
    pub id: NodeId,
    pub wakeups: Vec<SimTime>,
    pub log: Arc<Mutex<Vec<(u32, SimTime)>>>,
    pub tag: u32,
}

impl FlowNode for Ticker {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        "ticker"
    }

    fn on_update(&mut self, now: SimTime, _engine: &mut FlowEngine) -> SimTime {
        self.log.lock().expect("log lock").push((self.tag, now));
        self.wakeups.retain(|&t| t > now);
        self.wakeups.first().copied().unwrap_or(SimTime::INFINITY)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 每次被更新都把截止时间往后推一格，用来制造过期的定时条目
pub struct Drifter {
    pub id: NodeId,
    pub updates: u64,
}

impl FlowNode for Drifter {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        "drifter"
    }

    fn on_update(&mut self, now: SimTime, _engine: &mut FlowEngine) -> SimTime {
        self.updates += 1;
        now.saturating_add(SimTime(1000 + self.updates))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
