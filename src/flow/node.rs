//! 流图节点
//!
//! 定义节点基础 trait 以及节点可实现的两种能力契约：供给方与消费方。
//! 一个具体节点可以同时实现两者（例如分发器）。

use super::id::{EdgeId, NodeId};
use super::resource::ResourceType;
use crate::sim::{FlowEngine, SimTime};
use std::any::Any;

/// 节点生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// 参与引擎的脏标记调度
    Active,
    /// 完全脱离，不再收到任何回调
    Closed,
}

/// 节点接口
pub trait FlowNode: Any + Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 重新评估节点状态，返回下一个截止时间（`SimTime::INFINITY` 表示没有待办工作）。
    fn on_update(&mut self, now: SimTime, engine: &mut FlowEngine) -> SimTime;

    fn as_supplier(&mut self) -> Option<&mut dyn FlowSupplier> {
        None
    }

    fn as_consumer(&mut self) -> Option<&mut dyn FlowConsumer> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// 供给方能力：向下游消费方边提供资源。
pub trait FlowSupplier {
    fn supplier_resource_type(&self) -> ResourceType;

    /// 可供给的最大容量，连接时写入边
    fn capacity(&self) -> f64;

    fn can_accept_consumer(&self) -> bool {
        true
    }

    fn add_consumer_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine);

    fn remove_consumer_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine);

    fn handle_incoming_demand(&mut self, edge: EdgeId, demand: f64, engine: &mut FlowEngine);
}

/// 消费方能力：从上游供给方边获取资源。
pub trait FlowConsumer {
    fn consumer_resource_type(&self) -> ResourceType;

    fn can_accept_supplier(&self) -> bool {
        true
    }

    fn add_supplier_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine);

    fn remove_supplier_edge(&mut self, edge: EdgeId, engine: &mut FlowEngine);

    fn handle_incoming_supply(&mut self, edge: EdgeId, supply: f64, engine: &mut FlowEngine);
}
