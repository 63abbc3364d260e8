//! 流图引擎
//!
//! 持有节点与边的注册表、仿真时钟、脏节点工作列表以及节点截止时间队列。
//! 节点之间的一切交互都经由引擎：边推送、脏标记、连接与断开。

use super::scheduled_event::ScheduledUpdate;
use super::stats::FlowStats;
use super::time::SimTime;
use crate::error::FlowError;
use crate::flow::{EdgeId, FlowEdge, FlowNode, NodeId, NodeState, ResourceType};
use std::collections::{BinaryHeap, VecDeque};
use tracing::{debug, info, trace, warn};

/// 过期定时条目超过 `2 * 节点数 + TIMER_SLACK` 时压缩队列
const TIMER_SLACK: usize = 64;

struct NodeSlot {
    /// 节点正在被回调时为 None（已被取出）
    node: Option<Box<dyn FlowNode>>,
    state: NodeState,
    dirty: bool,
    deadline: SimTime,
    edges: Vec<EdgeId>,
}

/// 事件驱动的流图引擎
#[derive(Default)]
pub struct FlowEngine {
    now: SimTime,
    next_seq: u64,
    timers: BinaryHeap<ScheduledUpdate>,
    dirty: VecDeque<NodeId>,
    nodes: Vec<NodeSlot>,
    edges: Vec<Option<FlowEdge>>,
    pub stats: FlowStats,
}

impl FlowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 注册节点。闭包拿到分配好的标识符并构造节点。
    pub fn add_node<N, F>(&mut self, make: F) -> NodeId
    where
        N: FlowNode,
        F: FnOnce(NodeId) -> N,
    {
        let id = NodeId(self.nodes.len());
        let node = make(id);
        debug!(node = ?id, name = node.name(), "➕ 注册节点");
        self.nodes.push(NodeSlot {
            node: Some(Box::new(node)),
            state: NodeState::Active,
            dirty: false,
            deadline: SimTime::INFINITY,
            edges: Vec::new(),
        });
        id
    }

    pub fn node_state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(id.0).map(|s| s.state)
    }

    pub fn is_closed(&self, id: NodeId) -> bool {
        self.node_state(id) == Some(NodeState::Closed)
    }

    /// 节点当前登记的截止时间
    pub fn deadline(&self, id: NodeId) -> Option<SimTime> {
        self.nodes.get(id.0).map(|s| s.deadline)
    }

    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|s| s.dirty)
    }

    /// 只读访问节点（已关闭的节点仍可查看）
    pub fn node<N: FlowNode>(&self, id: NodeId) -> Option<&N> {
        self.nodes
            .get(id.0)?
            .node
            .as_ref()?
            .as_any()
            .downcast_ref::<N>()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&FlowEdge> {
        self.edges.get(id.0)?.as_ref()
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut FlowEdge> {
        self.edges.get_mut(id.0)?.as_mut()
    }

    /// 节点当前连接的边
    pub fn edges_of(&self, id: NodeId) -> &[EdgeId] {
        self.nodes.get(id.0).map_or(&[], |s| s.edges.as_slice())
    }

    /// 暂时把节点取出来，以具体类型交给闭包，同时闭包可以继续操作引擎。
    pub fn with_node<N, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut N, &mut FlowEngine) -> R,
    ) -> Result<R, FlowError>
    where
        N: FlowNode,
    {
        let slot = self.nodes.get_mut(id.0).ok_or(FlowError::NodeNotFound(id))?;
        let Some(mut node) = slot.node.take() else {
            return Err(match slot.state {
                NodeState::Closed => FlowError::NodeClosed(id),
                NodeState::Active => FlowError::NodeBusy(id),
            });
        };
        let result = match node.as_any_mut().downcast_mut::<N>() {
            Some(n) => Ok(f(n, self)),
            None => Err(FlowError::WrongNodeType(id)),
        };
        self.nodes[id.0].node = Some(node);
        result
    }

    fn node_box_mut(&mut self, id: NodeId) -> Result<&mut Box<dyn FlowNode>, FlowError> {
        let slot = self.nodes.get_mut(id.0).ok_or(FlowError::NodeNotFound(id))?;
        if slot.state == NodeState::Closed {
            return Err(FlowError::NodeClosed(id));
        }
        slot.node.as_mut().ok_or(FlowError::NodeBusy(id))
    }

    /// 查询供给方节点提供的资源类型
    pub fn supplier_resource(&mut self, id: NodeId) -> Result<ResourceType, FlowError> {
        let node = self.node_box_mut(id)?;
        let s = node.as_supplier().ok_or(FlowError::NotASupplier(id))?;
        Ok(s.supplier_resource_type())
    }

    /// 把回调派发给节点；节点已关闭或正在被回调时跳过。
    fn dispatch(&mut self, id: NodeId, f: impl FnOnce(&mut dyn FlowNode, &mut FlowEngine)) -> bool {
        let Some(slot) = self.nodes.get_mut(id.0) else {
            return false;
        };
        if slot.state == NodeState::Closed {
            trace!(node = ?id, "节点已关闭，跳过回调");
            return false;
        }
        let Some(mut node) = slot.node.take() else {
            warn!(node = ?id, "节点正在更新中，跳过重入回调");
            return false;
        };
        f(node.as_mut(), self);
        self.nodes[id.0].node = Some(node);
        true
    }

    /// 连接消费方与供给方，创建一条新边。
    #[tracing::instrument(skip(self))]
    pub fn connect(&mut self, consumer: NodeId, supplier: NodeId) -> Result<EdgeId, FlowError> {
        let (resource, capacity) = {
            let node = self.node_box_mut(supplier)?;
            let s = node.as_supplier().ok_or(FlowError::NotASupplier(supplier))?;
            if !s.can_accept_consumer() {
                return Err(FlowError::AlreadyConnected(supplier));
            }
            (s.supplier_resource_type(), s.capacity())
        };
        let consumer_resource = {
            let node = self.node_box_mut(consumer)?;
            let c = node.as_consumer().ok_or(FlowError::NotAConsumer(consumer))?;
            if !c.can_accept_supplier() {
                return Err(FlowError::AlreadyConnected(consumer));
            }
            c.consumer_resource_type()
        };
        if resource != consumer_resource {
            return Err(FlowError::ResourceMismatch {
                supplier: resource,
                consumer: consumer_resource,
            });
        }

        let id = EdgeId(self.edges.len());
        self.edges
            .push(Some(FlowEdge::new(id, consumer, supplier, resource, capacity)));
        self.nodes[consumer.0].edges.push(id);
        self.nodes[supplier.0].edges.push(id);
        debug!(edge = ?id, %resource, capacity, "🔗 创建边");

        self.dispatch(supplier, |node, eng| {
            if let Some(s) = node.as_supplier() {
                s.add_consumer_edge(id, eng);
            }
        });
        self.dispatch(consumer, |node, eng| {
            if let Some(c) = node.as_consumer() {
                c.add_supplier_edge(id, eng);
            }
        });
        Ok(id)
    }

    /// 断开一条边：先通知两端（此时边仍可读），再丢弃边。
    #[tracing::instrument(skip(self))]
    pub fn disconnect(&mut self, edge: EdgeId) {
        let Some(e) = self.edge_mut(edge) else {
            return;
        };
        if e.detaching {
            return;
        }
        e.detaching = true;
        let (consumer, supplier) = (e.consumer(), e.supplier());
        debug!(?consumer, ?supplier, "✂️  断开边");

        self.dispatch(consumer, |node, eng| {
            if let Some(c) = node.as_consumer() {
                c.remove_supplier_edge(edge, eng);
            }
        });
        self.dispatch(supplier, |node, eng| {
            if let Some(s) = node.as_supplier() {
                s.remove_consumer_edge(edge, eng);
            }
        });

        self.edges[edge.0] = None;
        for n in [consumer, supplier] {
            self.nodes[n.0].edges.retain(|&e| e != edge);
        }
    }

    /// 关闭节点：进入 closed 状态并断开其全部边。
    #[tracing::instrument(skip(self))]
    pub fn close_node(&mut self, id: NodeId) {
        let Some(slot) = self.nodes.get_mut(id.0) else {
            return;
        };
        if slot.state == NodeState::Closed {
            return;
        }
        slot.state = NodeState::Closed;
        slot.dirty = false;
        slot.deadline = SimTime::INFINITY;
        let edges = slot.edges.clone();
        debug!(edges = edges.len(), "🛑 关闭节点");
        for e in edges {
            self.disconnect(e);
        }
    }

    /// 释放已关闭节点的状态，标识符保持有效但不再指向任何节点。
    ///
    /// 节点仍在运行或正在被回调时返回错误。
    pub fn release_node(&mut self, id: NodeId) -> Result<(), FlowError> {
        let slot = self.nodes.get_mut(id.0).ok_or(FlowError::NodeNotFound(id))?;
        if slot.state != NodeState::Closed {
            return Err(FlowError::NodeBusy(id));
        }
        if slot.node.take().is_some() {
            trace!(node = ?id, "♻️  释放节点");
        }
        Ok(())
    }

    /// 标记节点为脏，延迟到派发阶段再调用 `on_update`。
    pub fn invalidate(&mut self, id: NodeId) {
        let Some(slot) = self.nodes.get_mut(id.0) else {
            return;
        };
        if slot.state == NodeState::Closed || slot.dirty {
            return;
        }
        slot.dirty = true;
        self.dirty.push_back(id);
    }

    /// 消费方 -> 供给方推送需求；取值未变化时不产生任何回调。
    pub fn push_demand(&mut self, edge: EdgeId, demand: f64) {
        let (changed, supplier) = match self.edges.get_mut(edge.0).and_then(Option::as_mut) {
            Some(e) => (e.store_demand(demand), e.supplier()),
            None => {
                warn!(?edge, "向不存在的边推送需求");
                return;
            }
        };
        if !changed {
            self.stats.suppressed_pushes += 1;
            return;
        }
        self.stats.demand_pushes += 1;
        trace!(?edge, ?supplier, demand, "⬆️  推送需求");
        self.dispatch(supplier, |node, eng| {
            if let Some(s) = node.as_supplier() {
                s.handle_incoming_demand(edge, demand, eng);
            }
        });
    }

    /// 供给方 -> 消费方推送供给；取值未变化时不产生任何回调。
    pub fn push_supply(&mut self, edge: EdgeId, supply: f64) {
        let (changed, consumer) = match self.edges.get_mut(edge.0).and_then(Option::as_mut) {
            Some(e) => (e.store_supply(supply), e.consumer()),
            None => {
                warn!(?edge, "向不存在的边推送供给");
                return;
            }
        };
        if !changed {
            self.stats.suppressed_pushes += 1;
            return;
        }
        self.stats.supply_pushes += 1;
        trace!(?edge, ?consumer, supply, "⬇️  推送供给");
        self.dispatch(consumer, |node, eng| {
            if let Some(c) = node.as_consumer() {
                c.handle_incoming_supply(edge, supply, eng);
            }
        });
    }

    /// 带资源类型校验的需求推送
    pub fn push_demand_typed(
        &mut self,
        edge: EdgeId,
        demand: f64,
        resource: ResourceType,
    ) -> Result<(), FlowError> {
        self.check_resource(edge, resource)?;
        self.push_demand(edge, demand);
        Ok(())
    }

    /// 带资源类型校验的供给推送
    pub fn push_supply_typed(
        &mut self,
        edge: EdgeId,
        supply: f64,
        resource: ResourceType,
    ) -> Result<(), FlowError> {
        self.check_resource(edge, resource)?;
        self.push_supply(edge, supply);
        Ok(())
    }

    fn check_resource(&self, edge: EdgeId, resource: ResourceType) -> Result<(), FlowError> {
        let e = self.edge(edge).ok_or(FlowError::EdgeNotFound(edge))?;
        if e.resource() != resource {
            return Err(FlowError::ResourceMismatch {
                supplier: e.resource(),
                consumer: resource,
            });
        }
        Ok(())
    }

    /// 清空脏节点工作列表：逐个调用 `on_update`，直到同一时刻内没有新的脏节点。
    pub fn flush(&mut self) {
        while let Some(id) = self.dirty.pop_front() {
            let slot = &mut self.nodes[id.0];
            if !slot.dirty || slot.state == NodeState::Closed {
                continue;
            }
            slot.dirty = false;
            let Some(mut node) = slot.node.take() else {
                continue;
            };

            self.stats.updates += 1;
            let now = self.now;
            let next = node.on_update(now, self);
            trace!(node = ?id, name = node.name(), ?next, "节点更新完成");

            let slot = &mut self.nodes[id.0];
            slot.node = Some(node);
            if slot.state == NodeState::Closed {
                continue;
            }
            self.set_deadline(id, next);
        }
    }

    fn set_deadline(&mut self, id: NodeId, at: SimTime) {
        let at = at.max(self.now);
        self.nodes[id.0].deadline = at;
        if at.is_infinite() {
            return;
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.timers.push(ScheduledUpdate::new(at, seq, id));
        if self.timers.len() > 2 * self.nodes.len() + TIMER_SLACK {
            self.compact_timers();
        }
    }

    /// 丢弃所有过期的定时条目；每个活跃节点至多保留一条
    fn compact_timers(&mut self) {
        let before = self.timers.len();
        let nodes = &self.nodes;
        self.timers.retain(|t| Self::slot_is_live(&nodes[t.node.0], t));
        trace!(before, after = self.timers.len(), "🧹 压缩定时队列");
    }

    fn slot_is_live(slot: &NodeSlot, t: &ScheduledUpdate) -> bool {
        slot.state == NodeState::Active && slot.deadline == t.at()
    }

    fn is_live(&self, t: &ScheduledUpdate) -> bool {
        Self::slot_is_live(&self.nodes[t.node.0], t)
    }

    /// 队列中的定时条目数（含尚未清理的过期条目）
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// 下一个有效的截止时间；顺带丢弃过期条目。
    fn next_timer(&mut self) -> Option<SimTime> {
        while let Some(top) = self.timers.peek() {
            if self.is_live(top) {
                return Some(top.at());
            }
            self.timers.pop();
        }
        None
    }

    /// 运行直到没有待办工作或到达 `until`。推进时间前总是先清空脏节点。
    pub fn run_until(&mut self, until: SimTime) {
        loop {
            self.flush();
            let Some(at) = self.next_timer() else {
                break;
            };
            if at > until {
                break;
            }
            self.now = at;
            while let Some(top) = self.timers.peek() {
                if top.at() != at {
                    break;
                }
                let t = *top;
                self.timers.pop();
                if self.is_live(&t) {
                    self.invalidate(t.node);
                }
            }
        }
        if !until.is_infinite() {
            self.now = self.now.max(until);
        }
    }

    /// 运行直到没有任何待办工作。
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) {
        info!(now = ?self.now, nodes = self.nodes.len(), "▶️  开始运行仿真");
        self.run_until(SimTime::INFINITY);
        info!(
            final_time = ?self.now,
            updates = self.stats.updates,
            "✅ 仿真完成"
        );
    }
}
