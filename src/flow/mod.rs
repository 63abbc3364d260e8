//! 流图模块
//!
//! 此模块包含流图的核心组件：节点契约、边、分发器、分配策略和资源源头。

// 子模块声明
mod distributor;
mod edge;
mod id;
mod node;
mod policy;
mod resource;
mod source;

// 重新导出公共接口
pub use distributor::FlowDistributor;
pub use edge::FlowEdge;
pub use id::{EdgeId, NodeId};
pub use node::{FlowConsumer, FlowNode, FlowSupplier, NodeState};
pub use policy::{
    DistributionPolicy, DistributionPolicyKind, MaxMinFairnessPolicy, ProportionalSharePolicy,
};
pub use resource::ResourceType;
pub use source::FlowSource;
