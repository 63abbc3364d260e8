//! 错误类型

use crate::flow::{EdgeId, NodeId, ResourceType};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("unsupported resource kind: {0}")]
    UnsupportedResource(ResourceType),
    #[error("index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("trace exhausted after {len} fragments")]
    TraceExhausted { len: usize },
    #[error("resource mismatch: supplier provides {supplier}, consumer expects {consumer}")]
    ResourceMismatch {
        supplier: ResourceType,
        consumer: ResourceType,
    },
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeId),
    #[error("node {0:?} is not a supplier")]
    NotASupplier(NodeId),
    #[error("node {0:?} is not a consumer")]
    NotAConsumer(NodeId),
    #[error("node {0:?} is being updated")]
    NodeBusy(NodeId),
    #[error("node {0:?} has a different type")]
    WrongNodeType(NodeId),
    #[error("node {0:?} is closed")]
    NodeClosed(NodeId),
    #[error("node {0:?} cannot accept another connection")]
    AlreadyConnected(NodeId),
    #[error("no supplier matches the workload's resources")]
    NoMatchingSupplier,
    #[error("workload {0:?} lost its supplier before completion")]
    WorkloadInterrupted(NodeId),
    #[error("workload {0:?} is stopped")]
    WorkloadStopped(NodeId),
    #[error("workload {0:?} is already checkpointing")]
    SnapshotDuringCheckpoint(NodeId),
    #[error("workload {0:?} has no work left in its current fragment")]
    SnapshotAtFragmentEnd(NodeId),
}
