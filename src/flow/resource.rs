//! 资源类型

use serde::{Deserialize, Serialize};
use std::fmt;

/// 资源种类：所有需求/供给/用量映射都以它为键。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Cpu,
    Gpu,
    Memory,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Cpu, ResourceType::Gpu, ResourceType::Memory];
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceType::Cpu => "cpu",
            ResourceType::Gpu => "gpu",
            ResourceType::Memory => "memory",
        };
        f.write_str(s)
    }
}
