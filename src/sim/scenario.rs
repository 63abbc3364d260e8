use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::flow::{DistributionPolicyKind, ResourceType};
use crate::sim::SimTime;
use crate::workload::{CheckpointConfig, ScalingPolicyKind, TraceWorkload};

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema_version {0} (expected {expected})", expected = SCENARIO_SCHEMA_VERSION)]
    UnsupportedSchema(u32),
    #[error("duplicate host id {0}")]
    DuplicateHost(usize),
    #[error("task {task} references unknown host {host}")]
    UnknownHost { task: u64, host: usize },
    #[error("host {host} has invalid capacity {capacity}")]
    InvalidCapacity { host: usize, capacity: f64 },
    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<ScenarioMeta>,
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub resource: ResourceType,
    pub capacity: f64,
    #[serde(default)]
    pub policy: Option<DistributionPolicyKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: u64,
    pub host: usize,
    #[serde(default)]
    pub submit_ms: Option<u64>,
    #[serde(default)]
    pub scaling: Option<ScalingPolicyKind>,
    #[serde(default)]
    pub checkpoint: Option<CheckpointSpec>,
    #[serde(default)]
    pub fragments: Vec<FragmentSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSpec {
    #[serde(default)]
    pub interval_ms: u64,
    #[serde(default)]
    pub duration_ms: u64,
    /// Multiplier applied to the interval after every checkpoint.
    #[serde(default)]
    pub interval_scaling: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentSpec {
    pub duration_ms: u64,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub gpu_usage: f64,
    #[serde(default)]
    pub gpu_memory_usage: u64,
}

impl ScenarioSpec {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.schema_version != SCENARIO_SCHEMA_VERSION {
            return Err(ScenarioError::UnsupportedSchema(self.schema_version));
        }
        let mut ids = BTreeSet::new();
        for h in &self.hosts {
            if !ids.insert(h.id) {
                return Err(ScenarioError::DuplicateHost(h.id));
            }
            if !h.capacity.is_finite() || h.capacity < 0.0 {
                return Err(ScenarioError::InvalidCapacity {
                    host: h.id,
                    capacity: h.capacity,
                });
            }
        }
        for t in &self.tasks {
            if !ids.contains(&t.host) {
                return Err(ScenarioError::UnknownHost {
                    task: t.id,
                    host: t.host,
                });
            }
        }
        Ok(())
    }
}

impl HostSpec {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("host{}", self.id))
    }
}

impl TaskSpec {
    pub fn submit_at(&self) -> SimTime {
        SimTime::from_millis(self.submit_ms.unwrap_or(0))
    }

    pub fn checkpoint_config(&self) -> CheckpointConfig {
        let Some(c) = &self.checkpoint else {
            return CheckpointConfig::default();
        };
        CheckpointConfig {
            interval: SimTime::from_millis(c.interval_ms),
            duration: SimTime::from_millis(c.duration_ms),
            interval_scaling: c.interval_scaling.unwrap_or(1.0),
        }
    }

    pub fn to_trace(&self) -> TraceWorkload {
        let mut builder = TraceWorkload::builder(
            self.id,
            self.checkpoint_config(),
            self.scaling.unwrap_or_default().build(),
        );
        for f in &self.fragments {
            builder.add(
                SimTime::from_millis(f.duration_ms),
                f.cpu_usage,
                f.gpu_usage,
                f.gpu_memory_usage,
            );
        }
        builder.build()
    }
}
