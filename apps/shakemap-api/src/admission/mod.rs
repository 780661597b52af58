//! Admission control: caps the number of concurrently active browser tabs and
//! queues the rest in arrival order.

mod queue;

use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

pub use queue::{AdmissionQueue, MaintenanceReport};

/// Limits applied by the admission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum number of concurrently active sessions.
    pub max_active: usize,
    /// Silence after which an active session is presumed gone.
    pub heartbeat_timeout: Duration,
    /// Maximum number of waiting sessions promoted per maintenance pass.
    pub promote_batch: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_active: 10,
            heartbeat_timeout: Duration::from_secs(45),
            promote_batch: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Active,
    Queued,
    None,
}

/// Where a session stands after an admission operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct QueueStatus {
    pub state: QueueState,
    /// 1-based rank in the wait queue. Only present when `state` is `queued`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Number of currently active sessions.
    #[serde(rename = "active")]
    pub active_count: usize,
    pub limit: usize,
}

/// Occupancy after a session left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCounts {
    pub active_count: usize,
    pub waiting_count: usize,
    pub limit: usize,
}
