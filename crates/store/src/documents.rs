use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection holding uploaded dataset records.
pub const DATASETS: &str = "chart_data";
/// Collection holding status check entries.
pub const STATUS_CHECKS: &str = "status_checks";

/// A write-once heartbeat entry posted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_name: client_name.into(),
            timestamp: Utc::now(),
        }
    }
}
