//! Captured change records and their outbound wire form.

use crate::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change reported by the feed's `_CHANGE_TYPE` pseudo-column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<ChangeType, SyncError> {
        match s {
            "INSERT" => Ok(ChangeType::Insert),
            "UPDATE" => Ok(ChangeType::Update),
            "DELETE" => Ok(ChangeType::Delete),
            other => Err(SyncError::Transient(format!(
                "change feed returned unknown change type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row returned by a change-feed range query. Immutable.
///
/// `change_timestamp` orders records within a window; ordering across
/// windows is guaranteed only by the window boundaries themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Event time, microseconds since the Unix epoch.
    pub event_timestamp: i64,
    pub user_id: String,
    pub device_category: String,
    pub geo_country: String,
    /// Purchase revenue in USD.
    pub purchase_revenue: f64,
    pub change_type: ChangeType,
    /// Commit time of the append that produced this row.
    pub change_timestamp: DateTime<Utc>,
}

/// Wire form of a captured row: the business fields only, as a flat JSON
/// object with exactly these keys. The change-tracking columns are not
/// republished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundEvent {
    pub event_timestamp: i64,
    pub user_id: String,
    pub device_category: String,
    pub geo_country: String,
    pub ecommerce_purchase_revenue_in_usd: f64,
}

impl From<&ChangeRecord> for OutboundEvent {
    fn from(record: &ChangeRecord) -> OutboundEvent {
        OutboundEvent {
            event_timestamp: record.event_timestamp,
            user_id: record.user_id.clone(),
            device_category: record.device_category.clone(),
            geo_country: record.geo_country.clone(),
            ecommerce_purchase_revenue_in_usd: record.purchase_revenue,
        }
    }
}

impl OutboundEvent {
    /// UTF-8 JSON encoding published on the topic.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Consumer-side decoding of the wire format.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<OutboundEvent> {
        serde_json::from_slice(bytes)
    }
}
