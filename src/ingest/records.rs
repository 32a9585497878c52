use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One distinct raw view as reported by the engagement query.
///
/// Either field may be missing; such records contribute nothing to any
/// aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub unique_device_count: Option<u64>,
}

impl ViewRecord {
    /// The `(identifier, count)` pair, if both are present.
    pub fn counted(&self) -> Option<(&str, u64)> {
        Some((self.identifier.as_deref()?, self.unique_device_count?))
    }
}

/// A referrer with its unique device count. `None` means direct traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerRecord {
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub unique_device_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub created_at: DateTime<Utc>,
    /// Channel that created the order (e.g. a storefront or an automated job).
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
}

/// Engagement overview query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementOverview {
    #[serde(default)]
    pub unique_device_ids: u64,
    #[serde(default)]
    pub views: Vec<ViewRecord>,
    #[serde(default)]
    pub referrers: Vec<ReferrerRecord>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub device_category_percentages: BTreeMap<String, f64>,
}

/// Orders query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderList {
    #[serde(default)]
    pub items: Vec<OrderRecord>,
}
