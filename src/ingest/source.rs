use crate::errors::SourceError;
use crate::ingest::records::{EngagementOverview, OrderList, OrderRecord};
use crate::query::timeseries::TimeRange;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};

pub const OVERVIEW_FILE: &str = "overview.json";
pub const ORDERS_FILE: &str = "orders.json";

/// Filter applied when fetching orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub window: TimeRange,
    /// Orders created by this source (e.g. an automated backfill) are left out.
    pub excluded_source: Option<String>,
}

impl OrderQuery {
    pub fn accepts(&self, order: &OrderRecord) -> bool {
        self.window.contains(&order.created_at)
            && !matches!(
                (&self.excluded_source, &order.source),
                (Some(excluded), Some(source)) if excluded == source
            )
    }
}

/// Where the dashboard's raw telemetry comes from.
pub trait TelemetrySource {
    fn engagement_overview(
        &self,
        window: &TimeRange,
    ) -> impl Future<Output = Result<EngagementOverview, SourceError>> + Send;

    fn orders(
        &self,
        query: &OrderQuery,
    ) -> impl Future<Output = Result<OrderList, SourceError>> + Send;
}

/// Reads query results previously exported as JSON into a directory.
///
/// The overview file is taken as already scoped to the requested window;
/// orders are filtered here.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    dir: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, SourceError> {
        let path = self.dir.join(file);
        let contents = tokio::fs::read_to_string(&path).await?;
        let value = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "Loaded snapshot");
        Ok(value)
    }
}

impl TelemetrySource for JsonSnapshotSource {
    async fn engagement_overview(
        &self,
        _window: &TimeRange,
    ) -> Result<EngagementOverview, SourceError> {
        self.read(OVERVIEW_FILE).await
    }

    async fn orders(&self, query: &OrderQuery) -> Result<OrderList, SourceError> {
        let mut list: OrderList = self.read(ORDERS_FILE).await?;
        let before = list.items.len();
        list.items.retain(|order| query.accepts(order));
        tracing::debug!(
            kept = list.items.len(),
            dropped = before - list.items.len(),
            "Filtered orders"
        );
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
    }

    fn order(hour: u32, source: Option<&str>) -> OrderRecord {
        OrderRecord {
            created_at: at(hour),
            source: source.map(str::to_string),
        }
    }

    fn query(excluded: Option<&str>) -> OrderQuery {
        OrderQuery {
            window: TimeRange::new(at(8), at(12)),
            excluded_source: excluded.map(str::to_string),
        }
    }

    #[test]
    fn test_accepts_window_inclusive() {
        let q = query(None);
        assert!(q.accepts(&order(8, None)));
        assert!(q.accepts(&order(12, None)));
        assert!(!q.accepts(&order(7, None)));
        assert!(!q.accepts(&order(13, None)));
    }

    #[test]
    fn test_rejects_excluded_source() {
        let q = query(Some("subscription-renewal"));
        assert!(!q.accepts(&order(10, Some("subscription-renewal"))));
        assert!(q.accepts(&order(10, Some("web"))));
        assert!(q.accepts(&order(10, None)));
    }

    #[tokio::test]
    async fn test_snapshot_source_reads_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(OVERVIEW_FILE),
            r#"{"uniqueDeviceIds": 3, "views": [{"identifier": "/a", "uniqueDeviceCount": 3}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(ORDERS_FILE),
            r#"{"items": [
                {"createdAt": "2024-01-15T09:00:00Z", "source": "web"},
                {"createdAt": "2024-01-15T10:00:00Z", "source": "subscription-renewal"},
                {"createdAt": "2024-01-16T10:00:00Z", "source": "web"}
            ]}"#,
        )
        .unwrap();

        let source = JsonSnapshotSource::new(dir.path());
        let q = query(Some("subscription-renewal"));
        let overview = source.engagement_overview(&q.window).await.unwrap();
        assert_eq!(overview.unique_device_ids, 3);

        let orders = source.orders(&q).await.unwrap();
        assert_eq!(orders.items.len(), 1);
        assert_eq!(orders.items[0].created_at, at(9));
    }

    #[tokio::test]
    async fn test_snapshot_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonSnapshotSource::new(dir.path());
        let err = source.orders(&query(None)).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_snapshot_source_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OVERVIEW_FILE), "{not json").unwrap();
        let source = JsonSnapshotSource::new(dir.path());
        let err = source
            .engagement_overview(&query(None).window)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
