use crate::ingest::pathname::extract_path;
use crate::ingest::records::ViewRecord;
use crate::ingest::traffic_source::classify;
use crate::query::aggregate::{aggregate, AggregatedEntry};
use crate::query::timeseries::TimeSeriesPoint;
use serde::Serialize;

/// Chart colours, assigned by rank and reused once exhausted.
pub const PALETTE: [&str; 8] = [
    "#4f46e5", "#16a34a", "#f59e0b", "#dc2626", "#0891b2", "#9333ea", "#db2777", "#65a30d",
];

/// Available view breakdown dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Canonical path, query string dropped.
    Path,
    /// The identifier exactly as reported.
    Raw,
    /// Traffic channel name.
    TrafficSource,
}

impl Dimension {
    fn key(self, identifier: &str) -> String {
        match self {
            Self::Path => extract_path(identifier),
            Self::Raw => identifier.to_string(),
            Self::TrafficSource => classify(identifier).to_string(),
        }
    }
}

/// Group views along `dimension`, summing unique device counts.
///
/// Views missing an identifier or a count are skipped.
pub fn breakdown(views: &[ViewRecord], dimension: Dimension) -> Vec<AggregatedEntry> {
    aggregate(
        views
            .iter()
            .filter_map(ViewRecord::counted)
            .map(|(identifier, count)| (dimension.key(identifier), count)),
    )
}

/// Total unique device count across views that carry both fields.
pub fn total_views(views: &[ViewRecord]) -> u64 {
    views
        .iter()
        .filter_map(ViewRecord::counted)
        .fold(0u64, |acc, (_, count)| acc.saturating_add(count))
}

/// One slice of the traffic-source pie chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: u64,
    pub color: &'static str,
}

/// Attach palette colours to ranked entries.
pub fn chart_slices(entries: &[AggregatedEntry]) -> Vec<ChartSlice> {
    entries
        .iter()
        .enumerate()
        .map(|(rank, entry)| ChartSlice {
            name: entry.key.clone(),
            value: entry.count,
            color: PALETTE[rank % PALETTE.len()],
        })
        .collect()
}

/// One bar of the orders chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdersPoint {
    pub date: String,
    pub orders: u64,
}

pub fn orders_chart(points: &[TimeSeriesPoint]) -> Vec<OrdersPoint> {
    points
        .iter()
        .map(|point| OrdersPoint {
            date: point.date_key.clone(),
            orders: point.orders,
        })
        .collect()
}
