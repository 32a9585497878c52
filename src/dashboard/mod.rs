pub mod live;
pub mod visibility;

use crate::config::Config;
use crate::errors::{LiveModeError, SourceError};
use crate::ingest::records::{EngagementOverview, Location, OrderList};
use crate::ingest::referrer::normalize_referrers;
use crate::ingest::source::{OrderQuery, TelemetrySource};
use crate::query::aggregate::AggregatedEntry;
use crate::query::breakdowns::{
    breakdown, chart_slices, orders_chart, total_views, ChartSlice, Dimension, OrdersPoint,
};
use crate::query::stats::{time_stats, TimeStats};
use crate::query::timeseries::{align, Mode, TimeRange, TimeSeriesPoint};
use chrono::{DateTime, Local, TimeZone};
use live::{LiveModeController, LiveSettings, LiveTick, LiveTicks};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use visibility::Visibility;

/// Everything the dashboard renders, derived from one fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub mode: Mode,
    pub window: TimeRange,
    pub unique_device_ids: u64,
    pub total_views: u64,
    pub grouped_views: Vec<AggregatedEntry>,
    pub raw_views: Vec<AggregatedEntry>,
    pub traffic_sources: Vec<AggregatedEntry>,
    pub traffic_sources_chart_data: Vec<ChartSlice>,
    pub referrers: Vec<AggregatedEntry>,
    pub orders_chart_data: Vec<OrdersPoint>,
    pub traffic_sources_by_date: Vec<TimeSeriesPoint>,
    pub time_stats: TimeStats,
    pub locations: Vec<Location>,
    pub device_category_percentages: BTreeMap<String, f64>,
}

/// Derive a [`DashboardView`] from raw query results.
///
/// Pure apart from `rng`, which only feeds the per-day channel estimate.
pub fn build_view<Tz, R>(
    mode: Mode,
    window: &TimeRange,
    overview: &EngagementOverview,
    orders: &OrderList,
    excluded_referrers: &[String],
    now: &DateTime<Tz>,
    rng: &mut R,
) -> DashboardView
where
    Tz: TimeZone,
    R: Rng + ?Sized,
{
    let traffic_sources = breakdown(&overview.views, Dimension::TrafficSource);
    let series = align(mode, Some(window), &orders.items, &traffic_sources, now, rng);

    DashboardView {
        mode,
        window: *window,
        unique_device_ids: overview.unique_device_ids,
        total_views: total_views(&overview.views),
        grouped_views: breakdown(&overview.views, Dimension::Path),
        raw_views: breakdown(&overview.views, Dimension::Raw),
        traffic_sources_chart_data: chart_slices(&traffic_sources),
        traffic_sources,
        referrers: normalize_referrers(&overview.referrers, excluded_referrers),
        orders_chart_data: orders_chart(&series),
        traffic_sources_by_date: series,
        time_stats: time_stats(mode, window, overview.unique_device_ids),
        locations: overview.locations.clone(),
        device_category_percentages: overview.device_category_percentages.clone(),
    }
}

/// Identifies one fetch. Only the most recently issued ticket may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    version: u64,
    mode: Mode,
    window: TimeRange,
}

impl RefreshTicket {
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn window(&self) -> TimeRange {
        self.window
    }
}

/// Dashboard state: mode controller, source visibility and the latest view.
///
/// Each refresh recomputes the view from scratch. A refresh started later
/// supersedes any still in flight; their results are dropped on completion
/// rather than merged.
pub struct Dashboard {
    controller: LiveModeController,
    visibility: Visibility,
    excluded_referrers: Vec<String>,
    excluded_order_source: Option<String>,
    version: u64,
    view: Option<DashboardView>,
}

impl Dashboard {
    /// Create a historical dashboard over `selected`. The receiver yields live
    /// refresh ticks once live mode is switched on.
    pub fn new(config: &Config, selected: TimeRange) -> (Self, LiveTicks) {
        let (controller, ticks) =
            LiveModeController::new(LiveSettings::from_config(config), selected);
        let dashboard = Self {
            controller,
            visibility: Visibility::new(),
            excluded_referrers: config.excluded_referrer_prefixes.clone(),
            excluded_order_source: config.excluded_order_source.clone(),
            version: 0,
            view: None,
        };
        (dashboard, ticks)
    }

    pub const fn controller(&self) -> &LiveModeController {
        &self.controller
    }

    pub const fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn countdown(&self) -> u32 {
        self.controller.countdown()
    }

    pub const fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    pub const fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Switch mode, discarding the current view and any refresh in flight.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), LiveModeError> {
        if mode == self.controller.mode() {
            return Ok(());
        }
        self.controller.set_mode(mode)?;
        self.invalidate();
        Ok(())
    }

    /// Store a new historical range. In historical mode the current view is
    /// discarded.
    pub fn select_range(&mut self, range: TimeRange) {
        self.controller.select_range(range);
        if self.controller.mode() == Mode::Historical {
            self.invalidate();
        }
    }

    /// Stop live timers, e.g. when the dashboard is torn down.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
    }

    /// Start a refresh over the controller's current query window.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        let window = self.controller.query_window();
        self.issue(window)
    }

    /// Start a refresh for a live tick, unless the tick is from timers that
    /// have since been stopped.
    pub fn begin_live_refresh(&mut self, tick: &LiveTick) -> Option<RefreshTicket> {
        if self.controller.is_current(tick) {
            Some(self.issue(tick.window))
        } else {
            tracing::debug!(
                tick_generation = tick.generation,
                generation = self.controller.generation(),
                "Ignoring stale live tick"
            );
            None
        }
    }

    /// Order filter for `ticket` with day boundaries in the local time zone.
    pub fn order_query(&self, ticket: &RefreshTicket) -> OrderQuery {
        self.order_query_in(ticket, &Local)
    }

    /// Order filter for `ticket`. Historical ranges are widened to cover the
    /// whole final day in `tz`.
    pub fn order_query_in<Tz: TimeZone>(&self, ticket: &RefreshTicket, tz: &Tz) -> OrderQuery {
        let window = match ticket.mode {
            Mode::Historical => ticket.window.through_end_of_day(tz),
            Mode::Live => ticket.window,
        };
        OrderQuery {
            window,
            excluded_source: self.excluded_order_source.clone(),
        }
    }

    /// Publish the results of `ticket`'s fetch using the local clock.
    pub fn complete_refresh(
        &mut self,
        ticket: &RefreshTicket,
        overview: &EngagementOverview,
        orders: &OrderList,
    ) -> Option<&DashboardView> {
        self.complete_refresh_at(ticket, overview, orders, &Local::now(), &mut rand::rng())
    }

    /// Publish the results of `ticket`'s fetch. Returns `None`, leaving the
    /// current view untouched, if a newer refresh or a mode change happened
    /// since the ticket was issued.
    pub fn complete_refresh_at<Tz, R>(
        &mut self,
        ticket: &RefreshTicket,
        overview: &EngagementOverview,
        orders: &OrderList,
        now: &DateTime<Tz>,
        rng: &mut R,
    ) -> Option<&DashboardView>
    where
        Tz: TimeZone,
        R: Rng + ?Sized,
    {
        if ticket.version != self.version {
            tracing::debug!(
                ticket = ticket.version,
                latest = self.version,
                "Discarding superseded refresh"
            );
            return None;
        }
        let view = build_view(
            ticket.mode,
            &ticket.window,
            overview,
            orders,
            &self.excluded_referrers,
            now,
            rng,
        );
        tracing::info!(
            mode = ?view.mode,
            total_views = view.total_views,
            orders = orders.items.len(),
            sources = view.traffic_sources.len(),
            "Dashboard refreshed"
        );
        self.view = Some(view);
        self.view.as_ref()
    }

    /// Fetch and publish in one step over the current query window.
    ///
    /// Source errors are returned as-is.
    pub async fn refresh<S: TelemetrySource>(
        &mut self,
        source: &S,
    ) -> Result<Option<&DashboardView>, SourceError> {
        let ticket = self.begin_refresh();
        self.fetch_and_complete(source, ticket).await
    }

    /// Fetch and publish for a live tick. Stale ticks fetch nothing.
    pub async fn refresh_live<S: TelemetrySource>(
        &mut self,
        source: &S,
        tick: &LiveTick,
    ) -> Result<Option<&DashboardView>, SourceError> {
        match self.begin_live_refresh(tick) {
            Some(ticket) => self.fetch_and_complete(source, ticket).await,
            None => Ok(None),
        }
    }

    async fn fetch_and_complete<S: TelemetrySource>(
        &mut self,
        source: &S,
        ticket: RefreshTicket,
    ) -> Result<Option<&DashboardView>, SourceError> {
        let query = self.order_query(&ticket);
        let (overview, orders) = tokio::try_join!(
            source.engagement_overview(&ticket.window),
            source.orders(&query)
        )?;
        Ok(self.complete_refresh(&ticket, &overview, &orders))
    }

    /// Show or hide one traffic source on the per-day chart.
    pub fn toggle_traffic_source(&mut self, name: &str) -> bool {
        self.visibility.toggle(name)
    }

    /// Show every traffic source of the current view, or hide all of them if
    /// they are all shown already.
    pub fn toggle_all_traffic_sources(&mut self) {
        let available = self
            .view
            .as_ref()
            .map(|view| view.traffic_sources.as_slice())
            .unwrap_or_default();
        self.visibility
            .toggle_all(available.iter().map(|entry| entry.key.as_str()));
    }

    /// Per-day series restricted to visible traffic sources.
    pub fn visible_traffic_sources_by_date(&self) -> Vec<TimeSeriesPoint> {
        self.view.as_ref().map_or_else(Vec::new, |view| {
            self.visibility
                .retain_visible(&view.traffic_sources_by_date)
        })
    }

    fn issue(&mut self, window: TimeRange) -> RefreshTicket {
        self.version += 1;
        RefreshTicket {
            version: self.version,
            mode: self.controller.mode(),
            window,
        }
    }

    fn invalidate(&mut self) {
        self.version += 1;
        self.view = None;
    }
}
