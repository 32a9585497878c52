use crate::errors::PeriodError;
use crate::ingest::records::OrderRecord;
use crate::query::aggregate::AggregatedEntry;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const DAY_MS: i64 = 86_400_000;

/// Dashboard time mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rolling window, re-polled on a timer.
    Live,
    /// Explicit user-selected range, bucketed by day.
    #[default]
    Historical,
}

/// A time range, inclusive of both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The rolling window `[now - window, now]`.
    pub fn live_window(now: DateTime<Utc>, window: TimeDelta) -> Self {
        Self {
            start: now - window,
            end: now,
        }
    }

    /// Resolve a named reporting period to whole days ending today, with day
    /// boundaries at midnight in `now`'s time zone.
    ///
    /// `7d` covers the seven days before today plus today itself, so it
    /// yields eight day buckets.
    pub fn from_period<Tz: TimeZone>(
        period: &str,
        now: &DateTime<Tz>,
    ) -> Result<Self, PeriodError> {
        let back = match period {
            "day" | "today" => 0,
            "7d" => 7,
            "30d" => 30,
            "90d" => 90,
            _ => return Err(PeriodError(period.to_string())),
        };
        let tz = now.timezone();
        let today = now.date_naive();
        let start = today.checked_sub_days(Days::new(back)).unwrap_or(today);
        Ok(Self {
            start: local_midnight(&tz, start),
            end: local_midnight(&tz, today),
        })
    }

    /// Number of day buckets: `ceil((end - start) / 1 day) + 1`.
    ///
    /// `start == end` is one day. Inverted ranges are clamped to one day.
    pub fn days(&self) -> u64 {
        let ms = (self.end - self.start).num_milliseconds();
        // Truncating division rounds toward zero, which is the ceiling for
        // negative spans.
        let whole = ms / DAY_MS;
        let ceil = if ms % DAY_MS > 0 { whole + 1 } else { whole };
        u64::try_from(ceil + 1).unwrap_or(0).max(1)
    }

    /// Whether `at` lies within the range, endpoints included.
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start <= *at && *at <= self.end
    }

    /// The same range with `end` pushed to the last instant of its calendar
    /// day in `tz`.
    ///
    /// Historical ranges mark days, so fetches must cover all of the final
    /// day.
    pub fn through_end_of_day<Tz: TimeZone>(&self, tz: &Tz) -> Self {
        let next_day = self
            .end
            .with_timezone(tz)
            .date_naive()
            .checked_add_days(Days::new(1))
            .map_or(self.end, |date| local_midnight(tz, date));
        Self {
            start: self.start,
            end: (next_day - TimeDelta::milliseconds(1)).max(self.end),
        }
    }
}

/// First instant of `date` in `tz`. A midnight skipped by a DST jump falls
/// back to the same wall-clock time read as UTC.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map_or_else(|| midnight.and_utc(), |at| at.with_timezone(&Utc))
}

/// One point of the orders / traffic chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub date_key: String,
    pub orders: u64,
    /// Per-channel values keyed by channel name.
    #[serde(flatten)]
    pub channels: BTreeMap<String, u64>,
    /// Channel values are a display estimate derived from range totals, not
    /// measured per-day data.
    pub is_estimated: bool,
}

/// Build the chart series for the current mode.
///
/// Historical mode pre-seeds one bucket per day ending at `now`'s calendar
/// date, counts each order into the bucket of its calendar date in `now`'s
/// time zone (orders outside the seeded days are dropped), and fills every
/// channel with an estimate spread from its range total.
///
/// Live mode produces a single point for the current instant when there are
/// orders, and no channel estimates.
pub fn align<Tz, R>(
    mode: Mode,
    range: Option<&TimeRange>,
    orders: &[OrderRecord],
    channel_totals: &[AggregatedEntry],
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Vec<TimeSeriesPoint>
where
    Tz: TimeZone,
    R: Rng + ?Sized,
{
    match mode {
        Mode::Live => live_point(orders, now).into_iter().collect(),
        Mode::Historical => range.map_or_else(Vec::new, |range| {
            daily_points(range.days(), orders, channel_totals, now, rng)
        }),
    }
}

fn live_point<Tz: TimeZone>(
    orders: &[OrderRecord],
    now: &DateTime<Tz>,
) -> Option<TimeSeriesPoint> {
    if orders.is_empty() {
        return None;
    }
    Some(TimeSeriesPoint {
        date_key: now.naive_local().format("%H:%M:%S").to_string(),
        orders: orders.len() as u64,
        channels: BTreeMap::new(),
        is_estimated: false,
    })
}

fn daily_points<Tz, R>(
    days: u64,
    orders: &[OrderRecord],
    channel_totals: &[AggregatedEntry],
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Vec<TimeSeriesPoint>
where
    Tz: TimeZone,
    R: Rng + ?Sized,
{
    let today = now.date_naive();
    // Days before the earliest representable date can never hold a bucket.
    let representable =
        u64::try_from((today - NaiveDate::MIN).num_days()).map_or(1, |back| back + 1);
    let dates: Vec<NaiveDate> = (0..days.min(representable))
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect();

    let slots: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, date)| (*date, i)).collect();
    let mut counts = vec![0u64; dates.len()];
    let tz = now.timezone();
    for order in orders {
        let local_date = order.created_at.with_timezone(&tz).date_naive();
        if let Some(&slot) = slots.get(&local_date) {
            counts[slot] += 1;
        }
    }

    dates
        .iter()
        .zip(counts)
        .map(|(date, orders)| {
            let channels: BTreeMap<String, u64> = channel_totals
                .iter()
                .map(|entry| (entry.key.clone(), estimate_daily(entry.count, days, rng)))
                .collect();
            TimeSeriesPoint {
                date_key: date.format("%Y-%m-%d").to_string(),
                orders,
                is_estimated: !channels.is_empty(),
                channels,
            }
        })
        .collect()
}

/// `floor(total / days)` plus a random bump in `[0, floor(baseline / 2))`.
fn estimate_daily<R: Rng + ?Sized>(total: u64, days: u64, rng: &mut R) -> u64 {
    let baseline = total / days.max(1);
    let spread = baseline / 2;
    if spread == 0 {
        baseline
    } else {
        baseline + rng.random_range(0..spread)
    }
}
