use crate::config::Config;
use crate::errors::LiveModeError;
use crate::query::timeseries::{Mode, TimeRange};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Timing of live mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    /// Length of the rolling window.
    pub window: TimeDelta,
    /// Cadence of the data refresh trigger.
    pub refresh_every: Duration,
    /// Value the on-screen countdown restarts from.
    pub countdown_from: u32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            window: TimeDelta::minutes(30),
            refresh_every: Duration::from_secs(10),
            countdown_from: 10,
        }
    }
}

impl LiveSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window: TimeDelta::minutes(i64::from(config.live_window_mins.max(1))),
            refresh_every: Duration::from_secs(config.refresh_interval_secs.max(1)),
            countdown_from: config.countdown_secs.max(1),
        }
    }
}

/// A refresh request produced by the live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveTick {
    /// Controller generation that started the timer.
    pub generation: u64,
    /// Fresh `[now - window, now]` computed at tick time.
    pub window: TimeRange,
}

/// Receiving end of the live refresh trigger.
///
/// Holds only the newest tick: a tick not received before the next one fires
/// is replaced, never queued.
pub struct LiveTicks {
    rx: watch::Receiver<Option<LiveTick>>,
}

impl LiveTicks {
    /// Wait for a tick newer than the last one received. Returns `None` once
    /// the controller and its timers are gone.
    pub async fn recv(&mut self) -> Option<LiveTick> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(tick) = *self.rx.borrow_and_update() {
                return Some(tick);
            }
        }
    }

    /// The newest tick not yet received, without waiting.
    pub fn try_recv(&mut self) -> Option<LiveTick> {
        if self.rx.has_changed().unwrap_or(false) {
            *self.rx.borrow_and_update()
        } else {
            None
        }
    }
}

/// The two repeating live-mode tasks. Dropping this aborts both.
struct LiveTimers {
    refresh: JoinHandle<()>,
    countdown: JoinHandle<()>,
}

impl Drop for LiveTimers {
    fn drop(&mut self) {
        self.refresh.abort();
        self.countdown.abort();
    }
}

/// Owns the live/historical flag, the active query window and the live
/// timers.
///
/// While live, a refresh task sends a [`LiveTick`] every `refresh_every`
/// and a separate task steps the cosmetic countdown once per second. Both
/// are aborted on any mode change and when the controller is dropped.
pub struct LiveModeController {
    mode: Mode,
    selected: TimeRange,
    settings: LiveSettings,
    generation: u64,
    countdown: Arc<Mutex<u32>>,
    ticks: Arc<watch::Sender<Option<LiveTick>>>,
    timers: Option<LiveTimers>,
}

impl LiveModeController {
    /// Create a controller in historical mode over `selected`.
    ///
    /// The receiver yields the live refresh ticks.
    pub fn new(settings: LiveSettings, selected: TimeRange) -> (Self, LiveTicks) {
        let (ticks, rx) = watch::channel(None);
        let controller = Self {
            mode: Mode::Historical,
            selected,
            settings,
            generation: 0,
            countdown: Arc::new(Mutex::new(settings.countdown_from)),
            ticks: Arc::new(ticks),
            timers: None,
        };
        (controller, LiveTicks { rx })
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    /// Bumped on every mode change; ticks from older generations are stale.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn timers_running(&self) -> bool {
        self.timers.is_some()
    }

    /// Switch mode. Switching to live starts both timers; switching to
    /// historical stops them and restores the last selected range.
    ///
    /// Re-selecting the current mode does nothing.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), LiveModeError> {
        if mode == self.mode {
            return Ok(());
        }
        let generation = self.generation + 1;
        let timers = match mode {
            Mode::Live => Some(self.start_timers(generation)?),
            Mode::Historical => None,
        };
        self.timers = timers;
        self.generation = generation;
        self.mode = mode;
        tracing::info!(?mode, generation = self.generation, "Dashboard mode changed");
        Ok(())
    }

    /// Remember a user-chosen historical range.
    ///
    /// Takes effect immediately in historical mode and on the next switch
    /// back otherwise.
    pub fn select_range(&mut self, range: TimeRange) {
        self.selected = range;
    }

    pub const fn selected_range(&self) -> TimeRange {
        self.selected
    }

    /// The window the next fetch should cover.
    pub fn query_window(&self) -> TimeRange {
        self.query_window_at(Utc::now())
    }

    /// Like [`Self::query_window`], with an explicit clock.
    pub fn query_window_at(&self, now: DateTime<Utc>) -> TimeRange {
        match self.mode {
            Mode::Live => TimeRange::live_window(now, self.settings.window),
            Mode::Historical => self.selected,
        }
    }

    /// Seconds shown on the countdown badge.
    pub fn countdown(&self) -> u32 {
        *self.countdown.lock()
    }

    /// Whether `tick` was produced by the timers currently running.
    pub fn is_current(&self, tick: &LiveTick) -> bool {
        self.mode == Mode::Live && tick.generation == self.generation
    }

    /// Stop the timers without changing mode, e.g. on teardown.
    pub fn shutdown(&mut self) {
        if self.timers.take().is_some() {
            tracing::debug!(generation = self.generation, "Live timers stopped");
        }
    }

    fn start_timers(&self, generation: u64) -> Result<LiveTimers, LiveModeError> {
        let handle = Handle::try_current().map_err(|_| LiveModeError::NoRuntime)?;
        let settings = self.settings;
        *self.countdown.lock() = settings.countdown_from;

        let ticks = Arc::clone(&self.ticks);
        let refresh_start = Instant::now() + settings.refresh_every;
        let refresh = handle.spawn(async move {
            let mut interval = interval_at(refresh_start, settings.refresh_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let tick = LiveTick {
                    generation,
                    window: TimeRange::live_window(Utc::now(), settings.window),
                };
                tracing::debug!(generation, "Live refresh tick");
                if ticks.send(Some(tick)).is_err() {
                    break;
                }
            }
        });

        let remaining = Arc::clone(&self.countdown);
        let countdown_start = Instant::now() + COUNTDOWN_STEP;
        let countdown = handle.spawn(async move {
            let mut interval = interval_at(countdown_start, COUNTDOWN_STEP);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                step_countdown(&remaining, settings.countdown_from);
            }
        });

        tracing::debug!(generation, "Live timers started");
        Ok(LiveTimers { refresh, countdown })
    }
}

fn step_countdown(remaining: &Mutex<u32>, restart_from: u32) {
    let mut remaining = remaining.lock();
    *remaining = if *remaining <= 1 {
        restart_from
    } else {
        *remaining - 1
    };
}
