use storefront_insights::config::Config;
use storefront_insights::dashboard::live::LiveTick;
use storefront_insights::dashboard::{Dashboard, DashboardView};
use storefront_insights::ingest::source::JsonSnapshotSource;
use storefront_insights::query::timeseries::{Mode, TimeRange};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_insights=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        data_dir = %config.data_dir.display(),
        live = config.live,
        period = %config.period,
        "Starting storefront insights"
    );

    let now = chrono::Local::now();
    let selected = TimeRange::from_period(&config.period, &now).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to the 7d period");
        TimeRange::from_period("7d", &now).unwrap_or_else(|_| {
            let now = now.to_utc();
            TimeRange::new(now, now)
        })
    });

    let source = JsonSnapshotSource::new(&config.data_dir);
    let (mut dashboard, mut ticks) = Dashboard::new(&config, selected);

    if !config.live {
        match dashboard.refresh(&source).await {
            Ok(Some(view)) => print_view(view, true),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Refresh failed");
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = dashboard.set_mode(Mode::Live) {
        tracing::error!(error = %e, "Could not enter live mode");
        std::process::exit(1);
    }
    refresh_and_print(&mut dashboard, &source, None).await;

    loop {
        tokio::select! {
            Some(tick) = ticks.recv() => {
                refresh_and_print(&mut dashboard, &source, Some(tick)).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }
    dashboard.shutdown();
}

async fn refresh_and_print(
    dashboard: &mut Dashboard,
    source: &JsonSnapshotSource,
    tick: Option<LiveTick>,
) {
    let countdown = dashboard.countdown();
    let result = match tick {
        Some(tick) => dashboard.refresh_live(source, &tick).await,
        None => dashboard.refresh(source).await,
    };
    match result {
        Ok(Some(view)) => {
            tracing::debug!(countdown, "Live view updated");
            print_view(view, false);
        }
        Ok(None) => {}
        // Upstream failures are reported and the next tick tries again.
        Err(e) => tracing::error!(error = %e, "Refresh failed"),
    }
}

fn print_view(view: &DashboardView, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(view)
    } else {
        serde_json::to_string(view)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize view"),
    }
}
