use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use driftbanner::config::{BannerConfig, ScriptAction};
use driftbanner::drift::{BannerEvent, BannerHandle, DriftSnapshot};
use driftbanner::host::clock::FrameClock;
use driftbanner::host::sim::{SimContainer, SimMotion, SimScheduler};
use driftbanner::host::{BannerParts, Track};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(BannerConfig::default_path);
    let config = BannerConfig::load_or_default(config_path.as_deref())
        .map_err(|e| eyre!("Failed to load banner config: {}", e))?;
    debug!("Banner config: {:?}", config);

    run_simulation(config).await
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| Level::from_str(raw.trim()).ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn run_simulation(config: BannerConfig) -> Result<()> {
    let track = config.track.build();
    let container = SimContainer::new();
    let scheduler = SimScheduler::new();

    let parts = BannerParts {
        container: Some(Box::new(container.clone())),
        track: if config.missing_track {
            warn!("Simulating a page without drift track");
            None
        } else {
            Some(Box::new(track.clone()) as Box<dyn Track>)
        },
        motion: Box::new(SimMotion(config.reduced_motion)),
        scheduler: Box::new(scheduler.clone()),
    };

    let mut banner = BannerHandle::spawn(parts, Some(config.engine_settings()));
    let mut clock = FrameClock::spawn(
        scheduler.clone(),
        banner.sender(),
        Some(config.clock_settings()),
    );
    info!(
        "Simulation running for {}ms, container listening on {} channels",
        config.run_for_ms,
        container.subscriptions().len()
    );

    let started = Instant::now();
    for step in config.sorted_script() {
        time::sleep_until(started + Duration::from_millis(step.at_ms)).await;
        info!(
            "[{}] t+{}ms {:?}",
            Local::now().format("%H:%M:%S.%3f"),
            step.at_ms,
            step.action
        );

        match step.action {
            ScriptAction::Interact { kind } => {
                banner.dispatch(BannerEvent::Interaction(kind)).await?;
            }
            ScriptAction::SetSpeed { seconds } => {
                banner.set_drift_speed(seconds).await?;
            }
            ScriptAction::SettleImage { image, outcome } => {
                track.mark_image_complete(&image);
                banner
                    .dispatch(BannerEvent::ImageSettled { image, outcome })
                    .await?;
            }
        }
        log_snapshot(&banner.query().await?);
    }

    time::sleep_until(started + Duration::from_millis(config.run_for_ms)).await;
    let final_snapshot = banner.query().await?;
    log_snapshot(&final_snapshot);

    let frames = clock.stop().await?;
    banner.shutdown().await?;

    let track_state = track.snapshot();
    info!(
        "Simulation finished: {} frames, track at translateX({:.2}px), play state {}",
        frames, track_state.translate_x, track_state.play_state
    );
    Ok(())
}

fn log_snapshot(snapshot: &DriftSnapshot) {
    info!(
        "Banner {} / {} ({:?}): offset {:.2}px of {:.1}px at {:.3}px/s, frame pending: {}",
        snapshot.status,
        snapshot.interaction,
        snapshot.mechanism,
        snapshot.offset,
        snapshot.loop_width,
        snapshot.speed,
        snapshot.frame_pending
    );
}
