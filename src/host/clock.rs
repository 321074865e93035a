//! Fixed-cadence frame clock
//!
//! Stands in for the display-refresh callback queue: on every tick it fires
//! the frames requested from a [`SimScheduler`] and forwards them to the
//! banner task with a millisecond timestamp relative to clock start.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::drift::{BannerCommand, BannerEvent, DriftError};
use crate::host::sim::SimScheduler;

#[derive(Clone, Debug)]
pub struct ClockSettings {
    pub frame_interval_ms: u64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            // ~60 Hz
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug)]
pub struct FrameClock {
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<u64>>,
}

impl FrameClock {
    pub fn spawn(
        scheduler: SimScheduler,
        banner_sender: mpsc::Sender<BannerCommand>,
        settings: Option<ClockSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        let interval_ms = settings.frame_interval_ms.max(1);
        info!("Starting frame clock at {}ms per frame", interval_ms);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task_handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut frames_fired = 0u64;

            'clock: loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Frame clock cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let timestamp_ms = started.elapsed().as_secs_f64() * 1000.0;
                        for handle in scheduler.take_due() {
                            let event = BannerEvent::Frame { handle, timestamp_ms };
                            if banner_sender.send(BannerCommand::Event(event)).await.is_err() {
                                warn!("Banner task gone, stopping frame clock");
                                break 'clock;
                            }
                            frames_fired += 1;
                        }
                    }
                }
            }

            info!("Frame clock stopped after {} frames", frames_fired);
            frames_fired
        });

        Self {
            cancel,
            task_handle: Some(task_handle),
        }
    }

    /// Stops the clock and returns how many frames it delivered
    pub async fn stop(&mut self) -> Result<u64, DriftError> {
        self.cancel.cancel();
        match self.task_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| DriftError::TaskError(e.to_string())),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::BannerHandle;
    use crate::host::sim::{SimContainer, SimMotion, SimTrack};
    use crate::host::BannerParts;

    #[tokio::test]
    async fn clock_drives_fallback_loop() {
        let track = SimTrack::new(20_000.0).with_duration_property("1s");
        let scheduler = SimScheduler::new();
        let mut banner = BannerHandle::spawn(
            BannerParts {
                container: Some(Box::new(SimContainer::new())),
                track: Some(Box::new(track.clone())),
                motion: Box::new(SimMotion(None)),
                scheduler: Box::new(scheduler.clone()),
            },
            None,
        );
        let mut clock = FrameClock::spawn(
            scheduler.clone(),
            banner.sender(),
            Some(ClockSettings {
                frame_interval_ms: 5,
            }),
        );

        let advanced = time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = banner.query().await.unwrap();
                if snapshot.offset > 0.0 {
                    return snapshot;
                }
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(advanced.offset < advanced.loop_width);
        assert!(track.snapshot().translate_x < 0.0);

        let frames = clock.stop().await.unwrap();
        assert!(frames >= 2);
        banner.shutdown().await.unwrap();
    }
}
