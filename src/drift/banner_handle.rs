//! Banner Handle - async API for one mounted drift banner
//!
//! Moves a [`DriftBanner`] into its own tokio task. Host events and speed
//! changes arrive as [`BannerCommand`]s over an mpsc channel, snapshots go out
//! over a watch channel after every command, and `shutdown` stops the task.
//!

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::drift::controller::DriftBanner;
use crate::drift::engine::EngineSettings;
use crate::drift::{BannerEvent, DriftError, DriftSnapshot};
use crate::host::BannerParts;

/// Messages accepted by a running banner task
#[derive(Debug)]
pub enum BannerCommand {
    Event(BannerEvent),
    SetDriftSpeed(f64),
    Query(oneshot::Sender<DriftSnapshot>),
    Shutdown,
}

// Public handle for one banner running in its own task
#[derive(Debug)]
pub struct BannerHandle {
    command_sender: mpsc::Sender<BannerCommand>,
    snapshot_receiver: watch::Receiver<DriftSnapshot>,
    task_handle: Option<JoinHandle<()>>,
}

impl BannerHandle {
    /// Mounts the banner and spawns its event loop. Needs a tokio runtime.
    pub fn spawn(parts: BannerParts, settings: Option<EngineSettings>) -> Self {
        let mut banner = DriftBanner::mount(parts, settings);
        info!("Spawning drift banner task ({})", banner.status());

        let (command_sender, mut command_receiver) = mpsc::channel(256);
        let (snapshot_sender, snapshot_receiver) = watch::channel(banner.snapshot());
        debug!("Created command channel with buffer capacity 256");

        let task_handle = tokio::spawn(async move {
            while let Some(command) = command_receiver.recv().await {
                match command {
                    BannerCommand::Event(event) => banner.handle_event(event),
                    BannerCommand::SetDriftSpeed(seconds) => banner.set_drift_speed(seconds),
                    BannerCommand::Query(reply) => {
                        if reply.send(banner.snapshot()).is_err() {
                            debug!("Snapshot requester went away");
                        }
                        continue;
                    }
                    BannerCommand::Shutdown => {
                        info!("Shutdown requested for drift banner");
                        break;
                    }
                }

                // Receivers may all be gone; the banner keeps running regardless
                let _ = snapshot_sender.send(banner.snapshot());
            }
            debug!("Drift banner task finished ({})", banner.status());
        });

        Self {
            command_sender,
            snapshot_receiver,
            task_handle: Some(task_handle),
        }
    }

    /// Sender for host-side producers such as the frame clock
    pub fn sender(&self) -> mpsc::Sender<BannerCommand> {
        self.command_sender.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DriftSnapshot> {
        debug!("New subscriber to drift snapshots");
        self.snapshot_receiver.clone()
    }

    async fn send(&self, command: BannerCommand) -> Result<(), DriftError> {
        self.command_sender.send(command).await.map_err(|e| {
            error!("Failed to reach drift banner task: {}", e);
            DriftError::ChannelError(e.to_string())
        })
    }

    pub async fn dispatch(&self, event: BannerEvent) -> Result<(), DriftError> {
        self.send(BannerCommand::Event(event)).await
    }

    /// Host-facing speed control; invalid durations are dropped by the banner
    pub async fn set_drift_speed(&self, seconds: f64) -> Result<(), DriftError> {
        self.send(BannerCommand::SetDriftSpeed(seconds)).await
    }

    /// Snapshot taken after every command queued before this call
    pub async fn query(&self) -> Result<DriftSnapshot, DriftError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(BannerCommand::Query(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|e| DriftError::ChannelError(e.to_string()))
    }

    pub async fn shutdown(&mut self) -> Result<(), DriftError> {
        if self.command_sender.send(BannerCommand::Shutdown).await.is_err() {
            warn!("Drift banner task already terminated");
        }

        match self.task_handle.take() {
            Some(handle) => handle.await.map_err(|e| {
                error!("Drift banner task panicked: {}", e);
                DriftError::TaskError(e.to_string())
            }),
            None => {
                debug!("Drift banner already shut down");
                Ok(())
            }
        }
    }
}
