//! Drift controller with phantom-typed phases for the banner lifecycle
//!
//! # State Machine
//!
//! ```text
//!            reduced motion
//! mount ─────────────────────────────────────► Reduced (paused for good)
//!   │
//!   │ container + track present
//!   ▼
//! AwaitingImages ──── last image settled ────► Live
//!   (pause/resume only touch the              (pause/resume drive native
//!    native play state)                        or fallback animation)
//! ```
//!
//! Only the transitions drawn above exist as methods, so an invalid one does
//! not compile. [`DriftBanner`] wraps the phases so the host can feed events
//! without knowing the current one. A banner missing its container or track
//! mounts as [`DriftBanner::Disabled`].

use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, info, trace, warn};

use crate::drift::engine::{EngineSettings, FallbackEngine};
use crate::drift::interaction::InteractionState;
use crate::drift::mechanism::{self, AnimationMechanism};
use crate::drift::readiness::{ReadinessGate, Settle};
use crate::drift::{BannerEvent, BannerStatus, DriftError, DriftSnapshot};
use crate::host::{
    BannerParts, Container, FrameHandle, ImageId, ImageOutcome, InteractionKind, PlayState, Track,
};

/// Marker trait for controller phases
pub trait BannerPhase: fmt::Debug + Send + 'static {}

/// Listeners wired, images still loading
#[derive(Debug, Clone)]
pub struct AwaitingImages;
impl BannerPhase for AwaitingImages {}

/// Layout final, animation may run
#[derive(Debug, Clone)]
pub struct Live;
impl BannerPhase for Live {}

/// Reduced motion requested, never animates
#[derive(Debug, Clone)]
pub struct Reduced;
impl BannerPhase for Reduced {}

pub struct DriftController<S: BannerPhase> {
    // Kept for the banner's lifetime, it owns the event subscriptions
    container: Box<dyn Container>,
    track: Box<dyn Track>,
    engine: FallbackEngine,
    interaction: InteractionState,
    gate: ReadinessGate,
    _phase: PhantomData<S>,
}

impl<S: BannerPhase> DriftController<S> {
    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    pub fn engine(&self) -> &FallbackEngine {
        &self.engine
    }

    pub fn has_native_animation(&self) -> bool {
        mechanism::has_native_animation(self.track.as_ref())
    }

    /// Changes the half-loop duration; invalid values are ignored
    pub fn set_drift_speed(&mut self, seconds: f64) {
        match self.engine.configure_duration(self.track.as_mut(), seconds) {
            Ok(()) => debug!(
                "Drift speed now {:.3}px/s",
                self.engine.state().speed
            ),
            Err(e) => debug!("Ignoring drift speed change: {}", e),
        }
    }

    fn transition<N: BannerPhase>(self) -> DriftController<N> {
        DriftController {
            container: self.container,
            track: self.track,
            engine: self.engine,
            interaction: self.interaction,
            gate: self.gate,
            _phase: PhantomData,
        }
    }

    fn snapshot(&self, status: BannerStatus) -> DriftSnapshot {
        let state = self.engine.state();
        DriftSnapshot {
            status,
            interaction: self.interaction,
            mechanism: Some(AnimationMechanism::detect(self.track.as_ref())),
            running: state.running,
            offset: state.offset,
            loop_width: state.loop_width,
            speed: state.speed,
            frame_pending: state.frame_handle.is_some(),
        }
    }
}

impl DriftController<AwaitingImages> {
    pub fn create(
        container: Box<dyn Container>,
        track: Box<dyn Track>,
        engine: FallbackEngine,
    ) -> Self {
        debug!("Creating drift controller");
        Self {
            container,
            track,
            engine,
            interaction: InteractionState::Running,
            gate: ReadinessGate::default(),
            _phase: PhantomData,
        }
    }

    /// Subscribes to interactions and arms the readiness gate
    pub fn wire(mut self) -> Self {
        self.container.subscribe(&InteractionKind::ALL);
        self.gate = ReadinessGate::from_images(&self.track.images());
        self
    }

    /// Parks the banner for good when reduced motion is requested
    pub fn reduce(mut self) -> DriftController<Reduced> {
        info!("Reduced motion requested, drift banner stays paused");
        self.track.set_play_state(PlayState::Paused);
        self.interaction = InteractionState::Paused;
        self.transition()
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_open()
    }

    pub fn pending_images(&self) -> usize {
        self.gate.pending()
    }

    /// Interactions before readiness only touch the native play state; the
    /// fallback loop must not measure an unfinished layout.
    pub fn on_interaction(&mut self, kind: InteractionKind) {
        self.interaction = InteractionState::target_for(kind);
        debug!("{:?} while awaiting images -> {}", kind, self.interaction);
        match self.interaction {
            InteractionState::Paused => {
                AnimationMechanism::pause(self.track.as_mut(), &mut self.engine)
            }
            InteractionState::Running => self.track.set_play_state(PlayState::Running),
        }
    }

    pub fn on_image_settled(&mut self, image: &ImageId, outcome: ImageOutcome) -> Settle {
        self.gate.settle(image, outcome)
    }

    /// Opens the banner once every image has settled
    pub fn go_live(mut self) -> Result<DriftController<Live>, Self> {
        if !self.gate.take_ready() {
            return Err(self);
        }

        match (self.interaction, AnimationMechanism::detect(self.track.as_ref())) {
            (_, AnimationMechanism::Native) => {
                info!("Native animation detected, fallback engine stays idle")
            }
            (InteractionState::Paused, AnimationMechanism::Fallback) => {
                info!("Banner paused by interaction, fallback starts on next resume")
            }
            (InteractionState::Running, AnimationMechanism::Fallback) => {
                info!("No native animation, starting fallback drift");
                self.engine.start(self.track.as_mut());
            }
        }
        Ok(self.transition())
    }
}

impl DriftController<Live> {
    pub fn on_interaction(&mut self, kind: InteractionKind) {
        self.interaction = InteractionState::target_for(kind);
        debug!("{:?} -> {}", kind, self.interaction);
        match self.interaction {
            InteractionState::Paused => {
                AnimationMechanism::pause(self.track.as_mut(), &mut self.engine)
            }
            InteractionState::Running => {
                AnimationMechanism::resume(self.track.as_mut(), &mut self.engine);
            }
        }
    }

    pub fn on_frame(&mut self, handle: FrameHandle, timestamp_ms: f64) -> bool {
        self.engine.step(self.track.as_mut(), handle, timestamp_ms)
    }
}

impl DriftController<Reduced> {}

/// Runtime wrapper over the controller phases
pub enum DriftBanner {
    Disabled,
    Reduced(DriftController<Reduced>),
    AwaitingImages(DriftController<AwaitingImages>),
    Live(DriftController<Live>),
}

impl fmt::Debug for DriftBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DriftBanner").field(&self.status()).finish()
    }
}

impl DriftBanner {
    /// Mounts a banner on the host parts
    ///
    /// The reduced-motion preference is read once, before anything is wired.
    pub fn mount(parts: BannerParts, settings: Option<EngineSettings>) -> Self {
        let BannerParts {
            container,
            track,
            motion,
            scheduler,
        } = parts;

        let (container, track) = match (container, track) {
            (Some(container), Some(track)) => (container, track),
            (None, _) => {
                warn!("{}", DriftError::MissingElement("container"));
                return DriftBanner::Disabled;
            }
            (_, None) => {
                warn!("{}", DriftError::MissingElement("track"));
                return DriftBanner::Disabled;
            }
        };

        let reduced_motion = motion.prefers_reduced_motion().unwrap_or(false);
        let engine = FallbackEngine::new(scheduler, settings);

        if reduced_motion {
            let controller = DriftController::<AwaitingImages>::create(container, track, engine);
            return DriftBanner::Reduced(controller.reduce());
        }

        let controller = DriftController::<AwaitingImages>::create(container, track, engine).wire();
        info!(
            "Drift banner mounted, waiting on {} images",
            controller.pending_images()
        );
        Self::advance(controller)
    }

    fn advance(controller: DriftController<AwaitingImages>) -> Self {
        if !controller.is_ready() {
            return DriftBanner::AwaitingImages(controller);
        }
        match controller.go_live() {
            Ok(live) => DriftBanner::Live(live),
            Err(waiting) => DriftBanner::AwaitingImages(waiting),
        }
    }

    pub fn status(&self) -> BannerStatus {
        match self {
            DriftBanner::Disabled => BannerStatus::Disabled,
            DriftBanner::Reduced(_) => BannerStatus::Reduced,
            DriftBanner::AwaitingImages(_) => BannerStatus::AwaitingImages,
            DriftBanner::Live(_) => BannerStatus::Live,
        }
    }

    pub fn snapshot(&self) -> DriftSnapshot {
        let status = self.status();
        match self {
            DriftBanner::Disabled => DriftSnapshot::disabled(),
            DriftBanner::Reduced(c) => c.snapshot(status),
            DriftBanner::AwaitingImages(c) => c.snapshot(status),
            DriftBanner::Live(c) => c.snapshot(status),
        }
    }

    pub fn has_native_animation(&self) -> bool {
        match self {
            DriftBanner::Disabled => false,
            DriftBanner::Reduced(c) => c.has_native_animation(),
            DriftBanner::AwaitingImages(c) => c.has_native_animation(),
            DriftBanner::Live(c) => c.has_native_animation(),
        }
    }

    /// Host-facing speed control; invalid input is silently ignored
    pub fn set_drift_speed(&mut self, seconds: f64) {
        match self {
            DriftBanner::Disabled => debug!("Banner disabled, ignoring drift speed"),
            DriftBanner::Reduced(c) => c.set_drift_speed(seconds),
            DriftBanner::AwaitingImages(c) => c.set_drift_speed(seconds),
            DriftBanner::Live(c) => c.set_drift_speed(seconds),
        }
    }

    pub fn handle_event(&mut self, event: BannerEvent) {
        let banner = std::mem::replace(self, DriftBanner::Disabled);
        *self = match banner {
            DriftBanner::Disabled => {
                trace!("Banner disabled, dropping {:?}", event);
                DriftBanner::Disabled
            }
            DriftBanner::Reduced(c) => {
                trace!("Reduced motion, dropping {:?}", event);
                DriftBanner::Reduced(c)
            }
            DriftBanner::AwaitingImages(mut c) => match event {
                BannerEvent::Interaction(kind) => {
                    c.on_interaction(kind);
                    DriftBanner::AwaitingImages(c)
                }
                BannerEvent::ImageSettled { image, outcome } => {
                    match c.on_image_settled(&image, outcome) {
                        Settle::Opened => {
                            info!("All images settled");
                            Self::advance(c)
                        }
                        Settle::Pending(_) | Settle::Ignored => DriftBanner::AwaitingImages(c),
                    }
                }
                BannerEvent::Frame { handle, .. } => {
                    trace!("Frame {:?} before readiness ignored", handle);
                    DriftBanner::AwaitingImages(c)
                }
            },
            DriftBanner::Live(mut c) => {
                match event {
                    BannerEvent::Interaction(kind) => c.on_interaction(kind),
                    BannerEvent::Frame {
                        handle,
                        timestamp_ms,
                    } => {
                        c.on_frame(handle, timestamp_ms);
                    }
                    BannerEvent::ImageSettled { image, .. } => {
                        trace!("Image {} settled after readiness", image)
                    }
                }
                DriftBanner::Live(c)
            }
        };
    }
}
