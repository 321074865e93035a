//! In-process host used by the simulator and the tests
//!
//! Every simulated element keeps its state behind `Arc<Mutex<_>>` so a clone
//! handed to the controller and a clone kept by the caller observe the same
//! element.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::{
    Container, FrameHandle, FrameScheduler, ImageId, ImageStatus, InteractionKind,
    MotionPreference, PlayState, Track,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observable state of a [`SimTrack`]
#[derive(Debug, Clone, PartialEq)]
pub struct SimTrackState {
    pub scroll_width: f64,
    pub animation_name: Option<String>,
    pub play_state: PlayState,
    pub duration_property: Option<String>,
    pub translate_x: f64,
    pub will_change: Option<String>,
    pub images: Vec<ImageStatus>,
    pub transform_writes: usize,
}

impl Default for SimTrackState {
    fn default() -> Self {
        Self {
            scroll_width: 0.0,
            animation_name: None,
            play_state: PlayState::Running,
            duration_property: None,
            translate_x: 0.0,
            will_change: None,
            images: Vec::new(),
            transform_writes: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimTrack {
    state: Arc<Mutex<SimTrackState>>,
}

impl SimTrack {
    pub fn new(scroll_width: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimTrackState {
                scroll_width,
                ..Default::default()
            })),
        }
    }

    pub fn with_native_animation(self, name: impl Into<String>) -> Self {
        lock(&self.state).animation_name = Some(name.into());
        self
    }

    pub fn with_duration_property(self, value: impl Into<String>) -> Self {
        lock(&self.state).duration_property = Some(value.into());
        self
    }

    pub fn with_image(self, id: impl Into<String>, complete: bool) -> Self {
        lock(&self.state).images.push(ImageStatus {
            id: ImageId(id.into()),
            complete,
        });
        self
    }

    /// Simulates a layout change, e.g. late-loading content
    pub fn set_scroll_width(&self, width: f64) {
        lock(&self.state).scroll_width = width;
    }

    /// Marks an image complete, as the host would before firing `load`
    pub fn mark_image_complete(&self, id: &ImageId) {
        let mut state = lock(&self.state);
        if let Some(image) = state.images.iter_mut().find(|image| &image.id == id) {
            image.complete = true;
        }
    }

    pub fn snapshot(&self) -> SimTrackState {
        lock(&self.state).clone()
    }
}

impl Track for SimTrack {
    fn scroll_width(&self) -> f64 {
        lock(&self.state).scroll_width
    }

    fn animation_name(&self) -> Option<String> {
        lock(&self.state).animation_name.clone()
    }

    fn set_play_state(&mut self, state: PlayState) {
        trace!("Track play state -> {}", state);
        lock(&self.state).play_state = state;
    }

    fn duration_property(&self) -> Option<String> {
        lock(&self.state).duration_property.clone()
    }

    fn set_duration_property(&mut self, value: &str) {
        debug!("Track duration property -> {}", value);
        lock(&self.state).duration_property = Some(value.to_string());
    }

    fn set_translate_x(&mut self, px: f64) {
        let mut state = lock(&self.state);
        state.translate_x = px;
        state.transform_writes += 1;
    }

    fn set_will_change(&mut self, hint: &str) {
        lock(&self.state).will_change = Some(hint.to_string());
    }

    fn images(&self) -> Vec<ImageStatus> {
        lock(&self.state).images.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimContainer {
    subscriptions: Arc<Mutex<Vec<InteractionKind>>>,
}

impl SimContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriptions(&self) -> Vec<InteractionKind> {
        lock(&self.subscriptions).clone()
    }

    pub fn is_subscribed(&self, kind: InteractionKind) -> bool {
        lock(&self.subscriptions).contains(&kind)
    }
}

impl Container for SimContainer {
    fn subscribe(&mut self, kinds: &[InteractionKind]) {
        debug!("Container subscribed to {:?}", kinds);
        lock(&self.subscriptions).extend_from_slice(kinds);
    }
}

/// Fixed motion preference; `None` models an environment without the query
#[derive(Debug, Clone, Copy, Default)]
pub struct SimMotion(pub Option<bool>);

impl MotionPreference for SimMotion {
    fn prefers_reduced_motion(&self) -> Option<bool> {
        self.0
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next_id: u64,
    pending: BTreeSet<FrameHandle>,
    requested: usize,
    cancelled: usize,
}

/// Frame scheduler whose pending requests are drained by a clock
#[derive(Debug, Clone, Default)]
pub struct SimScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl SimScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<FrameHandle> {
        lock(&self.state).pending.iter().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn requested_count(&self) -> usize {
        lock(&self.state).requested
    }

    pub fn cancelled_count(&self) -> usize {
        lock(&self.state).cancelled
    }

    /// Removes and returns every pending request; each fires once
    pub fn take_due(&self) -> Vec<FrameHandle> {
        std::mem::take(&mut lock(&self.state).pending)
            .into_iter()
            .collect()
    }
}

impl FrameScheduler for SimScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = FrameHandle(state.next_id);
        state.pending.insert(handle);
        state.requested += 1;
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = lock(&self.state);
        if state.pending.remove(&handle) {
            state.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_fires_each_request_once() {
        let mut scheduler = SimScheduler::new();
        let first = scheduler.request_frame();
        let second = scheduler.request_frame();
        assert_ne!(first, second);

        assert_eq!(scheduler.take_due(), vec![first, second]);
        assert!(scheduler.take_due().is_empty());
    }

    #[test]
    fn cancelling_unknown_handle_is_harmless() {
        let mut scheduler = SimScheduler::new();
        let handle = scheduler.request_frame();
        scheduler.cancel_frame(handle);
        scheduler.cancel_frame(handle);

        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.cancelled_count(), 1);
    }

    #[test]
    fn track_clones_share_state() {
        let track = SimTrack::new(400.0).with_image("a", false);
        let mut other = track.clone();
        other.set_translate_x(-12.0);
        track.mark_image_complete(&ImageId::from("a"));

        let snapshot = track.snapshot();
        assert_eq!(snapshot.translate_x, -12.0);
        assert_eq!(snapshot.transform_writes, 1);
        assert!(snapshot.images[0].complete);
    }
}
