//! Fallback drift engine
//!
//! Drives the track by hand when no native animation is attached. The engine
//! integrates elapsed frame time instead of stepping a fixed amount, so the
//! visual speed stays the same under a variable frame rate.
//!
//! ```text
//! start() ──► request_frame ──► step(ts) ──► request_frame ──► step(ts) ...
//!                                   │
//!                          offset += speed * dt
//!                          offset %= loop_width
//!                          translateX(-offset)
//! ```

use tracing::{debug, info, trace};

use crate::drift::error::DriftError;
use crate::host::{FrameHandle, FrameScheduler, Track};

/// Half-loop duration used when the track does not configure one
pub const DEFAULT_DURATION_SECS: f64 = 28.0;

/// Rendering hint set on the track before the first frame
pub const WILL_CHANGE_HINT: &str = "transform";

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub default_duration_secs: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

/// Mutable state of one fallback loop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriftState {
    pub running: bool,
    /// Current offset in pixels, within `[0, loop_width)` once wrapped
    pub offset: f64,
    pub loop_width: f64,
    /// Pixels per second
    pub speed: f64,
    pub last_frame_ms: Option<f64>,
    pub frame_handle: Option<FrameHandle>,
}

/// Parses a leading decimal number the way CSS time strings are read
///
/// `"28s"` gives 28, `" 2.5s "` gives 2.5, `"fast"` gives `None`.
pub fn parse_duration_seconds(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .map(|(idx, c)| idx + c.len_utf8())
        .last()
        .unwrap_or(0);

    // Longest prefix that is a valid number wins ("1.5e" -> 1.5)
    (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Duration from a raw track property, falling back to `default_secs`
pub fn resolve_duration(raw: Option<&str>, default_secs: f64) -> f64 {
    match raw.and_then(parse_duration_seconds) {
        Some(secs) if secs > 0.0 => secs,
        _ => default_secs,
    }
}

/// Loop width for a track holding its content twice
pub fn loop_width_for(scroll_width: f64) -> f64 {
    if !scroll_width.is_finite() || scroll_width <= 0.0 {
        return 0.0;
    }
    let half = scroll_width / 2.0;
    if half > 0.0 {
        half
    } else {
        scroll_width
    }
}

/// Pixels per second covering `loop_width` in `duration_secs`
pub fn speed_for(loop_width: f64, duration_secs: f64) -> f64 {
    if loop_width <= 0.0 || duration_secs <= 0.0 {
        return 0.0;
    }
    let speed = loop_width / duration_secs;
    if speed.is_finite() {
        speed
    } else {
        0.0
    }
}

/// Keeps the offset in `[0, loop_width)`; a collapsed loop resets it to 0
fn wrap_offset(offset: f64, loop_width: f64) -> f64 {
    if !offset.is_finite() || loop_width <= 0.0 {
        return 0.0;
    }
    offset % loop_width
}

pub struct FallbackEngine {
    state: DriftState,
    scheduler: Box<dyn FrameScheduler>,
    settings: EngineSettings,
}

impl FallbackEngine {
    pub fn new(scheduler: Box<dyn FrameScheduler>, settings: Option<EngineSettings>) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating fallback engine with settings: {:?}", settings);
        Self {
            state: DriftState::default(),
            scheduler,
            settings,
        }
    }

    pub fn state(&self) -> &DriftState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn duration_from(&self, track: &dyn Track) -> f64 {
        resolve_duration(
            track.duration_property().as_deref(),
            self.settings.default_duration_secs,
        )
    }

    /// Re-measures the track and recomputes loop width and speed
    fn remeasure(&mut self, track: &dyn Track, duration_secs: f64) {
        self.state.loop_width = loop_width_for(track.scroll_width());
        self.state.speed = speed_for(self.state.loop_width, duration_secs);
        self.state.offset = wrap_offset(self.state.offset, self.state.loop_width);
        debug!(
            "Measured loop width {:.1}px, speed {:.3}px/s ({}s per loop)",
            self.state.loop_width, self.state.speed, duration_secs
        );
    }

    /// Sets the half-loop duration and recomputes speed right away
    pub fn configure_duration(
        &mut self,
        track: &mut dyn Track,
        seconds: f64,
    ) -> Result<(), DriftError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(DriftError::InvalidDuration(seconds));
        }

        info!("Configuring drift duration: {}s", seconds);
        track.set_duration_property(&format!("{}s", seconds));
        self.remeasure(track, seconds);
        Ok(())
    }

    /// Starts (or restarts) the loop. Any in-flight frame is cancelled first.
    pub fn start(&mut self, track: &mut dyn Track) {
        self.stop();

        let duration_secs = self.duration_from(track);
        self.remeasure(track, duration_secs);
        track.set_will_change(WILL_CHANGE_HINT);

        self.state.last_frame_ms = None;
        self.state.frame_handle = Some(self.scheduler.request_frame());
        self.state.running = true;
        info!(
            "Fallback drift started at {:.3}px/s over {:.1}px",
            self.state.speed, self.state.loop_width
        );
    }

    /// Cancels the pending frame and clears the timing baseline
    pub fn stop(&mut self) {
        if let Some(handle) = self.state.frame_handle.take() {
            debug!("Cancelling frame {:?}", handle);
            self.scheduler.cancel_frame(handle);
        }
        self.state.last_frame_ms = None;
        if self.state.running {
            info!("Fallback drift stopped at offset {:.1}px", self.state.offset);
        }
        self.state.running = false;
    }

    /// Advances the loop for a delivered frame
    ///
    /// Returns `false` when the handle is not the one currently scheduled; such
    /// frames are left untouched. A frame with a non-finite timestamp keeps the
    /// loop alive but leaves the offset and the timing baseline alone.
    pub fn step(&mut self, track: &mut dyn Track, handle: FrameHandle, timestamp_ms: f64) -> bool {
        if self.state.frame_handle != Some(handle) {
            trace!("Ignoring stale frame {:?}", handle);
            return false;
        }

        if !timestamp_ms.is_finite() {
            debug!("Frame {:?} has no usable timestamp ({})", handle, timestamp_ms);
            self.state.frame_handle = Some(self.scheduler.request_frame());
            return true;
        }

        let last = *self.state.last_frame_ms.get_or_insert(timestamp_ms);
        let elapsed_secs = ((timestamp_ms - last) / 1000.0).max(0.0);
        self.state.last_frame_ms = Some(timestamp_ms);

        self.state.offset = wrap_offset(
            self.state.offset + self.state.speed * elapsed_secs,
            self.state.loop_width,
        );
        track.set_translate_x(-self.state.offset);
        trace!(
            "Frame {:?}: dt={:.4}s offset={:.2}px",
            handle,
            elapsed_secs,
            self.state.offset
        );

        self.state.frame_handle = Some(self.scheduler.request_frame());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{SimScheduler, SimTrack};

    fn engine_with(scheduler: &SimScheduler) -> FallbackEngine {
        FallbackEngine::new(Box::new(scheduler.clone()), None)
    }

    fn current_handle(engine: &FallbackEngine) -> FrameHandle {
        engine.state().frame_handle.expect("frame scheduled")
    }

    #[test]
    fn parses_css_time_strings() {
        assert_eq!(parse_duration_seconds("28s"), Some(28.0));
        assert_eq!(parse_duration_seconds("  2.5s "), Some(2.5));
        assert_eq!(parse_duration_seconds("1.5e"), Some(1.5));
        assert_eq!(parse_duration_seconds("-3s"), Some(-3.0));
        assert_eq!(parse_duration_seconds("fast"), None);
        assert_eq!(parse_duration_seconds(""), None);
    }

    #[test]
    fn resolves_default_for_bad_durations() {
        assert_eq!(resolve_duration(None, 28.0), 28.0);
        assert_eq!(resolve_duration(Some("abc"), 28.0), 28.0);
        assert_eq!(resolve_duration(Some("0s"), 28.0), 28.0);
        assert_eq!(resolve_duration(Some("-4s"), 28.0), 28.0);
        assert_eq!(resolve_duration(Some("12s"), 28.0), 12.0);
    }

    #[test]
    fn loop_width_is_half_of_duplicated_content() {
        assert_eq!(loop_width_for(600.0), 300.0);
        assert_eq!(loop_width_for(0.0), 0.0);
        assert_eq!(loop_width_for(f64::NAN), 0.0);
        assert_eq!(speed_for(0.0, 10.0), 0.0);
    }

    #[test]
    fn configure_duration_sets_exact_speed() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0);

        for seconds in [0.5, 3.0, 10.0, 28.0, 123.456] {
            engine.configure_duration(&mut track, seconds).unwrap();
            assert_eq!(engine.state().speed, engine.state().loop_width / seconds);
        }
        assert_eq!(track.snapshot().duration_property.as_deref(), Some("123.456s"));
    }

    #[test]
    fn configure_duration_rejects_invalid_values() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);
        let before = engine.state().clone();

        for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine.configure_duration(&mut track, seconds),
                Err(DriftError::InvalidDuration(_))
            ));
        }
        assert_eq!(engine.state(), &before);
        assert_eq!(track.snapshot().duration_property.as_deref(), Some("10s"));
    }

    #[test]
    fn start_reads_track_duration_and_sets_hint() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");

        engine.start(&mut track);

        assert!(engine.is_running());
        assert_eq!(engine.state().loop_width, 300.0);
        assert_eq!(engine.state().speed, 30.0);
        assert_eq!(track.snapshot().will_change.as_deref(), Some("transform"));
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn start_falls_back_to_default_duration() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(560.0).with_duration_property("none");

        engine.start(&mut track);

        assert_eq!(engine.state().speed, 280.0 / DEFAULT_DURATION_SECS);
    }

    #[test]
    fn start_twice_leaves_one_pending_frame() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0);

        engine.start(&mut track);
        let first = current_handle(&engine);
        engine.start(&mut track);

        assert_eq!(scheduler.pending_count(), 1);
        assert_ne!(current_handle(&engine), first);
        assert!(!engine.step(&mut track, first, 100.0));
    }

    #[test]
    fn stop_is_idempotent() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0);

        engine.stop();
        engine.start(&mut track);
        engine.stop();
        let once = engine.state().clone();
        engine.stop();

        assert_eq!(engine.state(), &once);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.cancelled_count(), 1);
        assert!(once.frame_handle.is_none());
        assert!(once.last_frame_ms.is_none());
    }

    #[test]
    fn two_second_gap_advances_sixty_pixels() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);

        // First frame only sets the baseline
        assert!(engine.step(&mut track, current_handle(&engine), 1_000.0));
        assert_eq!(engine.state().offset, 0.0);

        assert!(engine.step(&mut track, current_handle(&engine), 3_000.0));
        assert_eq!(engine.state().offset, 60.0);
        assert_eq!(track.snapshot().translate_x, -60.0);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn large_gap_wraps_more_than_once() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);

        engine.step(&mut track, current_handle(&engine), 0.0);
        // 25 seconds at 30px/s = 750px = 2.5 loops
        engine.step(&mut track, current_handle(&engine), 25_000.0);

        assert_eq!(engine.state().offset, 150.0);
    }

    #[test]
    fn offset_stays_within_loop_for_any_gap() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(1_000.0).with_duration_property("7s");
        engine.start(&mut track);

        let mut ts = 0.0;
        for gap in [0.0, 16.7, 33.3, 999.0, 7_000.0, 14_000.0, 123_456.7, 5.0] {
            ts += gap;
            engine.step(&mut track, current_handle(&engine), ts);
            let state = engine.state();
            assert!(state.offset >= 0.0 && state.offset < state.loop_width);
        }
    }

    #[test]
    fn backwards_clock_does_not_rewind() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);

        engine.step(&mut track, current_handle(&engine), 5_000.0);
        engine.step(&mut track, current_handle(&engine), 6_000.0);
        engine.step(&mut track, current_handle(&engine), 4_000.0);

        assert_eq!(engine.state().offset, 30.0);
    }

    #[test]
    fn zero_width_never_advances() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(0.0);
        engine.start(&mut track);

        engine.step(&mut track, current_handle(&engine), 0.0);
        engine.step(&mut track, current_handle(&engine), 10_000.0);

        assert_eq!(engine.state().speed, 0.0);
        assert_eq!(engine.state().offset, 0.0);
    }

    #[test]
    fn shrinking_track_rewraps_offset_on_restart() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);
        engine.step(&mut track, current_handle(&engine), 0.0);
        engine.step(&mut track, current_handle(&engine), 9_000.0);
        assert_eq!(engine.state().offset, 270.0);

        track.set_scroll_width(400.0);
        engine.start(&mut track);

        assert_eq!(engine.state().loop_width, 200.0);
        assert_eq!(engine.state().offset, 70.0);
    }

    #[test]
    fn collapsed_track_resets_offset() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);
        engine.step(&mut track, current_handle(&engine), 0.0);
        engine.step(&mut track, current_handle(&engine), 4_000.0);
        assert_eq!(engine.state().offset, 120.0);

        track.set_scroll_width(0.0);
        engine.start(&mut track);
        assert_eq!(engine.state().loop_width, 0.0);
        assert_eq!(engine.state().offset, 0.0);

        engine.step(&mut track, current_handle(&engine), 5_000.0);
        engine.step(&mut track, current_handle(&engine), 6_000.0);
        assert_eq!(engine.state().offset, 0.0);
        assert_eq!(track.snapshot().translate_x, 0.0);
    }

    #[test]
    fn nan_timestamp_does_not_freeze_the_loop() {
        let scheduler = SimScheduler::new();
        let mut engine = engine_with(&scheduler);
        let mut track = SimTrack::new(600.0).with_duration_property("10s");
        engine.start(&mut track);

        assert!(engine.step(&mut track, current_handle(&engine), f64::NAN));
        assert!(engine.state().last_frame_ms.is_none());
        assert_eq!(scheduler.pending_count(), 1);

        engine.step(&mut track, current_handle(&engine), 1_000.0);
        engine.step(&mut track, current_handle(&engine), f64::INFINITY);
        assert_eq!(engine.state().last_frame_ms, Some(1_000.0));
        engine.step(&mut track, current_handle(&engine), 2_000.0);

        assert_eq!(engine.state().offset, 30.0);
        assert_eq!(track.snapshot().translate_x, -30.0);
    }
}
