//! Readiness gate: a barrier over the images that still have to settle
//!
//! Loop-width measurement depends on final layout, so the fallback engine is
//! not started before every image in the track has loaded or failed. Several
//! images may share an id (the duplicated half of the strip); each copy has to
//! settle on its own.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::host::{ImageId, ImageOutcome, ImageStatus};

/// Result of feeding one settle notification into the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// The last pending image settled; the gate is open now
    Opened,
    /// Still waiting on this many images
    Pending(usize),
    /// Unknown or already settled image; nothing changed
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    // Outstanding settle notifications per image id
    pending: BTreeMap<ImageId, usize>,
    fired: bool,
}

impl ReadinessGate {
    /// Builds the gate from the images present at mount time
    ///
    /// Images flagged complete count as settled right away.
    pub fn from_images(images: &[ImageStatus]) -> Self {
        let mut pending: BTreeMap<ImageId, usize> = BTreeMap::new();
        for image in images.iter().filter(|image| !image.complete) {
            *pending.entry(image.id.clone()).or_default() += 1;
        }

        let gate = Self {
            pending,
            fired: false,
        };
        info!(
            "Readiness gate: {} images, {} still loading",
            images.len(),
            gate.pending()
        );
        gate
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.values().sum()
    }

    /// Claims the continuation. Returns `true` exactly once, after the gate
    /// has opened.
    pub fn take_ready(&mut self) -> bool {
        if self.is_open() && !self.fired {
            self.fired = true;
            true
        } else {
            false
        }
    }

    pub fn settle(&mut self, image: &ImageId, outcome: ImageOutcome) -> Settle {
        let Some(count) = self.pending.get_mut(image) else {
            debug!("Ignoring settle for {} ({:?})", image, outcome);
            return Settle::Ignored;
        };
        *count -= 1;
        if *count == 0 {
            self.pending.remove(image);
        }

        let remaining = self.pending();
        debug!(
            "Image {} settled ({:?}), {} remaining",
            image, outcome, remaining
        );
        if remaining == 0 {
            Settle::Opened
        } else {
            Settle::Pending(remaining)
        }
    }
}
