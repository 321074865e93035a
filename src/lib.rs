//! Drift banner controller
//!
//! A horizontally looping strip of duplicated content that pauses on hover,
//! focus or touch, honours a reduced-motion preference, and drives the motion
//! by hand when the host has no native animation attached.
//!
//! The host environment is reached only through the traits in [`host`]; the
//! animation logic lives in [`drift`].

pub mod config;
pub mod drift;
pub mod host;
