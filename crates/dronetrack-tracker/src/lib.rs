//! Dronetrack tracker - drives a tracking session in real time.
//!
//! Owns the playback and polling timers, talks to the order store, and
//! fans status changes out to other views of the same order.

pub mod config;
pub mod error;
pub mod notify;
pub mod timer;
pub mod tracker;

pub use error::TrackerError;
pub use notify::{LocalStatusBus, StatusNotifier};
pub use timer::TimerGuard;
pub use tracker::{PlaybackStart, Tracker, Viewer};
