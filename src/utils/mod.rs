//! Utility functions and helpers
//!
//! This module contains the clock abstraction and timestamp helpers.

pub mod time;

pub use time::{from_millis, local_midnight, to_millis, Clock, ManualClock, SystemClock};
