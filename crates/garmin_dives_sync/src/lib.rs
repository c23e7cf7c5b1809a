//! Incremental import of Garmin Connect dives into a Payload CMS collection.
//!
//! A run reads the newest stored `startTimeGMT`, fetches Garmin activities
//! from two days before it (or over a lookback window on an empty
//! collection), keeps the dives, normalizes them, optionally attaches tank
//! pressure from the device FIT file, and creates one document per dive.
//! Writes are keyed by `garminActivityId`, so reruns are harmless.

pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod observability;
pub mod session;
pub mod sync;
pub mod telemetry;
pub mod transforms;
pub mod units;

#[cfg(test)]
mod test_utils;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use sync::{DiveSync, SyncOptions, SyncReport};
