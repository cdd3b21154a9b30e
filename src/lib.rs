//! Receiver-side pipeline for real-time multichannel PCM audio carried
//! over RTP/RTCP, with FEC recovery, jitter buffering, multi-session
//! mixing, and resampling synced to a playback clock.
//!
//! The crate does not own any sockets, FEC math, RTP payload codecs, or
//! a CLI/config-file loader — those are external collaborators that
//! feed [`packet::Packet`]s in and pull [`audio::frame::Frame`]s out.
//! See `SPEC_FULL.md` for the full system description.

pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod netio;
pub mod packet;
pub mod pipeline;
pub mod pool;
pub mod receiver;
pub mod session;
pub mod slot;
pub mod state;
pub mod stats;

pub use error::{Status, StatusResult};
pub use receiver::{ReadMode, ReceiverSource, ReceiverState};

#[cfg(test)]
mod integration_tests;
