//! Status taxonomy shared by every component (spec §7).
//!
//! Parse errors are always local (log + drop) and never reach this type;
//! `Status` is for operations that have a caller able to act on failure.

use thiserror::Error;

/// Uniform result alias used across the crate's public operations.
pub type StatusResult<T> = Result<T, Status>;

/// Status codes propagated by return value, per spec.md §7.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Object not yet initialized, already closed, or in a `Broken` state.
    #[error("bad state: {0}")]
    BadState(&'static str),

    /// Allocation failed; caller may retry or fail upstream.
    #[error("out of memory: {0}")]
    NoMem(&'static str),

    /// Router could not satisfy an add/link due to a conflict.
    #[error("no route: {0}")]
    NoRoute(&'static str),

    /// Parse/validation failed. Normally absorbed and counted locally;
    /// this variant exists for call sites that need to report it (e.g.
    /// tests), not for the hot packet path.
    #[error("bad packet: {0}")]
    BadPacket(&'static str),

    /// Session watchdog decided to stop the session. Surfaces as session
    /// removal, not as a failure to the caller that triggered it.
    #[error("terminated: {0}")]
    Terminated(&'static str),

    /// Propagated from a downstream writer/collaborator.
    #[error("unknown error: {0}")]
    Unknown(&'static str),
}

impl Status {
    /// True for statuses that mean "the object is gone, stop using it".
    pub fn is_fatal(&self) -> bool {
        matches!(self, Status::BadState(_) | Status::Terminated(_))
    }
}
