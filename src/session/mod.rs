//! Session correlation and per-sender DSP chain (spec.md §4.F-H).

pub mod delayed_reader;
pub mod fec_reader;
pub mod group;
pub mod latency_monitor;
pub mod router;
pub mod session;
pub mod sorted_queue;
pub mod watchdog;

pub use group::{ReceiverHooks, SessionGroup};
pub use router::SessionRouter;
pub use session::{Session, SessionId, SessionParams};
