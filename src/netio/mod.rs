//! Network-facing surface: the endpoint abstraction packets are pushed
//! into from outside the pipeline (spec.md §4.E). Actual socket I/O is
//! an external collaborator (spec.md §1 Non-goals); this module only
//! owns the queue + parser chain side of the contract.

pub mod endpoint;

pub use endpoint::{Endpoint, EndpointWriter, InterfaceKind};
