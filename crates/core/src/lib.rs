//! Pure domain logic for the community management backend.
//!
//! Nothing in this crate performs I/O; the database, event and HTTP layers
//! build on the types and rules defined here.

pub mod channels;
pub mod error;
pub mod realtime;
pub mod reference;
pub mod request;
pub mod roles;
pub mod stats;
pub mod types;
