//! Management-plane core for a CXL 2.0 switch emulator.
//!
//! This crate owns the switch state machine — ports, virtual switches,
//! virtual bridges, and multi-logical devices — and the per-opcode
//! command dispatcher that validates requests against that state,
//! mutates it under a single exclusive lock, and serializes responses.
//! The MCTP transport, the CLI, and signal handling are external
//! collaborators; this crate only specifies the queue-shaped boundary
//! they connect through ([`transport`]).
//!
//! Module map:
//! - [`model`] — the Model: Switch/Port/VCS/vPPB/MLD and its read-only
//!   projections.
//! - [`codec`] — pure encode/decode between typed request/response
//!   objects and wire bytes, for both the FM-API and emulator families.
//! - [`opcode`] — the opcode space and return codes both families share.
//! - [`handlers`] — one function per opcode, each following the 10-step
//!   pipeline.
//! - [`dispatcher`] — drains the transport's inbound queue and routes
//!   requests to their handler.
//! - [`transport`] — the queue-shaped boundary between the dispatcher
//!   and whatever drives the MCTP binding.
//! - [`config`] — the YAML configuration loader.
//! - [`error`] — the shared error type.

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod model;
pub mod opcode;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use error::{CoreError, CoreResult};
pub use model::Switch;
pub use transport::Transport;
