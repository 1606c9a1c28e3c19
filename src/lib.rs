//! Rust library for wiring MIDI endpoints together and carrying MIDI over
//! RTP (Real-time Transport Protocol).
//!
//! Two tightly coupled pieces make up the crate:
//! - **Connectors**: a generic bidirectional pipe between a source endpoint
//!   and a target endpoint, neither knowing the other's concrete kind.
//!   Endpoints participate by implementing a small delegate trait per side.
//! - **RTP transport**: a peer directory, the RTP packet codec, a session
//!   over a caller-supplied UDP socket, and the variable-length quantity
//!   codec used by the MIDI payload framing.
//!
//! # Features
//! - **Synchronous core**: relay, send and receive are plain calls on one
//!   thread; sockets come from `tokio`, whose readiness API drives the
//!   poll-then-read receive discipline.
//! - **Interoperable wire format**: standard RTP version-2 headers with
//!   CSRC lists and the standard padding convention.
//!
//! ## Unsupported Features
//! - **Queuing and recovery**: the crate is a synchronous relay and a
//!   stateless-per-packet codec. Buffering, retransmission and jitter
//!   handling belong to callers.
pub mod connector;
pub mod error;
mod midi;
pub mod rtp;
pub mod varlen;

pub use error::{Error, Result};
