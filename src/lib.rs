//! Authoritative room simulation and client reconciliation cores for a 2D
//! team-deathmatch shooter.
//!
//! The server half runs one room on a dedicated worker thread fed by a
//! command channel: websocket handlers translate wire messages into
//! [`intercomm::RoomCommand`]s, the room advances a fixed 60 Hz simulation
//! (respawns, swept-AABB bullet collision, scoring, match end) and streams
//! state diffs plus discrete events back over the broadcaster.
//!
//! The client half ([`client`]) is transport-agnostic: it consumes the same
//! [`protocol::ServerMessage`] stream and provides the typed session event
//! surface, remote-player interpolation, local prediction reconciliation and
//! bullet visual tracking. Rendering, audio and input stay outside; the cores
//! reach them through the [`client::EffectSink`] capability bundle.

#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod intercomm;
pub mod protocol;
pub mod replication;
pub mod room;
pub mod server;
pub mod utils;
