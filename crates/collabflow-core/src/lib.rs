//! # collabflow-core
//!
//! Shared building blocks for the CollabFlow orchestration service:
//!
//! - **Strongly-typed identifiers**: [`ProjectId`] and [`TaskId`] are
//!   ULID-backed newtypes that cannot be mixed up at compile time
//! - **Error types**: the shared [`Error`] enum used across crates
//! - **Observability**: logging initialization and span constructors
//!
//! This crate deliberately stays small. Domain logic lives in
//! `collabflow-orch`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

pub use error::{Error, Result};
pub use id::{ProjectId, TaskId};
