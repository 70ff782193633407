//! # taskflow-core
//!
//! Shared primitives used by every taskflow crate.
//!
//! - [`ids`]: prefixed, time-ordered identifiers and UTC timestamps
//! - [`logging`]: `tracing` subscriber initialisation
//!
//! ## Crate Position
//!
//! Leaf crate. Depends on nothing internal; depended on by all others.

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
