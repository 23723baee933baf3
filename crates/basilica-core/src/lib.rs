//! # basilica-core
//!
//! Core types and utilities for working with the Basilica GPU rental API.
//!
//! This crate provides the shared error taxonomy, HTTP client plumbing, configuration,
//! and rental lifecycle types used by the Basilica SDK and command-line tools.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`types`] - Rental lifecycle states and SSH access descriptors
//! - [`config`] - Client configuration and environment loading
//! - [`client`] - HTTP service client, timeouts, and retry policy
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::{RentalState, SshAccess, TERMINAL_FAILURE_STATES};
