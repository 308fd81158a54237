//! Core types and trait definitions for The Dramaturgy notification service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend and the HTTP layer both depend on it.

pub mod aggregator;
pub mod error;
pub mod forum;
pub mod notification;
pub mod params;
pub mod principal;
pub mod store;

pub use aggregator::Aggregator;
pub use error::{Error, Result};
