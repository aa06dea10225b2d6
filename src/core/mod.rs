//! Core utilities for the Sleeper importer
//!
//! This module consolidates the ambient plumbing used across the application:
//! - `config`: Environment-driven runtime settings
//! - `http`: Shared HTTP client construction
//! - `logging`: Tracing subscriber setup

pub mod config;
pub mod http;
pub mod logging;

pub use config::{LogFormat, Settings};
pub use http::{build_client, default_headers};
