//! REST API client module for the Coindeck exchange.
//!
//! This module provides the `ApiClient` for talking to the exchange API:
//! auth, profile, push device registration, and market data.
//!
//! Requests authenticate with a JWT bearer token read from the credential
//! store at send time. A 401 clears that token; nothing is ever retried.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
