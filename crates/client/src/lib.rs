//! Network client for folio-sw.
//!
//! This crate provides the [`Fetcher`] seam the fetch strategies call and
//! the reqwest-backed implementation used in production.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
