//! services/api/src/lib.rs
//!
//! Library half of the `api` service: adapters, configuration and the web layer.
//! The binaries in `src/bin` build on top of it.

pub mod adapters;
pub mod config;
pub mod error;
pub mod password;
pub mod web;
