#![forbid(unsafe_code)]

//! Finds the videos a channel published right after a given one.
//!
//! The library holds the whole lookup chain; `src/bin/backend.rs` only wires
//! it to HTTP.

pub mod config;
pub mod error;
pub mod extract;
pub mod next;
pub mod uploads;
pub mod youtube;
