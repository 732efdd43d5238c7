//! Test helpers module
//!
//! Database setup, an application context wired like production, and
//! request builders for the HTTP API.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use test_context::*;
pub use test_data::*;
